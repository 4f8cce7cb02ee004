//! Recursive-descent parser for the Haskell subset.
//!
//! Layout handling is deliberately minimal: top-level declarations begin in
//! column 1 and continuation lines are indented; `case` alternatives use
//! explicit braces and semicolons. Infix expressions are parsed by
//! precedence climbing over the fixed operator table (there are no user
//! fixity declarations and no sections).

use crate::ast::*;
use crate::error::Result;
use crate::lexer::{self, LocatedToken, Token};
use crate::{bail_parse_at, err_parse, err_parse_at};
use log::trace;

/// Fixity of one built-in operator: (precedence, right-associative).
///
/// The table is fixed: `^` r8, `*` l7, `+`/`-` l6, `:` r5, the comparison
/// operators n4, `&&` r3, `||` r2.
fn fixity(op: &str) -> Option<(u8, Assoc)> {
    match op {
        "^" => Some((8, Assoc::Right)),
        "*" => Some((7, Assoc::Left)),
        "+" | "-" => Some((6, Assoc::Left)),
        ":" => Some((5, Assoc::Right)),
        "==" | "/=" | "<" | "<=" | ">" | ">=" => Some((4, Assoc::None)),
        "&&" => Some((3, Assoc::Right)),
        "||" => Some((2, Assoc::Right)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Assoc {
    Left,
    Right,
    None,
}

pub struct Parser<'a> {
    tokens: Vec<LocatedToken>,
    current: usize,
    node_counter: &'a mut NodeCounter,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<LocatedToken>, node_counter: &'a mut NodeCounter) -> Self {
        Parser {
            tokens,
            current: 0,
            node_counter,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&LocatedToken> {
        let token = self.tokens.get(self.current);
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.current)
            .map(|t| t.span)
            .unwrap_or_else(|| self.previous_span())
    }

    fn previous_span(&self) -> Span {
        if self.current > 0 {
            self.tokens
                .get(self.current - 1)
                .map(|t| t.span)
                .unwrap_or(Span::new(0, 0, 0, 0))
        } else {
            Span::new(0, 0, 0, 0)
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, context: &str) -> Result<Span> {
        if self.check(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(err_parse_at!(
                self.current_span(),
                "expected {:?} in {}, got {:?}",
                token,
                context,
                self.peek()
            ))
        }
    }

    /// Whether the upcoming token starts a new top-level declaration
    /// (column 1). Continuation positions must stop there.
    fn at_decl_start(&self) -> bool {
        self.tokens
            .get(self.current)
            .map(|t| t.span.start_col == 1)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Modules and declarations
    // ------------------------------------------------------------------

    pub fn parse_module(&mut self) -> Result<Module> {
        let name = if self.check(&Token::Module) {
            self.advance();
            let name = self.parse_module_name()?;
            self.expect(&Token::Where, "module header")?;
            Some(name)
        } else {
            None
        };

        let mut module = Module {
            name,
            imports: Vec::new(),
            type_decls: Vec::new(),
            type_sigs: Vec::new(),
            func_decls: Vec::new(),
        };

        while !self.is_at_end() {
            self.parse_top_decl(&mut module)?;
        }

        Ok(module)
    }

    fn parse_module_name(&mut self) -> Result<String> {
        let span = self.current_span();
        match self.advance().map(|t| t.token.clone()) {
            Some(Token::UpperIdent(name)) => Ok(name),
            Some(Token::QualUpper(qualifier, name)) => Ok(format!("{}.{}", qualifier, name)),
            other => Err(err_parse_at!(span, "expected module name, got {:?}", other)),
        }
    }

    fn parse_top_decl(&mut self, module: &mut Module) -> Result<()> {
        trace!("parse_top_decl: next token = {:?}", self.peek());
        match self.peek() {
            Some(Token::Import) => {
                let span = self.current_span();
                self.advance();
                let module_name = self.parse_module_name()?;
                module.imports.push(ImportDecl { module_name, span });
                Ok(())
            }
            Some(Token::Data) => {
                module.type_decls.push(self.parse_data_decl()?);
                Ok(())
            }
            Some(Token::Type) => {
                module.type_decls.push(self.parse_type_synonym()?);
                Ok(())
            }
            Some(Token::LowerIdent(_)) => {
                // `f, g :: tau` is a signature; `f x y = e` is a binding.
                if self.sig_ahead() {
                    module.type_sigs.push(self.parse_type_sig()?);
                } else {
                    module.func_decls.push(self.parse_func_decl()?);
                }
                Ok(())
            }
            other => Err(err_parse_at!(
                self.current_span(),
                "expected top-level declaration, got {:?}",
                other
            )),
        }
    }

    /// Look ahead past a comma-separated list of variables for `::`.
    fn sig_ahead(&self) -> bool {
        let mut offset = 0;
        loop {
            match self.peek_at(offset) {
                Some(Token::LowerIdent(_)) => offset += 1,
                _ => return false,
            }
            match self.peek_at(offset) {
                Some(Token::DoubleColon) => return true,
                Some(Token::Comma) => offset += 1,
                _ => return false,
            }
        }
    }

    fn parse_data_decl(&mut self) -> Result<TypeDecl> {
        self.expect(&Token::Data, "data declaration")?;
        let ident = self.parse_upper_decl_ident()?;
        let type_args = self.parse_type_arg_decls()?;
        self.expect(&Token::Equals, "data declaration")?;

        let mut constructors = vec![self.parse_con_decl()?];
        while self.check(&Token::Pipe) {
            self.advance();
            constructors.push(self.parse_con_decl()?);
        }

        Ok(TypeDecl::Data {
            ident,
            type_args,
            constructors,
        })
    }

    fn parse_con_decl(&mut self) -> Result<ConDecl> {
        let ident = self.parse_upper_decl_ident()?;
        let mut fields = Vec::new();
        while !self.at_decl_start() && self.type_atom_ahead() {
            fields.push(self.parse_type_atom()?);
        }
        Ok(ConDecl { ident, fields })
    }

    fn parse_type_synonym(&mut self) -> Result<TypeDecl> {
        self.expect(&Token::Type, "type synonym")?;
        let ident = self.parse_upper_decl_ident()?;
        let type_args = self.parse_type_arg_decls()?;
        self.expect(&Token::Equals, "type synonym")?;
        let body = self.parse_type()?;
        Ok(TypeDecl::Synonym {
            ident,
            type_args,
            body,
        })
    }

    fn parse_type_sig(&mut self) -> Result<TypeSig> {
        let mut idents = vec![self.parse_lower_decl_ident()?];
        while self.eat(&Token::Comma) {
            idents.push(self.parse_lower_decl_ident()?);
        }
        self.expect(&Token::DoubleColon, "type signature")?;
        let body = self.parse_type()?;
        let schema = generalize(body, self.previous_span());
        Ok(TypeSig { idents, schema })
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl> {
        let ident = self.parse_lower_decl_ident()?;
        let mut args = Vec::new();
        while !self.check(&Token::Equals) {
            args.push(self.parse_var_pat()?);
        }
        self.expect(&Token::Equals, "function binding")?;
        let body = self.parse_expr()?;
        Ok(FuncDecl {
            ident,
            type_args: Vec::new(),
            args,
            return_type: None,
            body,
        })
    }

    fn parse_upper_decl_ident(&mut self) -> Result<DeclIdent> {
        let span = self.current_span();
        match self.advance().map(|t| t.token.clone()) {
            Some(Token::UpperIdent(name)) => Ok(DeclIdent::new(Name::Ident(name), span)),
            other => Err(err_parse_at!(span, "expected constructor name, got {:?}", other)),
        }
    }

    fn parse_lower_decl_ident(&mut self) -> Result<DeclIdent> {
        let span = self.current_span();
        match self.advance().map(|t| t.token.clone()) {
            Some(Token::LowerIdent(name)) => Ok(DeclIdent::new(Name::Ident(name), span)),
            other => Err(err_parse_at!(span, "expected identifier, got {:?}", other)),
        }
    }

    fn parse_type_arg_decls(&mut self) -> Result<Vec<DeclIdent>> {
        let mut args = Vec::new();
        while let Some(Token::LowerIdent(name)) = self.peek() {
            let name = name.clone();
            let span = self.current_span();
            self.advance();
            args.push(DeclIdent::new(Name::Ident(name), span));
        }
        Ok(args)
    }

    fn parse_var_pat(&mut self) -> Result<VarPat> {
        let span = self.current_span();
        match self.advance().map(|t| t.token.clone()) {
            Some(Token::LowerIdent(name)) => Ok(VarPat::new(&name, span)),
            Some(Token::Underscore) => Ok(VarPat::new("_", span)),
            other => Err(err_parse_at!(span, "expected variable pattern, got {:?}", other)),
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_atom_ahead(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::LowerIdent(_))
                | Some(Token::UpperIdent(_))
                | Some(Token::QualUpper(_, _))
                | Some(Token::LParen)
                | Some(Token::LBracket)
        )
    }

    pub fn parse_type(&mut self) -> Result<Type> {
        let lhs = self.parse_btype()?;
        if self.check(&Token::Arrow) {
            self.advance();
            let rhs = self.parse_type()?;
            Ok(Type::func(lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_btype(&mut self) -> Result<Type> {
        let mut ty = self.parse_type_atom()?;
        while !self.at_decl_start() && self.type_atom_ahead() {
            let arg = self.parse_type_atom()?;
            ty = Type::app(ty, arg);
        }
        Ok(ty)
    }

    fn parse_type_atom(&mut self) -> Result<Type> {
        let span = self.current_span();
        match self.peek().cloned() {
            Some(Token::LowerIdent(name)) => {
                self.advance();
                Ok(Type::Var(name))
            }
            Some(Token::UpperIdent(name)) => {
                self.advance();
                Ok(Type::Con(QualName::unqualified(Name::Ident(name))))
            }
            Some(Token::QualUpper(qualifier, name)) => {
                self.advance();
                Ok(Type::Con(QualName::qualified(&qualifier, Name::Ident(name))))
            }
            Some(Token::LBracket) => {
                self.advance();
                let element = self.parse_type()?;
                self.expect(&Token::RBracket, "list type")?;
                Ok(Type::app(
                    Type::Con(QualName::unqualified(Name::Symbol(names::LIST.to_string()))),
                    element,
                ))
            }
            Some(Token::LParen) => {
                self.advance();
                if self.eat(&Token::RParen) {
                    return Ok(Type::Con(QualName::unqualified(Name::Symbol(
                        names::UNIT.to_string(),
                    ))));
                }
                let first = self.parse_type()?;
                if self.eat(&Token::Comma) {
                    let second = self.parse_type()?;
                    self.expect(&Token::RParen, "pair type")?;
                    Ok(Type::app(
                        Type::app(
                            Type::Con(QualName::unqualified(Name::Symbol(names::PAIR.to_string()))),
                            first,
                        ),
                        second,
                    ))
                } else {
                    self.expect(&Token::RParen, "parenthesized type")?;
                    Ok(first)
                }
            }
            other => Err(err_parse_at!(span, "expected type, got {:?}", other)),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn parse_expr(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Backslash) => self.parse_lambda(),
            Some(Token::If) => self.parse_if(),
            Some(Token::Case) => self.parse_case(),
            _ => self.parse_op_expr(0),
        }
    }

    /// Precedence climbing over the fixed infix table.
    fn parse_op_expr(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_app_expr()?;

        while let Some(Token::Operator(op)) = self.peek() {
            let op = op.clone();
            let (prec, assoc) = match fixity(&op) {
                Some(f) => f,
                None => {
                    bail_parse_at!(self.current_span(), "unsupported operator `{}`", op)
                }
            };
            if prec < min_prec || self.at_decl_start() {
                break;
            }
            let op_span = self.current_span();
            self.advance();

            let next_min = match assoc {
                Assoc::Left => prec + 1,
                Assoc::Right => prec,
                Assoc::None => prec + 1,
            };
            let rhs = match self.peek() {
                Some(Token::Backslash) | Some(Token::If) | Some(Token::Case) => self.parse_expr()?,
                _ => self.parse_op_expr(next_min)?,
            };

            let span = lhs.h.span.merge(&rhs.h.span);
            let op_expr = self.mk_operator_ref(&op, op_span);
            let applied = self.mk_app(op_expr, lhs, op_span);
            lhs = self.mk_app(applied, rhs, span);
        }

        Ok(lhs)
    }

    /// An operator used infix refers to a predefined function, except `:`
    /// which is the list constructor.
    fn mk_operator_ref(&mut self, op: &str, span: Span) -> Expr {
        let name = QualName::unqualified(Name::Symbol(op.to_string()));
        let kind = if op == names::CONS {
            ExprKind::Con(name)
        } else {
            ExprKind::Var(name)
        };
        self.node_counter.mk_node(kind, span)
    }

    fn mk_app(&mut self, func: Expr, arg: Expr, span: Span) -> Expr {
        self.node_counter
            .mk_node(ExprKind::App(Box::new(func), Box::new(arg)), span)
    }

    fn parse_app_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        while !self.at_decl_start() && self.atom_ahead() {
            let arg = self.parse_atom()?;
            let span = expr.h.span.merge(&arg.h.span);
            expr = self.mk_app(expr, arg, span);
        }
        Ok(expr)
    }

    fn atom_ahead(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::LowerIdent(_))
                | Some(Token::UpperIdent(_))
                | Some(Token::QualLower(_, _))
                | Some(Token::QualUpper(_, _))
                | Some(Token::Int(_))
                | Some(Token::LParen)
                | Some(Token::LBracket)
                | Some(Token::Undefined)
                | Some(Token::ErrorKw)
        )
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        let span = self.current_span();
        match self.peek().cloned() {
            Some(Token::LowerIdent(name)) => {
                self.advance();
                Ok(self
                    .node_counter
                    .mk_node(ExprKind::Var(QualName::unqualified(Name::Ident(name))), span))
            }
            Some(Token::QualLower(qualifier, name)) => {
                self.advance();
                Ok(self.node_counter.mk_node(
                    ExprKind::Var(QualName::qualified(&qualifier, Name::Ident(name))),
                    span,
                ))
            }
            Some(Token::UpperIdent(name)) => {
                self.advance();
                Ok(self
                    .node_counter
                    .mk_node(ExprKind::Con(QualName::unqualified(Name::Ident(name))), span))
            }
            Some(Token::QualUpper(qualifier, name)) => {
                self.advance();
                Ok(self.node_counter.mk_node(
                    ExprKind::Con(QualName::qualified(&qualifier, Name::Ident(name))),
                    span,
                ))
            }
            Some(Token::Int(value)) => {
                self.advance();
                Ok(self.node_counter.mk_node(ExprKind::IntLiteral(value), span))
            }
            Some(Token::Undefined) => {
                self.advance();
                Ok(self.node_counter.mk_node(ExprKind::Undefined, span))
            }
            Some(Token::ErrorKw) => {
                self.advance();
                match self.peek().cloned() {
                    Some(Token::StringLit(message)) => {
                        let end = self.current_span();
                        self.advance();
                        Ok(self
                            .node_counter
                            .mk_node(ExprKind::ErrorCall(message), span.merge(&end)))
                    }
                    other => Err(err_parse_at!(
                        span,
                        "`error` must be applied to a string literal, got {:?}",
                        other
                    )),
                }
            }
            Some(Token::LBracket) => self.parse_list_literal(),
            Some(Token::LParen) => self.parse_paren_expr(),
            other => Err(err_parse_at!(span, "expected expression, got {:?}", other)),
        }
    }

    /// `[e1, ..., en]` desugars to a `:`/`[]` chain.
    fn parse_list_literal(&mut self) -> Result<Expr> {
        let open = self.expect(&Token::LBracket, "list literal")?;
        let mut elements = Vec::new();
        if !self.check(&Token::RBracket) {
            elements.push(self.parse_expr()?);
            while self.eat(&Token::Comma) {
                elements.push(self.parse_expr()?);
            }
        }
        let close = self.expect(&Token::RBracket, "list literal")?;
        let span = open.merge(&close);

        let nil_name = QualName::unqualified(Name::Symbol(names::LIST.to_string()));
        let mut list = self.node_counter.mk_node(ExprKind::Con(nil_name), span);
        for element in elements.into_iter().rev() {
            let cons_name = QualName::unqualified(Name::Symbol(names::CONS.to_string()));
            let cons = self.node_counter.mk_node(ExprKind::Con(cons_name), span);
            let applied = self.mk_app(cons, element, span);
            list = self.mk_app(applied, list, span);
        }
        Ok(list)
    }

    fn parse_paren_expr(&mut self) -> Result<Expr> {
        let open = self.expect(&Token::LParen, "parenthesized expression")?;

        // `()` and `(+)`-style references.
        if self.check(&Token::RParen) {
            let close = self.expect(&Token::RParen, "unit expression")?;
            let name = QualName::unqualified(Name::Symbol(names::UNIT.to_string()));
            return Ok(self
                .node_counter
                .mk_node(ExprKind::Con(name), open.merge(&close)));
        }
        if let Some(Token::Operator(op)) = self.peek() {
            if self.peek_at(1) == Some(&Token::RParen) {
                let op = op.clone();
                let op_span = self.current_span();
                self.advance();
                self.advance();
                return Ok(self.mk_operator_ref(&op, op_span));
            }
        }

        let first = self.parse_expr()?;
        if self.eat(&Token::Comma) {
            let second = self.parse_expr()?;
            let close = self.expect(&Token::RParen, "pair expression")?;
            let span = open.merge(&close);
            let pair_name = QualName::unqualified(Name::Symbol(names::PAIR.to_string()));
            let pair = self.node_counter.mk_node(ExprKind::Con(pair_name), span);
            let applied = self.mk_app(pair, first, span);
            return Ok(self.mk_app(applied, second, span));
        }
        self.expect(&Token::RParen, "parenthesized expression")?;
        Ok(first)
    }

    fn parse_lambda(&mut self) -> Result<Expr> {
        let start = self.expect(&Token::Backslash, "lambda")?;
        let mut params = vec![self.parse_var_pat()?];
        while !self.check(&Token::Arrow) {
            params.push(self.parse_var_pat()?);
        }
        self.expect(&Token::Arrow, "lambda")?;
        let body = self.parse_expr()?;
        let span = start.merge(&body.h.span);
        Ok(self
            .node_counter
            .mk_node(ExprKind::Lambda(params, Box::new(body)), span))
    }

    fn parse_if(&mut self) -> Result<Expr> {
        let start = self.expect(&Token::If, "conditional")?;
        let condition = self.parse_expr()?;
        self.expect(&Token::Then, "conditional")?;
        let then_branch = self.parse_expr()?;
        self.expect(&Token::Else, "conditional")?;
        let else_branch = self.parse_expr()?;
        let span = start.merge(&else_branch.h.span);
        Ok(self.node_counter.mk_node(
            ExprKind::If(
                Box::new(condition),
                Box::new(then_branch),
                Box::new(else_branch),
            ),
            span,
        ))
    }

    fn parse_case(&mut self) -> Result<Expr> {
        let start = self.expect(&Token::Case, "case expression")?;
        let scrutinee = self.parse_expr()?;
        self.expect(&Token::Of, "case expression")?;
        self.expect(&Token::LBrace, "case alternatives")?;

        let mut alts = Vec::new();
        loop {
            alts.push(self.parse_alt()?);
            if !self.eat(&Token::Semicolon) {
                break;
            }
            if self.check(&Token::RBrace) {
                break;
            }
        }
        let close = self.expect(&Token::RBrace, "case alternatives")?;

        if alts.is_empty() {
            bail_parse_at!(start, "case expression without alternatives");
        }
        let span = start.merge(&close);
        Ok(self
            .node_counter
            .mk_node(ExprKind::Case(Box::new(scrutinee), alts), span))
    }

    fn parse_alt(&mut self) -> Result<Alt> {
        let (pattern, var_pats) = self.parse_con_pat()?;
        self.expect(&Token::Arrow, "case alternative")?;
        let rhs = self.parse_expr()?;
        Ok(Alt {
            pattern,
            var_pats,
            rhs,
        })
    }

    /// Patterns are one level deep: a constructor applied to variable
    /// patterns. `[]`, infix `:`, `()` and pair patterns are recognized
    /// spellings of the wired-in constructors.
    fn parse_con_pat(&mut self) -> Result<(ConPat, Vec<VarPat>)> {
        let span = self.current_span();
        match self.peek().cloned() {
            Some(Token::UpperIdent(name)) => {
                self.advance();
                let mut vars = Vec::new();
                while matches!(self.peek(), Some(Token::LowerIdent(_)) | Some(Token::Underscore)) {
                    vars.push(self.parse_var_pat()?);
                }
                Ok((
                    ConPat {
                        name: QualName::unqualified(Name::Ident(name)),
                        span,
                    },
                    vars,
                ))
            }
            Some(Token::QualUpper(qualifier, name)) => {
                self.advance();
                let mut vars = Vec::new();
                while matches!(self.peek(), Some(Token::LowerIdent(_)) | Some(Token::Underscore)) {
                    vars.push(self.parse_var_pat()?);
                }
                Ok((
                    ConPat {
                        name: QualName::qualified(&qualifier, Name::Ident(name)),
                        span,
                    },
                    vars,
                ))
            }
            Some(Token::LBracket) => {
                self.advance();
                self.expect(&Token::RBracket, "empty-list pattern")?;
                Ok((
                    ConPat {
                        name: QualName::unqualified(Name::Symbol(names::LIST.to_string())),
                        span,
                    },
                    Vec::new(),
                ))
            }
            Some(Token::LParen) => {
                self.advance();
                if self.eat(&Token::RParen) {
                    return Ok((
                        ConPat {
                            name: QualName::unqualified(Name::Symbol(names::UNIT.to_string())),
                            span,
                        },
                        Vec::new(),
                    ));
                }
                let first = self.parse_var_pat()?;
                self.expect(&Token::Comma, "pair pattern")?;
                let second = self.parse_var_pat()?;
                self.expect(&Token::RParen, "pair pattern")?;
                Ok((
                    ConPat {
                        name: QualName::unqualified(Name::Symbol(names::PAIR.to_string())),
                        span,
                    },
                    vec![first, second],
                ))
            }
            Some(Token::LowerIdent(_)) | Some(Token::Underscore) => {
                let head = self.parse_var_pat()?;
                match self.peek() {
                    Some(Token::Operator(op)) if op == names::CONS => {
                        self.advance();
                        let tail = self.parse_var_pat()?;
                        Ok((
                            ConPat {
                                name: QualName::unqualified(Name::Symbol(names::CONS.to_string())),
                                span,
                            },
                            vec![head, tail],
                        ))
                    }
                    other => Err(err_parse_at!(
                        span,
                        "patterns must match on a constructor, got variable followed by {:?}",
                        other
                    )),
                }
            }
            other => Err(err_parse_at!(span, "expected pattern, got {:?}", other)),
        }
    }
}

/// Close a type over its free variables in first-occurrence order,
/// producing a prenex schema.
pub fn generalize(body: Type, span: Span) -> TypeSchema {
    let mut vars: Vec<String> = Vec::new();
    collect_type_vars(&body, &mut vars);
    TypeSchema {
        type_vars: vars
            .into_iter()
            .map(|name| DeclIdent::new(Name::Ident(name), span))
            .collect(),
        body,
    }
}

fn collect_type_vars(ty: &Type, out: &mut Vec<String>) {
    match ty {
        Type::Var(name) => {
            if !out.iter().any(|v| v == name) {
                out.push(name.clone());
            }
        }
        Type::Con(_) => {}
        Type::App(f, a) => {
            collect_type_vars(f, out);
            collect_type_vars(a, out);
        }
        Type::Func(a, r) => {
            collect_type_vars(a, out);
            collect_type_vars(r, out);
        }
    }
}

/// Parse a module from source text.
pub fn parse_module(source: &str, node_counter: &mut NodeCounter) -> Result<Module> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens, node_counter).parse_module()
}

/// Parse a standalone type, e.g. from a configuration or interface file.
/// Types carry no node ids, so this needs no external counter.
pub fn parse_type_string(source: &str) -> Result<Type> {
    let tokens = lexer::tokenize(source)?;
    let mut node_counter = NodeCounter::new();
    let mut parser = Parser::new(tokens, &mut node_counter);
    let ty = parser.parse_type()?;
    if !parser.is_at_end() {
        return Err(err_parse!("trailing input after type: {:?}", source));
    }
    Ok(ty)
}
