use crate::IdSource;

/// Source location span tracking (line, column) start and end positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a dummy/generated span (all zeros) for test code
    #[cfg(test)]
    pub fn dummy() -> Self {
        Span {
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
        }
    }

    /// Merge two spans to create a span covering both
    pub fn merge(&self, other: &Span) -> Span {
        let (start_line, start_col) = if self.start_line < other.start_line
            || (self.start_line == other.start_line && self.start_col <= other.start_col)
        {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };

        let (end_line, end_col) = if self.end_line > other.end_line
            || (self.end_line == other.end_line && self.end_col >= other.end_col)
        {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };

        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}..{}", self.start_line, self.start_col, self.end_col)
        } else {
            write!(
                f,
                "{}:{}..{}:{}",
                self.start_line, self.start_col, self.end_line, self.end_col
            )
        }
    }
}

/// Unique identifier for AST nodes (expressions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

/// Counter for generating unique node IDs across compilation phases
pub type NodeCounter = IdSource<NodeId>;

/// Extension trait for NodeCounter to provide AST node creation helpers
pub trait NodeCounterExt {
    fn mk_node<T>(&mut self, kind: T, span: Span) -> Node<T>;
}

impl NodeCounterExt for NodeCounter {
    fn mk_node<T>(&mut self, kind: T, span: Span) -> Node<T> {
        Node {
            h: Header {
                id: self.next_id(),
                span,
            },
            kind,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Header {
    pub id: NodeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Node<T> {
    pub h: Header,
    pub kind: T,
}

impl<T> PartialEq for Node<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// A source-language name: a regular identifier or an operator symbol.
///
/// Identifiers match `[A-Za-z_][A-Za-z0-9_']*`; symbols are punctuation
/// sequences such as `+` or `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Name {
    Ident(String),
    Symbol(String),
}

impl Name {
    pub fn ident(s: &str) -> Self {
        Name::Ident(s.to_string())
    }

    pub fn symbol(s: &str) -> Self {
        Name::Symbol(s.to_string())
    }

    /// Classify a raw source spelling (e.g. from a configuration file) as
    /// identifier or symbol.
    pub fn from_source_str(s: &str) -> Self {
        let ident_like = s
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if ident_like {
            Name::Ident(s.to_string())
        } else {
            Name::Symbol(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Name::Ident(s) | Name::Symbol(s) => s,
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Name::Ident(s) => write!(f, "{}", s),
            Name::Symbol(s) => write!(f, "({})", s),
        }
    }
}

/// A name optionally qualified by the module that defines it.
///
/// Qualified and unqualified forms refer to the same logical name; after name
/// resolution every top-level reference carries its defining module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualName {
    pub module_name: Option<String>,
    pub name: Name,
}

impl QualName {
    pub fn unqualified(name: Name) -> Self {
        QualName {
            module_name: None,
            name,
        }
    }

    pub fn qualified(module_name: &str, name: Name) -> Self {
        QualName {
            module_name: Some(module_name.to_string()),
            name,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.module_name.is_some()
    }

    /// The same logical name without its module qualifier.
    pub fn unqualify(&self) -> QualName {
        QualName {
            module_name: None,
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for QualName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.module_name {
            Some(m) => write!(f, "{}.{}", m, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A binding occurrence of a name together with its defining source span.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclIdent {
    pub name: Name,
    pub span: Span,
}

impl DeclIdent {
    pub fn new(name: Name, span: Span) -> Self {
        DeclIdent { name, span }
    }
}

/// First-order source types. All type constructors have kind `*` after
/// saturation; quantification is prenex only (see [`TypeSchema`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A type variable, e.g. `a`
    Var(String),
    /// A type constructor, e.g. `Integer` or `[]`
    Con(QualName),
    /// Type application, e.g. `[] a`
    App(Box<Type>, Box<Type>),
    /// Function type, e.g. `a -> b`
    Func(Box<Type>, Box<Type>),
}

impl Type {
    pub fn app(head: Type, arg: Type) -> Type {
        Type::App(Box::new(head), Box::new(arg))
    }

    pub fn func(arg: Type, res: Type) -> Type {
        Type::Func(Box::new(arg), Box::new(res))
    }

    /// Decompose an application chain `T t1 ... tk` into its head and the
    /// argument list.
    pub fn app_spine(&self) -> (&Type, Vec<&Type>) {
        let mut head = self;
        let mut args = Vec::new();
        while let Type::App(f, a) = head {
            args.push(a.as_ref());
            head = f.as_ref();
        }
        args.reverse();
        (head, args)
    }

    /// Replace type variables according to `subst`, leaving unknown
    /// variables untouched.
    pub fn substitute(&self, subst: &std::collections::HashMap<String, Type>) -> Type {
        match self {
            Type::Var(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Con(_) => self.clone(),
            Type::App(f, a) => Type::app(f.substitute(subst), a.substitute(subst)),
            Type::Func(a, r) => Type::func(a.substitute(subst), r.substitute(subst)),
        }
    }

    /// Split `t1 -> ... -> tn -> r` into at most `n` argument types and the
    /// remaining result type.
    pub fn split_func(&self, n: usize) -> (Vec<&Type>, &Type) {
        let mut args = Vec::new();
        let mut rest = self;
        while args.len() < n {
            match rest {
                Type::Func(arg, res) => {
                    args.push(arg.as_ref());
                    rest = res.as_ref();
                }
                _ => break,
            }
        }
        (args, rest)
    }
}

impl std::fmt::Display for Type {
    /// Haskell-style rendering, parseable back by the type parser. Used for
    /// interface files and error messages.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt_type(self, 0, f)
    }
}

/// `prec` 0: top level; 1: operand of `->`; 2: argument of an application.
fn fmt_type(ty: &Type, prec: u8, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match ty {
        Type::Var(name) => write!(f, "{}", name),
        Type::Con(name) => match name.name.as_str() {
            s if s == names::LIST => write!(f, "[]"),
            s if s == names::PAIR => write!(f, "(,)"),
            s if s == names::UNIT => write!(f, "()"),
            _ => write!(f, "{}", name),
        },
        Type::Func(arg, res) => {
            if prec >= 1 {
                write!(f, "(")?;
            }
            fmt_type(arg, 1, f)?;
            write!(f, " -> ")?;
            fmt_type(res, 0, f)?;
            if prec >= 1 {
                write!(f, ")")?;
            }
            Ok(())
        }
        Type::App(_, _) => {
            let (head, args) = ty.app_spine();
            if let Type::Con(name) = head {
                if name.name.as_str() == names::LIST && args.len() == 1 {
                    write!(f, "[")?;
                    fmt_type(args[0], 0, f)?;
                    return write!(f, "]");
                }
                if name.name.as_str() == names::PAIR && args.len() == 2 {
                    write!(f, "(")?;
                    fmt_type(args[0], 0, f)?;
                    write!(f, ", ")?;
                    fmt_type(args[1], 0, f)?;
                    return write!(f, ")");
                }
            }
            if prec >= 2 {
                write!(f, "(")?;
            }
            fmt_type(head, 2, f)?;
            for arg in args {
                write!(f, " ")?;
                fmt_type(arg, 2, f)?;
            }
            if prec >= 2 {
                write!(f, ")")?;
            }
            Ok(())
        }
    }
}

/// A prenex type schema: `forall a1 ... ak. tau`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    pub type_vars: Vec<DeclIdent>,
    pub body: Type,
}

pub type Expr = Node<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A variable or function reference
    Var(QualName),
    /// A data constructor reference
    Con(QualName),
    /// Function application `e1 e2`
    App(Box<Expr>, Box<Expr>),
    /// `if e1 then e2 else e3`
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `case e of { alts }`
    Case(Box<Expr>, Vec<Alt>),
    /// `\x1 ... xn -> e`
    Lambda(Vec<VarPat>, Box<Expr>),
    IntLiteral(i64),
    /// The predefined `undefined`
    Undefined,
    /// `error "message"`
    ErrorCall(String),
}

impl Expr {
    /// Decompose an application chain `f e1 ... em` into its head and the
    /// argument list.
    pub fn app_spine(&self) -> (&Expr, Vec<&Expr>) {
        let mut head = self;
        let mut args = Vec::new();
        while let ExprKind::App(f, a) = &head.kind {
            args.push(a.as_ref());
            head = f.as_ref();
        }
        args.reverse();
        (head, args)
    }
}

/// A variable pattern, binding one value variable. The type annotation slot
/// is filled in by signature elaboration (function arguments) and by the
/// recursion transformer (captured helper arguments) where it is derivable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarPat {
    pub name: String,
    pub span: Span,
    pub ty: Option<Type>,
}

impl VarPat {
    pub fn new(name: &str, span: Span) -> Self {
        VarPat {
            name: name.to_string(),
            span,
            ty: None,
        }
    }
}

/// A constructor pattern head; always applied to a flat list of variable
/// patterns in a `case` alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct ConPat {
    pub name: QualName,
    pub span: Span,
}

/// One `case` alternative: `C x1 ... xn -> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Alt {
    pub pattern: ConPat,
    pub var_pats: Vec<VarPat>,
    pub rhs: Expr,
}

/// A data constructor declaration: its name and field types.
#[derive(Debug, Clone, PartialEq)]
pub struct ConDecl {
    pub ident: DeclIdent,
    pub fields: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    /// `data T a1 ... ak = C1 ... | Cn ...`
    Data {
        ident: DeclIdent,
        type_args: Vec<DeclIdent>,
        constructors: Vec<ConDecl>,
    },
    /// `type S a1 ... ak = tau`
    Synonym {
        ident: DeclIdent,
        type_args: Vec<DeclIdent>,
        body: Type,
    },
}

impl TypeDecl {
    pub fn ident(&self) -> &DeclIdent {
        match self {
            TypeDecl::Data { ident, .. } | TypeDecl::Synonym { ident, .. } => ident,
        }
    }

    pub fn type_args(&self) -> &[DeclIdent] {
        match self {
            TypeDecl::Data { type_args, .. } | TypeDecl::Synonym { type_args, .. } => type_args,
        }
    }
}

/// A top-level function binding. Type arguments come from the function's
/// signature during signature elaboration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub ident: DeclIdent,
    pub type_args: Vec<DeclIdent>,
    pub args: Vec<VarPat>,
    pub return_type: Option<Type>,
    pub body: Expr,
}

/// A standalone type signature `f, g :: forall a. tau`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSig {
    pub idents: Vec<DeclIdent>,
    pub schema: TypeSchema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub module_name: String,
    pub span: Span,
}

/// A parsed module: header, imports and the three declaration groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// `None` for a module without a header; emitted as `Main`.
    pub name: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub type_decls: Vec<TypeDecl>,
    pub type_sigs: Vec<TypeSig>,
    pub func_decls: Vec<FuncDecl>,
}

impl Module {
    /// The name the generated Gallina module is emitted under.
    pub fn target_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Main")
    }
}

/// Wired-in names of the predefined list and pair syntax.
pub mod names {
    /// The module predefined entries are registered under.
    pub const PRELUDE: &str = "Prelude";
    /// The list type constructor and the empty-list data constructor.
    pub const LIST: &str = "[]";
    /// The cons data constructor.
    pub const CONS: &str = ":";
    /// The pair type and data constructor.
    pub const PAIR: &str = "(,)";
    /// The unit type and data constructor.
    pub const UNIT: &str = "()";
}
