//! Recursion transformation.
//!
//! Coq's guard checker wants a `Fixpoint` to match on its decreasing
//! argument at the top level, but a source function may match on it at
//! several nested positions. This pass rewrites each recursive function
//! into a non-recursive driver plus one helper per outermost
//! case-on-the-decreasing-argument site:
//!
//! ```text
//! -- Before:
//! length xs = case xs of { [] -> 0 ; _ : xs' -> 1 + length xs' }
//!
//! -- After:
//! length_0 xs = case xs of { [] -> 0 ; _ : xs' -> 1 + length_0 xs' }
//! length xs   = length_0 xs
//! ```
//!
//! Each helper captures the free variables in scope at its site. Calls to
//! component members inside a helper body are inlined one level (the
//! member's driver body, with freshly renamed binders), which leaves the
//! helpers calling only helpers, genuinely structurally recursive on the
//! decreasing argument.

use crate::ast::*;
use crate::environment::{Entry, Environment, Namespace};
use crate::error::Result;
use log::debug;
use std::collections::{HashMap, HashSet};

/// A generated helper function and the position of the decreasing argument
/// in its own parameter list.
#[derive(Debug)]
pub struct HelperDecl {
    pub decl: FuncDecl,
    pub dec_arg_index: usize,
    /// The member the helper was extracted from.
    pub parent: QualName,
}

/// The result of transforming one recursive component.
#[derive(Debug)]
pub struct TransformedGroup {
    pub helpers: Vec<HelperDecl>,
    pub drivers: Vec<FuncDecl>,
}

/// Transform a recursive component. `dec_indices` is index-aligned with
/// `members` (the termination analysis result).
pub fn transform_group(
    members: Vec<FuncDecl>,
    dec_indices: &[usize],
    env: &mut Environment,
    nc: &mut NodeCounter,
    module: &str,
) -> Result<TransformedGroup> {
    let member_names: Vec<QualName> = members
        .iter()
        .map(|decl| QualName::qualified(module, decl.ident.name.clone()))
        .collect();

    let mut helpers: Vec<HelperDecl> = Vec::new();
    let mut drivers: Vec<FuncDecl> = Vec::new();

    // Phase 1: extract one helper per outermost case-on-decreasing-argument
    // site and rewrite each member body into a driver.
    for (position, mut decl) in members.into_iter().enumerate() {
        let parent = member_names[position].clone();
        let parent_ident = env
            .lookup(Namespace::Value, &parent)
            .map(|entry| entry.ident().to_string())
            .unwrap_or_else(|| decl.ident.name.as_str().to_string());

        let mut scope = ScopeTypes::new();
        for arg in &decl.args {
            scope.bind(&arg.name, arg.ty.clone());
        }

        let body = std::mem::replace(&mut decl.body, placeholder(nc));
        let mut extraction = Extraction {
            env: &mut *env,
            nc: &mut *nc,
            module,
            parent: parent.clone(),
            parent_ident,
            parent_type_args: decl.type_args.clone(),
            dec_var: decl.args[dec_indices[position]].name.clone(),
            helpers: Vec::new(),
        };
        decl.body = extraction.extract(body, false, &scope);
        helpers.append(&mut extraction.helpers);
        drivers.push(decl);
    }

    debug!(
        "component {:?}: {} helpers extracted",
        member_names,
        helpers.len()
    );

    // Phase 2: inline member calls inside helper bodies. Driver bodies call
    // only helpers, so one level of expansion suffices. Renaming during
    // inlining only has to avoid the names that occur in this component.
    let mut fresh = Freshener::for_group(&drivers, &helpers);
    for helper in &mut helpers {
        let body = std::mem::replace(&mut helper.decl.body, placeholder(nc));
        helper.decl.body = inline_members(body, &member_names, &drivers, &mut fresh, nc);
    }

    Ok(TransformedGroup { helpers, drivers })
}

fn placeholder(nc: &mut NodeCounter) -> Expr {
    nc.mk_node(ExprKind::Undefined, Span::new(0, 0, 0, 0))
}

/// Fresh variable names for the inlining phase, unique against every name
/// occurring in the component. These are IR-level names; the renamer
/// assigns the final Gallina identifiers during code generation.
struct Freshener {
    counters: HashMap<String, u32>,
    used: HashSet<String>,
}

impl Freshener {
    fn for_group(drivers: &[FuncDecl], helpers: &[HelperDecl]) -> Self {
        let mut used = HashSet::new();
        for decl in drivers {
            collect_decl_names(decl, &mut used);
        }
        for helper in helpers {
            collect_decl_names(&helper.decl, &mut used);
        }
        Freshener {
            counters: HashMap::new(),
            used,
        }
    }

    fn fresh(&mut self, old: &str) -> String {
        let prefix = if old == "_" { "x" } else { old };
        loop {
            let counter = self.counters.entry(prefix.to_string()).or_insert(0);
            let candidate = format!("{}_{}", prefix, counter);
            *counter += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn collect_decl_names(decl: &FuncDecl, out: &mut HashSet<String>) {
    for arg in &decl.args {
        out.insert(arg.name.clone());
    }
    collect_expr_names(&decl.body, out);
}

fn collect_expr_names(expr: &Expr, out: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Var(name) => {
            if !name.is_qualified() {
                out.insert(name.name.as_str().to_string());
            }
        }
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {}
        ExprKind::App(f, a) => {
            collect_expr_names(f, out);
            collect_expr_names(a, out);
        }
        ExprKind::If(c, t, e) => {
            collect_expr_names(c, out);
            collect_expr_names(t, out);
            collect_expr_names(e, out);
        }
        ExprKind::Case(scrutinee, alts) => {
            collect_expr_names(scrutinee, out);
            for alt in alts {
                for pat in &alt.var_pats {
                    out.insert(pat.name.clone());
                }
                collect_expr_names(&alt.rhs, out);
            }
        }
        ExprKind::Lambda(params, body) => {
            for pat in params {
                out.insert(pat.name.clone());
            }
            collect_expr_names(body, out);
        }
    }
}

// ----------------------------------------------------------------------
// Scoped variable types
// ----------------------------------------------------------------------

/// Types of the local variables in scope, where derivable. Cloned at every
/// binder so shadowing falls out naturally.
#[derive(Clone)]
struct ScopeTypes {
    vars: HashMap<String, Option<Type>>,
}

impl ScopeTypes {
    fn new() -> Self {
        ScopeTypes {
            vars: HashMap::new(),
        }
    }

    fn bind(&mut self, name: &str, ty: Option<Type>) {
        self.vars.insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.vars.get(name).and_then(|ty| ty.as_ref())
    }
}

// ----------------------------------------------------------------------
// Phase 1: site extraction
// ----------------------------------------------------------------------

struct Extraction<'a> {
    env: &'a mut Environment,
    nc: &'a mut NodeCounter,
    module: &'a str,
    parent: QualName,
    parent_ident: String,
    parent_type_args: Vec<DeclIdent>,
    dec_var: String,
    helpers: Vec<HelperDecl>,
}

impl<'a> Extraction<'a> {
    /// Rewrite `expr`, replacing each outermost case on the decreasing
    /// variable with a call to a fresh helper. `shadowed` tracks whether an
    /// inner binder hides the decreasing variable.
    fn extract(&mut self, expr: Expr, shadowed: bool, scope: &ScopeTypes) -> Expr {
        let span = expr.h.span;
        let Node { h, kind } = expr;
        match kind {
            ExprKind::Case(scrutinee, alts) => {
                let is_site = !shadowed
                    && matches!(
                        &scrutinee.kind,
                        ExprKind::Var(name)
                            if !name.is_qualified() && name.name.as_str() == self.dec_var
                    );
                if is_site {
                    let site = Node {
                        h,
                        kind: ExprKind::Case(scrutinee, alts),
                    };
                    return self.extract_site(site, span, scope);
                }

                let scrutinee_ty = match &scrutinee.kind {
                    ExprKind::Var(name) if !name.is_qualified() => {
                        scope.lookup(name.name.as_str()).cloned()
                    }
                    _ => None,
                };
                let scrutinee = Box::new(self.extract(*scrutinee, shadowed, scope));
                let alts = alts
                    .into_iter()
                    .map(|mut alt| {
                        let field_types = scrutinee_ty
                            .as_ref()
                            .and_then(|ty| self.instantiate_fields(&alt.pattern.name, ty));
                        let mut inner = scope.clone();
                        let mut inner_shadowed = shadowed;
                        for (index, pat) in alt.var_pats.iter_mut().enumerate() {
                            let ty = field_types.as_ref().and_then(|fields| fields.get(index).cloned());
                            if pat.ty.is_none() {
                                pat.ty = ty.clone();
                            }
                            inner.bind(&pat.name, pat.ty.clone());
                            if pat.name == self.dec_var {
                                inner_shadowed = true;
                            }
                        }
                        alt.rhs = self.extract(alt.rhs, inner_shadowed, &inner);
                        alt
                    })
                    .collect();
                Node {
                    h,
                    kind: ExprKind::Case(scrutinee, alts),
                }
            }
            ExprKind::App(f, a) => {
                let f = self.extract(*f, shadowed, scope);
                let a = self.extract(*a, shadowed, scope);
                Node {
                    h,
                    kind: ExprKind::App(Box::new(f), Box::new(a)),
                }
            }
            ExprKind::If(c, t, e) => {
                let c = self.extract(*c, shadowed, scope);
                let t = self.extract(*t, shadowed, scope);
                let e = self.extract(*e, shadowed, scope);
                Node {
                    h,
                    kind: ExprKind::If(Box::new(c), Box::new(t), Box::new(e)),
                }
            }
            ExprKind::Lambda(params, body) => {
                let mut inner = scope.clone();
                let mut inner_shadowed = shadowed;
                for param in &params {
                    inner.bind(&param.name, param.ty.clone());
                    if param.name == self.dec_var {
                        inner_shadowed = true;
                    }
                }
                let body = self.extract(*body, inner_shadowed, &inner);
                Node {
                    h,
                    kind: ExprKind::Lambda(params, Box::new(body)),
                }
            }
            other => Node { h, kind: other },
        }
    }

    /// Turn one site into a helper declaration and return the call that
    /// replaces it.
    fn extract_site(&mut self, site: Expr, span: Span, scope: &ScopeTypes) -> Expr {
        let captured = free_local_vars(&site);
        let helper_name = self.env.fresh_ident(&self.parent_ident);
        let dec_arg_index = captured
            .iter()
            .position(|name| name == &self.dec_var)
            .expect("decreasing variable must occur in its own case site");

        let params: Vec<VarPat> = captured
            .iter()
            .map(|name| VarPat {
                name: name.clone(),
                span,
                ty: scope.lookup(name).cloned(),
            })
            .collect();

        let helper = FuncDecl {
            ident: DeclIdent::new(Name::Ident(helper_name.clone()), span),
            type_args: self.parent_type_args.clone(),
            args: params,
            return_type: None,
            body: site,
        };
        self.helpers.push(HelperDecl {
            decl: helper,
            dec_arg_index,
            parent: self.parent.clone(),
        });

        let callee = QualName::qualified(self.module, Name::Ident(helper_name));
        let mut call = self.nc.mk_node(ExprKind::Var(callee), span);
        for name in captured {
            let arg = self
                .nc
                .mk_node(ExprKind::Var(QualName::unqualified(Name::Ident(name))), span);
            call = self
                .nc
                .mk_node(ExprKind::App(Box::new(call), Box::new(arg)), span);
        }
        call
    }

    /// Field types of `con` when matched against a scrutinee of type
    /// `scrutinee_ty`, obtained by instantiating the constructor entry's
    /// type variables.
    fn instantiate_fields(&self, con: &QualName, scrutinee_ty: &Type) -> Option<Vec<Type>> {
        let entry = self.env.lookup(Namespace::Value, con)?;
        let (arg_types, return_type) = match entry {
            Entry::Con {
                arg_types,
                return_type,
                ..
            } => (arg_types.clone(), return_type.clone()),
            _ => return None,
        };

        let (_, expected_args) = return_type.app_spine();
        let (_, actual_args) = scrutinee_ty.app_spine();
        if expected_args.len() != actual_args.len() {
            return None;
        }
        let mut subst: HashMap<String, Type> = HashMap::new();
        for (expected, actual) in expected_args.iter().zip(actual_args.iter()) {
            if let Type::Var(var) = expected {
                subst.insert(var.clone(), (*actual).clone());
            }
        }
        Some(arg_types.iter().map(|ty| ty.substitute(&subst)).collect())
    }
}

/// Free unqualified variables of an expression in first-occurrence order.
/// After name resolution every unqualified variable is a local.
fn free_local_vars(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    collect_free(expr, &mut Vec::new(), &mut out);
    out
}

fn collect_free(expr: &Expr, bound: &mut Vec<String>, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Var(name) => {
            if !name.is_qualified() {
                let var = name.name.as_str();
                if !bound.iter().any(|b| b == var) && !out.iter().any(|v| v == var) {
                    out.push(var.to_string());
                }
            }
        }
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {}
        ExprKind::App(f, a) => {
            collect_free(f, bound, out);
            collect_free(a, bound, out);
        }
        ExprKind::If(c, t, e) => {
            collect_free(c, bound, out);
            collect_free(t, bound, out);
            collect_free(e, bound, out);
        }
        ExprKind::Case(scrutinee, alts) => {
            collect_free(scrutinee, bound, out);
            for alt in alts {
                let before = bound.len();
                bound.extend(alt.var_pats.iter().map(|p| p.name.clone()));
                collect_free(&alt.rhs, bound, out);
                bound.truncate(before);
            }
        }
        ExprKind::Lambda(params, body) => {
            let before = bound.len();
            bound.extend(params.iter().map(|p| p.name.clone()));
            collect_free(body, bound, out);
            bound.truncate(before);
        }
    }
}

// ----------------------------------------------------------------------
// Phase 2: single-level inlining
// ----------------------------------------------------------------------

/// Replace every reference to a component member with that member's driver
/// body (binders freshly renamed, arguments substituted).
fn inline_members(
    expr: Expr,
    member_names: &[QualName],
    drivers: &[FuncDecl],
    fresh: &mut Freshener,
    nc: &mut NodeCounter,
) -> Expr {
    let span = expr.h.span;
    let Node { h, kind } = expr;
    match kind {
        ExprKind::App(_, _) => {
            // Rebuild the spine bottom-up, then inline if the head is a
            // member reference.
            rebuild_app(Node { h, kind }, member_names, drivers, fresh, nc)
        }
        ExprKind::Var(name) => {
            if let Some(index) = member_names.iter().position(|m| m == &name) {
                inline_call(&drivers[index], Vec::new(), span, fresh, nc)
            } else {
                Node {
                    h,
                    kind: ExprKind::Var(name),
                }
            }
        }
        ExprKind::If(c, t, e) => {
            let c = inline_members(*c, member_names, drivers, fresh, nc);
            let t = inline_members(*t, member_names, drivers, fresh, nc);
            let e = inline_members(*e, member_names, drivers, fresh, nc);
            Node {
                h,
                kind: ExprKind::If(Box::new(c), Box::new(t), Box::new(e)),
            }
        }
        ExprKind::Case(scrutinee, alts) => {
            let scrutinee = inline_members(*scrutinee, member_names, drivers, fresh, nc);
            let alts = alts
                .into_iter()
                .map(|mut alt| {
                    alt.rhs = inline_members(alt.rhs, member_names, drivers, fresh, nc);
                    alt
                })
                .collect();
            Node {
                h,
                kind: ExprKind::Case(Box::new(scrutinee), alts),
            }
        }
        ExprKind::Lambda(params, body) => {
            let body = inline_members(*body, member_names, drivers, fresh, nc);
            Node {
                h,
                kind: ExprKind::Lambda(params, Box::new(body)),
            }
        }
        other => Node { h, kind: other },
    }
}

fn rebuild_app(
    expr: Expr,
    member_names: &[QualName],
    drivers: &[FuncDecl],
    fresh: &mut Freshener,
    nc: &mut NodeCounter,
) -> Expr {
    let span = expr.h.span;

    // Flatten the spine, inline the arguments, then decide about the head.
    let mut args: Vec<Expr> = Vec::new();
    let mut head = expr;
    while let ExprKind::App(f, a) = head.kind {
        args.push(*a);
        head = *f;
    }
    args.reverse();
    let args: Vec<Expr> = args
        .into_iter()
        .map(|arg| inline_members(arg, member_names, drivers, fresh, nc))
        .collect();

    let member = match &head.kind {
        ExprKind::Var(name) => member_names.iter().position(|m| m == name),
        _ => None,
    };

    match member {
        Some(index) => inline_call(&drivers[index], args, span, fresh, nc),
        None => {
            let head = inline_members(head, member_names, drivers, fresh, nc);
            let mut result = head;
            for arg in args {
                result = nc.mk_node(ExprKind::App(Box::new(result), Box::new(arg)), span);
            }
            result
        }
    }
}

/// Expand one call to a member: the driver body with its parameters bound
/// to the call's arguments. Missing arguments become lambda binders;
/// surplus arguments are applied to the expanded body.
fn inline_call(
    driver: &FuncDecl,
    args: Vec<Expr>,
    span: Span,
    fresh: &mut Freshener,
    nc: &mut NodeCounter,
) -> Expr {
    let (fresh_params, body) = refresh_func(driver, fresh);

    let supplied = args.len().min(fresh_params.len());
    let mut subst: HashMap<String, Expr> = HashMap::new();
    for (param, arg) in fresh_params.iter().zip(args.iter().take(supplied)) {
        subst.insert(param.name.clone(), arg.clone());
    }

    let mut result = substitute(body, &subst);

    if supplied < fresh_params.len() {
        let remaining: Vec<VarPat> = fresh_params[supplied..].to_vec();
        result = nc.mk_node(ExprKind::Lambda(remaining, Box::new(result)), span);
    }
    for arg in args.into_iter().skip(supplied) {
        result = nc.mk_node(ExprKind::App(Box::new(result), Box::new(arg)), span);
    }
    result
}

/// Copy a function's parameters and body with every binder renamed to a
/// fresh identifier, so substitution into the copy cannot capture.
fn refresh_func(decl: &FuncDecl, fresh: &mut Freshener) -> (Vec<VarPat>, Expr) {
    let mut renames: HashMap<String, String> = HashMap::new();
    let params: Vec<VarPat> = decl
        .args
        .iter()
        .map(|param| {
            let renamed = fresh.fresh(&param.name);
            renames.insert(param.name.clone(), renamed.clone());
            VarPat {
                name: renamed,
                span: param.span,
                ty: param.ty.clone(),
            }
        })
        .collect();
    let body = refresh_expr(decl.body.clone(), &renames, fresh);
    (params, body)
}

fn refresh_expr(expr: Expr, renames: &HashMap<String, String>, fresh: &mut Freshener) -> Expr {
    let Node { h, kind } = expr;
    match kind {
        ExprKind::Var(name) => {
            let kind = if !name.is_qualified() {
                match renames.get(name.name.as_str()) {
                    Some(renamed) => {
                        ExprKind::Var(QualName::unqualified(Name::Ident(renamed.clone())))
                    }
                    None => ExprKind::Var(name),
                }
            } else {
                ExprKind::Var(name)
            };
            Node { h, kind }
        }
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {
            Node { h, kind }
        }
        ExprKind::App(f, a) => {
            let f = refresh_expr(*f, renames, fresh);
            let a = refresh_expr(*a, renames, fresh);
            Node {
                h,
                kind: ExprKind::App(Box::new(f), Box::new(a)),
            }
        }
        ExprKind::If(c, t, e) => {
            let c = refresh_expr(*c, renames, fresh);
            let t = refresh_expr(*t, renames, fresh);
            let e = refresh_expr(*e, renames, fresh);
            Node {
                h,
                kind: ExprKind::If(Box::new(c), Box::new(t), Box::new(e)),
            }
        }
        ExprKind::Case(scrutinee, alts) => {
            let scrutinee = refresh_expr(*scrutinee, renames, fresh);
            let alts = alts
                .into_iter()
                .map(|mut alt| {
                    let mut inner = renames.clone();
                    for pat in alt.var_pats.iter_mut() {
                        let renamed = fresh.fresh(&pat.name);
                        inner.insert(pat.name.clone(), renamed.clone());
                        pat.name = renamed;
                    }
                    alt.rhs = refresh_expr(alt.rhs, &inner, fresh);
                    alt
                })
                .collect();
            Node {
                h,
                kind: ExprKind::Case(Box::new(scrutinee), alts),
            }
        }
        ExprKind::Lambda(mut params, body) => {
            let mut inner = renames.clone();
            for param in params.iter_mut() {
                let renamed = fresh.fresh(&param.name);
                inner.insert(param.name.clone(), renamed.clone());
                param.name = renamed;
            }
            let body = refresh_expr(*body, &inner, fresh);
            Node {
                h,
                kind: ExprKind::Lambda(params, Box::new(body)),
            }
        }
    }
}

/// Capture-avoiding substitution of expressions for free variables.
fn substitute(expr: Expr, subst: &HashMap<String, Expr>) -> Expr {
    if subst.is_empty() {
        return expr;
    }
    let Node { h, kind } = expr;
    match kind {
        ExprKind::Var(name) => {
            if !name.is_qualified() {
                if let Some(replacement) = subst.get(name.name.as_str()) {
                    return replacement.clone();
                }
            }
            Node {
                h,
                kind: ExprKind::Var(name),
            }
        }
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {
            Node { h, kind }
        }
        ExprKind::App(f, a) => {
            let f = substitute(*f, subst);
            let a = substitute(*a, subst);
            Node {
                h,
                kind: ExprKind::App(Box::new(f), Box::new(a)),
            }
        }
        ExprKind::If(c, t, e) => {
            let c = substitute(*c, subst);
            let t = substitute(*t, subst);
            let e = substitute(*e, subst);
            Node {
                h,
                kind: ExprKind::If(Box::new(c), Box::new(t), Box::new(e)),
            }
        }
        ExprKind::Case(scrutinee, alts) => {
            let scrutinee = substitute(*scrutinee, subst);
            let alts = alts
                .into_iter()
                .map(|mut alt| {
                    let mut inner = subst.clone();
                    for pat in &alt.var_pats {
                        inner.remove(&pat.name);
                    }
                    alt.rhs = substitute(alt.rhs, &inner);
                    alt
                })
                .collect();
            Node {
                h,
                kind: ExprKind::Case(Box::new(scrutinee), alts),
            }
        }
        ExprKind::Lambda(params, body) => {
            let mut inner = subst.clone();
            for param in &params {
                inner.remove(&param.name);
            }
            let body = substitute(*body, &inner);
            Node {
                h,
                kind: ExprKind::Lambda(params, Box::new(body)),
            }
        }
    }
}
