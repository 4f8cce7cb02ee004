//! Name resolution pass.
//!
//! Qualifies every top-level reference with its defining module: the module
//! itself, the predefined prelude, or exactly one import. Reports duplicate
//! top-level declarations, unknown identifiers and ambiguous imports as
//! fatal errors; local binders shadow top-level names and stay unqualified.

use crate::ast::*;
use crate::environment::{Entry, Environment, Namespace};
use crate::error::Result;
use crate::reporter::Reporter;
use crate::scope::ScopeStack;
use crate::{bail_resolve_at, err_module_at, err_resolve_at};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;

pub struct Resolver<'a> {
    env: &'a Environment,
    module_name: String,
    /// Imported module names in source order.
    imports: Vec<String>,
    /// Top-level names declared by this module, with their defining spans.
    local_types: IndexMap<Name, Span>,
    local_values: IndexMap<Name, Span>,
    /// Locally bound value variables (function arguments, lambda and
    /// pattern binders).
    locals: ScopeStack<String, ()>,
}

/// Resolve all references of a module in place.
pub fn resolve_module(
    module: &mut Module,
    env: &Environment,
    reporter: &mut Reporter,
) -> Result<()> {
    let mut resolver = Resolver {
        env,
        module_name: module.target_name().to_string(),
        imports: Vec::new(),
        local_types: IndexMap::new(),
        local_values: IndexMap::new(),
        locals: ScopeStack::new(),
    };
    resolver.run(module, reporter)
}

impl<'a> Resolver<'a> {
    fn run(&mut self, module: &mut Module, reporter: &mut Reporter) -> Result<()> {
        debug!("resolving module {}", self.module_name);

        for import in &module.imports {
            if !self.env.has_module(&import.module_name) {
                return Err(err_module_at!(
                    import.span,
                    "unknown module `{}`",
                    import.module_name
                ));
            }
            self.imports.push(import.module_name.clone());
        }

        self.collect_top_level(module)?;
        self.check_signatures(module, reporter)?;

        for decl in &mut module.type_decls {
            self.resolve_type_decl(decl)?;
        }
        for sig in &mut module.type_sigs {
            let span = sig.idents.first().map(|i| i.span).unwrap_or(Span::new(0, 0, 0, 0));
            let bound: HashSet<String> = sig
                .schema
                .type_vars
                .iter()
                .map(|v| v.name.as_str().to_string())
                .collect();
            self.resolve_type(&mut sig.schema.body, &bound, span)?;
        }
        for func in &mut module.func_decls {
            self.resolve_func_decl(func)?;
        }

        Ok(())
    }

    /// Record every top-level binding, rejecting duplicates within a
    /// namespace.
    fn collect_top_level(&mut self, module: &Module) -> Result<()> {
        for decl in &module.type_decls {
            let ident = decl.ident();
            if let Some(previous) = self.local_types.get(&ident.name) {
                bail_resolve_at!(
                    ident.span,
                    "duplicate type declaration `{}` (first declared at {})",
                    ident.name,
                    previous
                );
            }
            self.local_types.insert(ident.name.clone(), ident.span);

            if let TypeDecl::Data { constructors, .. } = decl {
                for con in constructors {
                    if let Some(previous) = self.local_values.get(&con.ident.name) {
                        bail_resolve_at!(
                            con.ident.span,
                            "duplicate constructor `{}` (first declared at {})",
                            con.ident.name,
                            previous
                        );
                    }
                    self.local_values.insert(con.ident.name.clone(), con.ident.span);
                }
            }
        }

        for func in &module.func_decls {
            if let Some(previous) = self.local_values.get(&func.ident.name) {
                bail_resolve_at!(
                    func.ident.span,
                    "duplicate declaration of `{}` (first declared at {})",
                    func.ident.name,
                    previous
                );
            }
            self.local_values.insert(func.ident.name.clone(), func.ident.span);
        }

        Ok(())
    }

    /// Every signature must belong to exactly one function binding; a
    /// signature without a binding is only a warning.
    fn check_signatures(&self, module: &Module, reporter: &mut Reporter) -> Result<()> {
        let mut seen: IndexMap<Name, Span> = IndexMap::new();
        for sig in &module.type_sigs {
            for ident in &sig.idents {
                if let Some(previous) = seen.get(&ident.name) {
                    bail_resolve_at!(
                        ident.span,
                        "duplicate type signature for `{}` (first at {})",
                        ident.name,
                        previous
                    );
                }
                seen.insert(ident.name.clone(), ident.span);

                let has_binding = module.func_decls.iter().any(|f| f.ident.name == ident.name);
                if !has_binding {
                    reporter.warn(
                        ident.span,
                        format!("type signature for `{}` has no binding", ident.name),
                    );
                }
            }
        }
        Ok(())
    }

    fn resolve_type_decl(&mut self, decl: &mut TypeDecl) -> Result<()> {
        let bound: HashSet<String> = decl
            .type_args()
            .iter()
            .map(|v| v.name.as_str().to_string())
            .collect();
        match decl {
            TypeDecl::Data { constructors, .. } => {
                for con in constructors {
                    let span = con.ident.span;
                    for field in &mut con.fields {
                        self.resolve_type(field, &bound, span)?;
                    }
                }
            }
            TypeDecl::Synonym { ident, body, .. } => {
                let span = ident.span;
                self.resolve_type(body, &bound, span)?;
            }
        }
        Ok(())
    }

    fn resolve_func_decl(&mut self, func: &mut FuncDecl) -> Result<()> {
        self.locals.push_scope();
        for arg in &func.args {
            self.locals.insert(arg.name.clone(), ());
        }
        let result = self.resolve_expr(&mut func.body);
        self.locals.pop_scope();
        result
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<()> {
        let span = expr.h.span;
        match &mut expr.kind {
            ExprKind::Var(name) => {
                if !name.is_qualified() && self.locals.is_defined(&name.name.as_str().to_string()) {
                    return Ok(());
                }
                *name = self.resolve_name(name, Namespace::Value, "value", span)?;
                Ok(())
            }
            ExprKind::Con(name) => {
                *name = self.resolve_name(name, Namespace::Value, "constructor", span)?;
                Ok(())
            }
            ExprKind::App(func, arg) => {
                self.resolve_expr(func)?;
                self.resolve_expr(arg)
            }
            ExprKind::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond)?;
                self.resolve_expr(then_branch)?;
                self.resolve_expr(else_branch)
            }
            ExprKind::Case(scrutinee, alts) => {
                self.resolve_expr(scrutinee)?;
                for alt in alts {
                    alt.pattern.name = self.resolve_name(
                        &alt.pattern.name,
                        Namespace::Value,
                        "constructor",
                        alt.pattern.span,
                    )?;
                    self.locals.push_scope();
                    for var in &alt.var_pats {
                        self.locals.insert(var.name.clone(), ());
                    }
                    let result = self.resolve_expr(&mut alt.rhs);
                    self.locals.pop_scope();
                    result?;
                }
                Ok(())
            }
            ExprKind::Lambda(params, body) => {
                self.locals.push_scope();
                for param in params.iter() {
                    self.locals.insert(param.name.clone(), ());
                }
                let result = self.resolve_expr(body);
                self.locals.pop_scope();
                result
            }
            ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => Ok(()),
        }
    }

    fn resolve_type(&mut self, ty: &mut Type, bound: &HashSet<String>, span: Span) -> Result<()> {
        match ty {
            Type::Var(name) => {
                if !bound.contains(name.as_str()) {
                    // Type variables are bound by the enclosing declaration;
                    // a free one has no meaning here.
                    return Err(err_resolve_at!(span, "unknown type variable `{}`", name));
                }
                Ok(())
            }
            Type::Con(name) => {
                *name = self.resolve_name(name, Namespace::Type, "type constructor", span)?;
                Ok(())
            }
            Type::App(f, a) => {
                self.resolve_type(f, bound, span)?;
                self.resolve_type(a, bound, span)
            }
            Type::Func(a, r) => {
                self.resolve_type(a, bound, span)?;
                self.resolve_type(r, bound, span)
            }
        }
    }

    /// Resolve one top-level reference to its defining module.
    fn resolve_name(
        &self,
        name: &QualName,
        namespace: Namespace,
        entity: &str,
        span: Span,
    ) -> Result<QualName> {
        if let Some(module) = &name.module_name {
            // Already qualified: the module must be this one, the prelude,
            // or an import, and must actually export the name.
            if module == &self.module_name {
                if self.is_local(namespace, &name.name) {
                    return Ok(name.clone());
                }
                bail_resolve_at!(span, "unknown {} `{}`", entity, name);
            }
            if module != names::PRELUDE && !self.imports.iter().any(|i| i == module) {
                bail_resolve_at!(span, "module `{}` is not imported", module);
            }
            if self.provides(module, namespace, &name.name) {
                return Ok(name.clone());
            }
            bail_resolve_at!(span, "unknown {} `{}`", entity, name);
        }

        // Unqualified: the module's own declarations win, then the prelude
        // and the imports, which must agree on a single provider.
        if self.is_local(namespace, &name.name) {
            return Ok(QualName::qualified(&self.module_name, name.name.clone()));
        }

        let mut providers: Vec<&str> = Vec::new();
        if self.provides(names::PRELUDE, namespace, &name.name) {
            providers.push(names::PRELUDE);
        }
        for import in &self.imports {
            if self.provides(import, namespace, &name.name) {
                providers.push(import);
            }
        }

        match providers.as_slice() {
            [] => Err(err_resolve_at!(span, "unknown {} `{}`", entity, name.name)),
            [module] => Ok(QualName::qualified(module, name.name.clone())),
            multiple => Err(err_resolve_at!(
                span,
                "ambiguous {} `{}`: provided by {}",
                entity,
                name.name,
                multiple.join(", ")
            )),
        }
    }

    fn is_local(&self, namespace: Namespace, name: &Name) -> bool {
        match namespace {
            Namespace::Type => self.local_types.contains_key(name),
            Namespace::Value => self.local_values.contains_key(name),
        }
    }

    /// Whether `module` exports `name` in `namespace`. Predefined and
    /// imported entries are already registered in the environment under
    /// their qualified names.
    fn provides(&self, module: &str, namespace: Namespace, name: &Name) -> bool {
        let qualified = QualName::qualified(module, name.clone());
        match self.env.lookup(namespace, &qualified) {
            Some(Entry::Con { .. }) => true,
            Some(Entry::Func { .. }) => namespace == Namespace::Value,
            Some(Entry::Data { .. }) | Some(Entry::TypeSyn { .. }) => namespace == Namespace::Type,
            Some(_) => false,
            None => false,
        }
    }
}
