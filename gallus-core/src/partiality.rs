//! Partiality analysis.
//!
//! A function is partial iff its body mentions `undefined` or `error`, or
//! calls a partial function. Components are processed in dependency order,
//! so callees in earlier components are already classified; within a
//! component the classification iterates to a fixpoint.

use crate::ast::{Expr, ExprKind, FuncDecl, QualName};
use crate::dependency::DeclGroup;
use crate::environment::{Environment, Namespace};
use log::debug;
use std::collections::HashSet;

/// Classify every function of the module. Returns the set of qualified
/// names of partial functions.
pub fn partial_functions(
    groups: &[DeclGroup<FuncDecl>],
    env: &Environment,
    module: &str,
) -> HashSet<QualName> {
    let mut partial: HashSet<QualName> = HashSet::new();

    for group in groups {
        let members = group.members();
        loop {
            let mut changed = false;
            for decl in &members {
                let name = QualName::qualified(module, decl.ident.name.clone());
                if partial.contains(&name) {
                    continue;
                }
                if body_is_partial(&decl.body, &partial, env) {
                    debug!("`{}` is partial", name);
                    partial.insert(name);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    partial
}

fn body_is_partial(expr: &Expr, partial: &HashSet<QualName>, env: &Environment) -> bool {
    match &expr.kind {
        ExprKind::Undefined | ExprKind::ErrorCall(_) => true,
        ExprKind::Var(name) => {
            if partial.contains(name) {
                return true;
            }
            env.lookup(Namespace::Value, name)
                .map(|entry| entry.is_partial())
                .unwrap_or(false)
        }
        ExprKind::Con(_) | ExprKind::IntLiteral(_) => false,
        ExprKind::App(f, a) => {
            body_is_partial(f, partial, env) || body_is_partial(a, partial, env)
        }
        ExprKind::If(c, t, e) => {
            body_is_partial(c, partial, env)
                || body_is_partial(t, partial, env)
                || body_is_partial(e, partial, env)
        }
        ExprKind::Case(scrutinee, alts) => {
            body_is_partial(scrutinee, partial, env)
                || alts.iter().any(|alt| body_is_partial(&alt.rhs, partial, env))
        }
        ExprKind::Lambda(_, body) => body_is_partial(body, partial, env),
    }
}
