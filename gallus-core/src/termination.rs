//! Termination analysis.
//!
//! For every recursive component, enumerate tuples of decreasing-argument
//! indices in lexicographic order and accept the first tuple under which
//! every recursive call in every member body is structurally decreasing.
//!
//! The structural-decrease check carries the caller's decreasing variable
//! and a set `smaller` of variables known to be structural subterms of it.
//! Matching on the decreasing variable (or on a variable already in
//! `smaller`) adds the pattern variables to `smaller`; every other binder
//! only shadows.

use crate::ast::{Expr, ExprKind, FuncDecl, QualName};
use crate::err_termination_at;
use crate::error::Result;
use log::debug;
use std::collections::HashSet;

/// Pick a decreasing-argument index for every member of a recursive
/// component. The result is index-aligned with `members`.
pub fn analyze_group(members: &[&FuncDecl], module: &str) -> Result<Vec<usize>> {
    let names: Vec<QualName> = members
        .iter()
        .map(|decl| QualName::qualified(module, decl.ident.name.clone()))
        .collect();
    let arities: Vec<usize> = members.iter().map(|decl| decl.args.len()).collect();

    if arities.iter().all(|&a| a > 0) {
        let mut tuple = vec![0usize; members.len()];
        loop {
            if group_decreases(members, &names, &tuple) {
                debug!("decreasing arguments for {:?}: {:?}", names, tuple);
                return Ok(tuple);
            }
            if !bump(&mut tuple, &arities) {
                break;
            }
        }
    }

    let first = members[0];
    Err(err_termination_at!(
        first.ident.span,
        "cannot determine a decreasing argument for `{}`",
        first.ident.name
    ))
}

/// Advance the index tuple in lexicographic order; false when exhausted.
fn bump(tuple: &mut [usize], arities: &[usize]) -> bool {
    for position in (0..tuple.len()).rev() {
        tuple[position] += 1;
        if tuple[position] < arities[position] {
            return true;
        }
        tuple[position] = 0;
    }
    false
}

fn group_decreases(members: &[&FuncDecl], names: &[QualName], tuple: &[usize]) -> bool {
    members.iter().enumerate().all(|(position, decl)| {
        let dec_var = &decl.args[tuple[position]].name;
        let ctx = Ctx {
            names,
            tuple,
            dec_var,
            dec_shadowed: false,
            smaller: HashSet::new(),
        };
        decreases(&decl.body, &ctx)
    })
}

#[derive(Clone)]
struct Ctx<'a> {
    /// Qualified names of the component members.
    names: &'a [QualName],
    /// Candidate decreasing-argument index per member.
    tuple: &'a [usize],
    /// The caller's decreasing variable.
    dec_var: &'a str,
    dec_shadowed: bool,
    /// Variables structurally smaller than the decreasing variable.
    smaller: HashSet<String>,
}

impl<'a> Ctx<'a> {
    fn member_index(&self, name: &QualName) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether matching on `var` exposes subterms of the decreasing
    /// argument.
    fn scrutinee_decreases(&self, var: &str) -> bool {
        (!self.dec_shadowed && var == self.dec_var) || self.smaller.contains(var)
    }

    fn shadow(&mut self, binders: &[String]) {
        for binder in binders {
            self.smaller.remove(binder);
            if binder == self.dec_var {
                self.dec_shadowed = true;
            }
        }
    }
}

fn decreases(expr: &Expr, ctx: &Ctx) -> bool {
    match &expr.kind {
        // A bare reference to a member cannot be checked structurally.
        ExprKind::Var(name) => ctx.member_index(name).is_none(),
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {
            true
        }
        ExprKind::App(_, _) => {
            let (head, args) = expr.app_spine();
            if let ExprKind::Var(name) = &head.kind {
                if let Some(callee) = ctx.member_index(name) {
                    let position = ctx.tuple[callee];
                    if args.len() <= position {
                        return false;
                    }
                    let decreasing_arg = args[position];
                    let passes = match &decreasing_arg.kind {
                        ExprKind::Var(arg_name) if !arg_name.is_qualified() => {
                            ctx.smaller.contains(arg_name.name.as_str())
                        }
                        _ => false,
                    };
                    return passes && args.iter().all(|arg| decreases(arg, ctx));
                }
            }
            decreases(head, ctx) && args.iter().all(|arg| decreases(arg, ctx))
        }
        ExprKind::If(cond, then_branch, else_branch) => {
            decreases(cond, ctx) && decreases(then_branch, ctx) && decreases(else_branch, ctx)
        }
        ExprKind::Case(scrutinee, alts) => {
            if !decreases(scrutinee, ctx) {
                return false;
            }
            let expose = match &scrutinee.kind {
                ExprKind::Var(name) if !name.is_qualified() => {
                    ctx.scrutinee_decreases(name.name.as_str())
                }
                _ => false,
            };
            alts.iter().all(|alt| {
                let binders: Vec<String> = alt.var_pats.iter().map(|p| p.name.clone()).collect();
                let mut alt_ctx = ctx.clone();
                alt_ctx.shadow(&binders);
                if expose {
                    for binder in &binders {
                        alt_ctx.smaller.insert(binder.clone());
                    }
                }
                decreases(&alt.rhs, &alt_ctx)
            })
        }
        ExprKind::Lambda(params, body) => {
            let binders: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
            let mut lambda_ctx = ctx.clone();
            lambda_ctx.shadow(&binders);
            decreases(body, &lambda_ctx)
        }
    }
}
