//! Expression lifting.
//!
//! Every emitted term has type `Free Shape Pos τ*`. Application is driven
//! by the head of the spine: known functions and smart constructors are
//! applied directly after eta-expansion to their full arity; anything else
//! is a monadic value applied argument by argument through `>>=`. A bind
//! whose left-hand side is literally `pure x` substitutes `x` and omits
//! the bind.

use super::types::{self, PARTIAL_ARG, POS, SHAPE};
use super::Converter;
use crate::ast::{names, Expr, ExprKind, Name, QualName, VarPat};
use crate::coq::{Binder, MatchArm, Term};
use crate::environment::{Entry, Namespace};
use crate::err_type_at;
use crate::error::Result;

pub fn convert_expr(expr: &Expr, conv: &mut Converter) -> Result<Term> {
    match &expr.kind {
        ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::App(_, _) => convert_application(expr, conv),
        ExprKind::If(cond, then_branch, else_branch) => {
            let cond_term = convert_expr(cond, conv)?;
            let then_term = convert_expr(then_branch, conv)?;
            let else_term = convert_expr(else_branch, conv)?;
            let (true_ident, false_ident) = bool_constructors(conv);
            let prefix = bind_prefix(cond);
            Ok(mk_bind(cond_term, &prefix, conv, |value| {
                Term::Match(
                    Box::new(value),
                    vec![
                        MatchArm {
                            constructor: true_ident,
                            vars: vec![],
                            rhs: then_term,
                        },
                        MatchArm {
                            constructor: false_ident,
                            vars: vec![],
                            rhs: else_term,
                        },
                    ],
                )
            }))
        }
        ExprKind::Case(scrutinee, alts) => {
            let scrutinee_term = convert_expr(scrutinee, conv)?;
            let mut arms = Vec::with_capacity(alts.len());
            for alt in alts {
                let raw = types::constructor_entry(&conv.env, &alt.pattern.name, alt.pattern.span)?
                    .ident()
                    .to_string();
                conv.env.push_scope();
                let arm = (|| -> Result<MatchArm> {
                    let mut vars = Vec::with_capacity(alt.var_pats.len());
                    for pat in &alt.var_pats {
                        let ident = local_binder_ident(pat, conv);
                        conv.env.define_local_var(
                            &pat.name,
                            Entry::Var {
                                pure: false,
                                ident: ident.clone(),
                            },
                        );
                        vars.push(ident);
                    }
                    let rhs = convert_expr(&alt.rhs, conv)?;
                    Ok(MatchArm {
                        constructor: raw,
                        vars,
                        rhs,
                    })
                })();
                conv.env.pop_scope();
                arms.push(arm?);
            }
            let prefix = bind_prefix(scrutinee);
            Ok(mk_bind(scrutinee_term, &prefix, conv, |value| {
                Term::Match(Box::new(value), arms)
            }))
        }
        ExprKind::Lambda(params, body) => {
            conv.env.push_scope();
            let converted = (|| -> Result<(Vec<String>, Term)> {
                let mut idents = Vec::with_capacity(params.len());
                for pat in params {
                    let ident = local_binder_ident(pat, conv);
                    conv.env.define_local_var(
                        &pat.name,
                        Entry::Var {
                            pure: false,
                            ident: ident.clone(),
                        },
                    );
                    idents.push(ident);
                }
                let body = convert_expr(body, conv)?;
                Ok((idents, body))
            })();
            conv.env.pop_scope();
            let (idents, mut term) = converted?;
            for ident in idents.iter().rev() {
                term = Term::pure(Term::Fun(vec![Binder::untyped(ident)], Box::new(term)));
            }
            Ok(term)
        }
        ExprKind::IntLiteral(value) => Ok(Term::pure(Term::IntLiteral(*value))),
        ExprKind::Undefined => Ok(partial_term("undefined", vec![])),
        ExprKind::ErrorCall(message) => {
            Ok(partial_term("error", vec![Term::StringLiteral(message.clone())]))
        }
    }
}

/// `undefined Shape Pos P` / `error Shape Pos P "..."`: the predefined
/// partial terms, explicitly applied to the instance binder.
fn partial_term(name: &str, extra: Vec<Term>) -> Term {
    let mut args = vec![
        Term::qualid(SHAPE),
        Term::qualid(POS),
        Term::qualid(PARTIAL_ARG),
    ];
    args.extend(extra);
    Term::app(Term::qualid(name), args)
}

fn bool_constructors(conv: &Converter) -> (String, String) {
    let lookup = |haskell: &str, fallback: &str| {
        conv.env
            .lookup(
                Namespace::Value,
                &QualName::qualified(names::PRELUDE, Name::Ident(haskell.to_string())),
            )
            .map(|entry| entry.ident().to_string())
            .unwrap_or_else(|| fallback.to_string())
    };
    (lookup("True", "true"), lookup("False", "false"))
}

fn local_binder_ident(pat: &VarPat, conv: &mut Converter) -> String {
    if pat.name == "_" {
        conv.env.fresh_ident("x")
    } else {
        conv.env.rename_ident(&Name::Ident(pat.name.clone()))
    }
}

/// The prefix for a generated bind variable: the bound value's source name
/// when it has one.
fn bind_prefix(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Var(name) => match &name.name {
            Name::Ident(ident) => ident.clone(),
            Name::Symbol(_) => "y".to_string(),
        },
        _ => "y".to_string(),
    }
}

/// `arg >>= (fun x => k x)`, short-circuiting when `arg` is `pure v`.
fn mk_bind(arg: Term, prefix: &str, conv: &mut Converter, k: impl FnOnce(Term) -> Term) -> Term {
    let arg = match arg {
        Term::Pure(inner) => return k(*inner),
        other => other,
    };
    let var = conv.env.fresh_ident(prefix);
    let body = k(Term::qualid(&var));
    Term::bind(arg, Term::Fun(vec![Binder::untyped(&var)], Box::new(body)))
}

fn convert_application(expr: &Expr, conv: &mut Converter) -> Result<Term> {
    let (head, args) = expr.app_spine();

    match &head.kind {
        ExprKind::Con(name) => {
            let (arity, smart) = match conv.env.lookup(Namespace::Value, name) {
                Some(Entry::Con {
                    arity, smart_ident, ..
                }) => (*arity, smart_ident.clone()),
                _ => return Err(err_type_at!(head.h.span, "unknown constructor `{}`", name)),
            };
            let callee = Term::app(
                Term::qualid(&smart),
                vec![Term::qualid(SHAPE), Term::qualid(POS)],
            );
            apply_known(callee, arity, None, &args, conv)
        }
        ExprKind::Var(name) => {
            let entry = conv.env.lookup(Namespace::Value, name).cloned();
            match entry {
                Some(Entry::Var { pure, ident }) => {
                    let base = if pure {
                        Term::pure(Term::qualid(&ident))
                    } else {
                        Term::qualid(&ident)
                    };
                    apply_monadic_chain(base, &args, conv)
                }
                Some(Entry::Func {
                    arity,
                    partial,
                    ident,
                    ..
                }) => {
                    let mut callee = Term::app(
                        Term::qualid(&ident),
                        vec![Term::qualid(SHAPE), Term::qualid(POS)],
                    );
                    if partial {
                        callee = Term::app(callee, vec![Term::qualid(PARTIAL_ARG)]);
                    }
                    let dec = conv.env.dec_arg_index(name);
                    apply_known(callee, arity, dec, &args, conv)
                }
                Some(Entry::Con {
                    arity, smart_ident, ..
                }) => {
                    let callee = Term::app(
                        Term::qualid(&smart_ident),
                        vec![Term::qualid(SHAPE), Term::qualid(POS)],
                    );
                    apply_known(callee, arity, None, &args, conv)
                }
                _ => Err(err_type_at!(head.h.span, "unknown value `{}`", name)),
            }
        }
        _ => {
            let base = convert_expr(head, conv)?;
            apply_monadic_chain(base, &args, conv)
        }
    }
}

/// Apply a known callee of the given arity: direct application when
/// saturated, eta-expansion when under-applied, bind-application of the
/// surplus when over-applied. `dec` is the callee's decreasing-argument
/// position; that argument is bind-opened so it is passed pure.
fn apply_known(
    callee: Term,
    arity: usize,
    dec: Option<usize>,
    args: &[&Expr],
    conv: &mut Converter,
) -> Result<Term> {
    let mut arg_terms = Vec::with_capacity(args.len().max(arity));
    for arg in args {
        arg_terms.push(convert_expr(arg, conv)?);
    }
    let dec_prefix = dec.map(|position| {
        args.get(position)
            .map(|arg| bind_prefix(arg))
            .unwrap_or_else(|| "y".to_string())
    });

    if arg_terms.len() >= arity {
        let extra = arg_terms.split_off(arity);
        let mut result = saturated_call(callee, arg_terms, dec, dec_prefix, conv);
        for arg in extra {
            result = apply_monadic(result, arg, conv);
        }
        Ok(result)
    } else {
        // Eta-expand the outermost call to full arity.
        let missing = arity - arg_terms.len();
        let fresh: Vec<String> = (0..missing).map(|_| conv.env.fresh_ident("x")).collect();
        arg_terms.extend(fresh.iter().map(|name| Term::qualid(name)));
        let mut result = saturated_call(callee, arg_terms, dec, dec_prefix, conv);
        for name in fresh.iter().rev() {
            result = Term::pure(Term::Fun(vec![Binder::untyped(name)], Box::new(result)));
        }
        Ok(result)
    }
}

fn saturated_call(
    callee: Term,
    mut arg_terms: Vec<Term>,
    dec: Option<usize>,
    dec_prefix: Option<String>,
    conv: &mut Converter,
) -> Term {
    match dec {
        Some(position) => {
            let dec_arg = arg_terms[position].clone();
            let prefix = dec_prefix.unwrap_or_else(|| "y".to_string());
            mk_bind(dec_arg, &prefix, conv, move |value| {
                arg_terms[position] = value;
                Term::app(callee, arg_terms)
            })
        }
        None => Term::app(callee, arg_terms),
    }
}

/// `f >>= (fun g => g arg)`: application of a monadic function value.
fn apply_monadic(func: Term, arg: Term, conv: &mut Converter) -> Term {
    mk_bind(func, "f", conv, |g| Term::app(g, vec![arg]))
}

fn apply_monadic_chain(base: Term, args: &[&Expr], conv: &mut Converter) -> Result<Term> {
    let mut result = base;
    for arg in args {
        let arg_term = convert_expr(arg, conv)?;
        result = apply_monadic(result, arg_term, conv);
    }
    Ok(result)
}
