//! Type lifting into the free-monad encoding.
//!
//! Two translations, mutually defined:
//!
//! - `lift_type` (`τ†`): the fully lifted form `Free Shape Pos τ*`, used
//!   for every function argument, return type and constructor field;
//! - `convert_type` (`τ*`): type variables become their target
//!   identifiers, every type constructor is applied to `Shape` and `Pos`
//!   first, and function arrows lift both sides.

use crate::ast::{Name, QualName, Span, Type};
use crate::coq::Term;
use crate::environment::{Entry, Environment, Namespace};
use crate::error::Result;
use crate::{err_type, err_type_at};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The two monad parameters threaded through every polymorphic construct,
/// and the name of the `Partial` instance binder.
pub const SHAPE: &str = "Shape";
pub const POS: &str = "Pos";
pub const PARTIAL_ARG: &str = "P";
pub const FREE: &str = "Free";
pub const PARTIAL_CLASS: &str = "Partial";

/// `Free Shape Pos <inner>`
pub fn free_type(inner: Term) -> Term {
    Term::app(
        Term::qualid(FREE),
        vec![Term::qualid(SHAPE), Term::qualid(POS), inner],
    )
}

/// `Shape : Type` and `Pos : Shape -> Type`, the leading binders of every
/// emitted definition.
pub fn generic_binders() -> Vec<crate::coq::Binder> {
    vec![
        crate::coq::Binder::explicit(SHAPE, Term::Sort),
        crate::coq::Binder::explicit(POS, Term::arrow(Term::qualid(SHAPE), Term::Sort)),
    ]
}

/// `P : Partial Shape Pos`
pub fn partial_binder() -> crate::coq::Binder {
    crate::coq::Binder::explicit(
        PARTIAL_ARG,
        Term::app(
            Term::qualid(PARTIAL_CLASS),
            vec![Term::qualid(SHAPE), Term::qualid(POS)],
        ),
    )
}

/// `τ†`: the fully lifted translation.
pub fn lift_type(ty: &Type, env: &Environment) -> Result<Term> {
    Ok(free_type(convert_type(ty, env)?))
}

/// `τ*`: the unlifted translation.
pub fn convert_type(ty: &Type, env: &Environment) -> Result<Term> {
    match ty {
        Type::Var(name) => {
            let key = QualName::unqualified(Name::Ident(name.clone()));
            let entry = env.lookup(Namespace::Type, &key).ok_or_else(|| {
                err_type!("type variable `{}` is not in scope during code generation", name)
            })?;
            Ok(Term::qualid(entry.ident()))
        }
        Type::Func(arg, res) => Ok(Term::arrow(lift_type(arg, env)?, lift_type(res, env)?)),
        Type::Con(_) | Type::App(_, _) => {
            let (head, args) = ty.app_spine();
            let name = match head {
                Type::Con(name) => name,
                _ => {
                    return Err(err_type!(
                        "type application must be headed by a constructor, got `{}`",
                        ty
                    ))
                }
            };
            let entry = env
                .lookup(Namespace::Type, name)
                .ok_or_else(|| err_type!("unknown type constructor `{}`", name))?;
            let mut terms = vec![Term::qualid(SHAPE), Term::qualid(POS)];
            for arg in args {
                terms.push(convert_type(arg, env)?);
            }
            Ok(Term::app(Term::qualid(entry.ident()), terms))
        }
    }
}

/// Eagerly expand occurrences of the given synonyms (the synonyms of the
/// enclosing recursive component) in a constructor field type. Coq rejects
/// type synonyms in recursive inductive positions, so the field must spell
/// the datatypes out. Re-entering a synonym during its own expansion means
/// the synonyms are mutually recursive, which is unrepresentable.
pub fn expand_scc_synonyms(
    ty: &Type,
    synonyms: &IndexMap<QualName, (Vec<String>, Type)>,
    span: Span,
) -> Result<Type> {
    let mut stack = Vec::new();
    expand(ty, synonyms, &mut stack, span)
}

fn expand(
    ty: &Type,
    synonyms: &IndexMap<QualName, (Vec<String>, Type)>,
    stack: &mut Vec<QualName>,
    span: Span,
) -> Result<Type> {
    match ty {
        Type::Var(_) => Ok(ty.clone()),
        Type::Func(arg, res) => Ok(Type::func(
            expand(arg, synonyms, stack, span)?,
            expand(res, synonyms, stack, span)?,
        )),
        Type::Con(_) | Type::App(_, _) => {
            let (head, args) = ty.app_spine();
            let expanded_args: Vec<Type> = args
                .iter()
                .map(|arg| expand(arg, synonyms, stack, span))
                .collect::<Result<_>>()?;

            if let Type::Con(name) = head {
                if let Some((params, body)) = synonyms.get(name) {
                    if stack.contains(name) {
                        return Err(err_type_at!(
                            span,
                            "mutually recursive type synonym `{}`",
                            name
                        ));
                    }
                    if params.len() != expanded_args.len() {
                        return Err(err_type_at!(
                            span,
                            "type synonym `{}` expects {} arguments, got {}",
                            name,
                            params.len(),
                            expanded_args.len()
                        ));
                    }
                    let subst: HashMap<String, Type> = params
                        .iter()
                        .cloned()
                        .zip(expanded_args.iter().cloned())
                        .collect();
                    let substituted = body.substitute(&subst);
                    stack.push(name.clone());
                    let result = expand(&substituted, synonyms, stack, span);
                    stack.pop();
                    return result;
                }
            }

            let mut result = match head {
                Type::Con(name) => Type::Con(name.clone()),
                other => other.clone(),
            };
            for arg in expanded_args {
                result = Type::app(result, arg);
            }
            Ok(result)
        }
    }
}

/// A constructor's return type `T a1 ... ak` as an IR type, used for smart
/// constructor result types and constructor entries.
pub fn constructed_type(type_name: &QualName, type_args: &[String]) -> Type {
    let mut ty = Type::Con(type_name.clone());
    for arg in type_args {
        ty = Type::app(ty, Type::Var(arg.clone()));
    }
    ty
}

/// Resolve a constructor pattern or reference to its entry.
pub fn constructor_entry<'e>(env: &'e Environment, name: &QualName, span: Span) -> Result<&'e Entry> {
    match env.lookup(Namespace::Value, name) {
        Some(entry @ Entry::Con { .. }) => Ok(entry),
        _ => Err(err_type_at!(span, "unknown constructor `{}`", name)),
    }
}
