//! Signature elaboration.
//!
//! Every top-level function must have a type signature before code
//! generation begins. This pass matches each binding against its declared
//! schema, fills the function's type arguments, argument types and return
//! type, and registers the function entry in the environment so mutual
//! references resolve before any body is converted.

use crate::ast::{FuncDecl, Name, QualName, TypeSchema, TypeSig};
use crate::environment::{Entry, Environment, Namespace};
use crate::err_type_at;
use crate::error::Result;
use indexmap::IndexMap;
use log::debug;

/// Collect the signatures of a module keyed by function name.
pub fn signature_table(sigs: &[TypeSig]) -> IndexMap<Name, TypeSchema> {
    let mut table = IndexMap::new();
    for sig in sigs {
        for ident in &sig.idents {
            table.insert(ident.name.clone(), sig.schema.clone());
        }
    }
    table
}

/// Elaborate one function against its signature: fill `type_args`,
/// argument pattern types and `return_type` in place.
pub fn elaborate_func_decl(func: &mut FuncDecl, signatures: &IndexMap<Name, TypeSchema>) -> Result<()> {
    let schema = signatures.get(&func.ident.name).ok_or_else(|| {
        err_type_at!(
            func.ident.span,
            "missing type signature for function `{}`",
            func.ident.name
        )
    })?;

    let arity = func.args.len();
    let (arg_types, return_type) = schema.body.split_func(arity);
    if arg_types.len() < arity {
        return Err(err_type_at!(
            func.ident.span,
            "the signature of `{}` admits {} arguments, but the binding has {}",
            func.ident.name,
            arg_types.len(),
            arity
        ));
    }

    func.type_args = schema.type_vars.clone();
    func.return_type = Some(return_type.clone());
    let arg_types: Vec<_> = arg_types.into_iter().cloned().collect();
    for (pat, ty) in func.args.iter_mut().zip(arg_types) {
        pat.ty = Some(ty);
    }

    debug!(
        "elaborated `{}`: {} type args, arity {}",
        func.ident.name,
        func.type_args.len(),
        arity
    );
    Ok(())
}

/// Register the environment entry of an elaborated function (pass 1 of
/// declaration conversion). `partial` comes from the partiality analysis.
pub fn register_func_decl(
    func: &FuncDecl,
    env: &mut Environment,
    module: &str,
    partial: bool,
) -> Result<()> {
    let original = QualName::qualified(module, func.ident.name.clone());
    let ident = env.rename_ident(&func.ident.name);
    env.define(
        Namespace::Value,
        &original,
        Entry::Func {
            arity: func.args.len(),
            type_args: func
                .type_args
                .iter()
                .map(|v| v.name.as_str().to_string())
                .collect(),
            arg_types: func.args.iter().map(|pat| pat.ty.clone()).collect(),
            return_type: func.return_type.clone(),
            partial,
            ident,
        },
    );
    Ok(())
}
