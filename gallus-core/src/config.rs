//! The predefined-environment file.
//!
//! A TOML table-of-tables with three arrays (`types`, `constructors`,
//! `functions`) describing the entries of the Base library that are
//! available to every compiled module. A built-in copy (`base/env.toml`)
//! is embedded as the fallback when no `--base-library` is given.

use crate::ast::{names, Name, QualName, Type};
use crate::environment::{Entry, Environment, Namespace};
use crate::err_config;
use crate::error::Result;
use crate::parser;
use serde::Deserialize;

/// The environment file embedded from `base/env.toml`.
pub const DEFAULT_ENV_TOML: &str = include_str!("../../base/env.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    #[serde(default)]
    pub constructors: Vec<ConConfig>,
    #[serde(default)]
    pub functions: Vec<FuncConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    pub arity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConConfig {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "haskell-type")]
    pub haskell_type: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    #[serde(rename = "coq-smart-name")]
    pub coq_smart_name: String,
    pub arity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuncConfig {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "haskell-type")]
    pub haskell_type: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    pub arity: usize,
    #[serde(default)]
    pub partial: bool,
}

impl EnvConfig {
    pub fn from_toml(source: &str) -> Result<EnvConfig> {
        toml::from_str(source).map_err(|e| err_config!("invalid environment file: {}", e))
    }

    pub fn default_config() -> Result<EnvConfig> {
        Self::from_toml(DEFAULT_ENV_TOML)
    }

    /// Enter every configured entry into the environment, qualified under
    /// the predefined prelude module.
    pub fn apply(&self, env: &mut Environment) -> Result<()> {
        for ty in &self.types {
            let name = QualName::qualified(names::PRELUDE, Name::from_source_str(&ty.haskell_name));
            env.mark_predefined_ident(&ty.coq_name);
            env.define(
                Namespace::Type,
                &name,
                Entry::Data {
                    arity: ty.arity,
                    ident: ty.coq_name.clone(),
                },
            );
        }

        for con in &self.constructors {
            let name = QualName::qualified(names::PRELUDE, Name::from_source_str(&con.haskell_name));
            let full_type = parser::parse_type_string(&con.haskell_type)?;
            let (arg_types, return_type) = split_function_type(&full_type, con.arity);
            env.mark_predefined_ident(&con.coq_name);
            env.mark_predefined_ident(&con.coq_smart_name);
            env.define(
                Namespace::Value,
                &name,
                Entry::Con {
                    arity: con.arity,
                    arg_types,
                    return_type,
                    ident: con.coq_name.clone(),
                    smart_ident: con.coq_smart_name.clone(),
                },
            );
        }

        for func in &self.functions {
            let name = QualName::qualified(names::PRELUDE, Name::from_source_str(&func.haskell_name));
            let full_type = parser::parse_type_string(&func.haskell_type)?;
            let (arg_types, return_type) = split_function_type(&full_type, func.arity);
            let type_args = type_var_names(&full_type);
            env.mark_predefined_ident(&func.coq_name);
            env.define(
                Namespace::Value,
                &name,
                Entry::Func {
                    arity: func.arity,
                    type_args,
                    arg_types: arg_types.into_iter().map(Some).collect(),
                    return_type: Some(return_type),
                    partial: func.partial,
                    ident: func.coq_name.clone(),
                },
            );
        }

        Ok(())
    }
}

/// Split `t1 -> ... -> tn -> r` into owned argument types and result.
pub fn split_function_type(ty: &Type, arity: usize) -> (Vec<Type>, Type) {
    let (args, rest) = ty.split_func(arity);
    (args.into_iter().cloned().collect(), rest.clone())
}

/// The free type variables of a type in first-occurrence order.
pub fn type_var_names(ty: &Type) -> Vec<String> {
    parser::generalize(ty.clone(), crate::ast::Span::new(0, 0, 0, 0))
        .type_vars
        .into_iter()
        .map(|ident| ident.name.as_str().to_string())
        .collect()
}
