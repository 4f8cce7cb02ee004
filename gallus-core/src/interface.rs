//! Module interface extraction for JSON output.
//!
//! After a module compiles, its exported entries are summarized in a
//! [`ModuleInterface`] and written next to the generated `.v` file. When a
//! later compilation imports the module, the interface is loaded back and
//! registered in the environment, so cross-module references resolve without
//! reprocessing the source.

use crate::ast::{Name, QualName, Type};
use crate::config::{split_function_type, type_var_names};
use crate::environment::{Entry, Environment, Namespace};
use crate::err_config;
use crate::error::Result;
use crate::parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInterface {
    /// Interface format version.
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeExport>,
    #[serde(default)]
    pub synonyms: Vec<SynonymExport>,
    #[serde(default)]
    pub constructors: Vec<ConExport>,
    #[serde(default)]
    pub functions: Vec<FuncExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExport {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    pub arity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymExport {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    #[serde(rename = "type-args")]
    pub type_args: Vec<String>,
    #[serde(rename = "haskell-type")]
    pub haskell_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConExport {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncExport {
    #[serde(rename = "haskell-name")]
    pub haskell_name: String,
    #[serde(rename = "haskell-type")]
    pub haskell_type: String,
    #[serde(rename = "coq-name")]
    pub coq_name: String,
    pub arity: usize,
    pub partial: bool,
}

/// Rebuild the full function type `t1 -> ... -> tn -> r` for export.
fn function_type(arg_types: &[Type], return_type: &Type) -> Type {
    let mut ty = return_type.clone();
    for arg in arg_types.iter().rev() {
        ty = Type::func(arg.clone(), ty);
    }
    ty
}

impl ModuleInterface {
    /// Summarize the top-level entries of the module currently registered
    /// in the environment.
    pub fn from_environment(env: &Environment) -> ModuleInterface {
        let mut interface = ModuleInterface {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: env.current_module().to_string(),
            types: Vec::new(),
            synonyms: Vec::new(),
            constructors: Vec::new(),
            functions: Vec::new(),
        };

        for (name, entry) in env.current_module_entries(Namespace::Type) {
            match entry {
                Entry::Data { arity, ident } => interface.types.push(TypeExport {
                    haskell_name: name.name.as_str().to_string(),
                    coq_name: ident.clone(),
                    arity: *arity,
                }),
                Entry::TypeSyn {
                    type_args,
                    body,
                    ident,
                    ..
                } => interface.synonyms.push(SynonymExport {
                    haskell_name: name.name.as_str().to_string(),
                    coq_name: ident.clone(),
                    type_args: type_args.clone(),
                    haskell_type: body.to_string(),
                }),
                _ => {}
            }
        }

        for (name, entry) in env.current_module_entries(Namespace::Value) {
            match entry {
                Entry::Con {
                    arity,
                    arg_types,
                    return_type,
                    ident,
                    smart_ident,
                } => interface.constructors.push(ConExport {
                    haskell_name: name.name.as_str().to_string(),
                    haskell_type: function_type(arg_types, return_type).to_string(),
                    coq_name: ident.clone(),
                    coq_smart_name: smart_ident.clone(),
                    arity: *arity,
                }),
                Entry::Func {
                    arity,
                    arg_types,
                    return_type,
                    partial,
                    ident,
                    ..
                } => {
                    // Recursion helpers are internal: they carry a
                    // decreasing-argument index and partial type
                    // information, and other modules call the driver.
                    if env.dec_arg_index(name).is_some() {
                        continue;
                    }
                    let args: Option<Vec<Type>> = arg_types.iter().cloned().collect();
                    let (args, ret) = match (args, return_type) {
                        (Some(args), Some(ret)) => (args, ret),
                        _ => continue,
                    };
                    interface.functions.push(FuncExport {
                        haskell_name: name.name.as_str().to_string(),
                        haskell_type: function_type(&args, ret).to_string(),
                        coq_name: ident.clone(),
                        arity: *arity,
                        partial: *partial,
                    });
                }
                _ => {}
            }
        }

        interface
    }

    /// Enter the interface's entries into the environment, qualified under
    /// the interface's module name.
    pub fn register(&self, env: &mut Environment) -> Result<()> {
        for ty in &self.types {
            let name = QualName::qualified(&self.name, Name::from_source_str(&ty.haskell_name));
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

        for synonym in &self.synonyms {
            let name = QualName::qualified(&self.name, Name::from_source_str(&synonym.haskell_name));
            let body = parser::parse_type_string(&synonym.haskell_type)?;
            env.mark_predefined_ident(&synonym.coq_name);
            env.define(
                Namespace::Type,
                &name,
                Entry::TypeSyn {
                    arity: synonym.type_args.len(),
                    type_args: synonym.type_args.clone(),
                    body,
                    ident: synonym.coq_name.clone(),
                },
            );
        }

        for con in &self.constructors {
            let name = QualName::qualified(&self.name, Name::from_source_str(&con.haskell_name));
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
            let name = QualName::qualified(&self.name, Name::from_source_str(&func.haskell_name));
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

    /// Serialize the interface to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| err_config!("cannot serialize interface: {}", e))
    }

    /// Parse an interface from a JSON string.
    pub fn from_json(source: &str) -> Result<ModuleInterface> {
        serde_json::from_str(source).map_err(|e| err_config!("invalid interface file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define_func(
        env: &mut Environment,
        name: &str,
        signature: &str,
        arity: usize,
        partial: bool,
        ident: &str,
    ) {
        let full_type = parser::parse_type_string(signature).expect("signature parses");
        let (arg_types, return_type) = split_function_type(&full_type, arity);
        env.define(
            Namespace::Value,
            &QualName::qualified("Queue", Name::ident(name)),
            Entry::Func {
                arity,
                type_args: type_var_names(&full_type),
                arg_types: arg_types.into_iter().map(Some).collect(),
                return_type: Some(return_type),
                partial,
                ident: ident.to_string(),
            },
        );
    }

    /// An environment holding one entry of every exportable kind, plus a
    /// recursion helper that must stay internal.
    fn sample_environment() -> Environment {
        let mut env = Environment::new();
        env.set_current_module("Queue");

        env.define(
            Namespace::Type,
            &QualName::qualified("Queue", Name::ident("Tree")),
            Entry::Data {
                arity: 1,
                ident: "Tree".to_string(),
            },
        );

        env.define(
            Namespace::Type,
            &QualName::qualified("Queue", Name::ident("Forest")),
            Entry::TypeSyn {
                arity: 1,
                type_args: vec!["a".to_string()],
                body: parser::parse_type_string("[Tree a]").expect("synonym body parses"),
                ident: "Forest".to_string(),
            },
        );

        let leaf_type = parser::parse_type_string("a -> Tree a").expect("constructor type parses");
        let (arg_types, return_type) = split_function_type(&leaf_type, 1);
        env.define(
            Namespace::Value,
            &QualName::qualified("Queue", Name::ident("Leaf")),
            Entry::Con {
                arity: 1,
                arg_types,
                return_type,
                ident: "leaf".to_string(),
                smart_ident: "Leaf".to_string(),
            },
        );

        define_func(&mut env, "enqueue", "a -> [a] -> [a]", 2, false, "enqueue");
        define_func(&mut env, "top", "[a] -> a", 1, true, "top");

        // A recursion helper: fully typed, but its decreasing-argument
        // index keeps it out of the interface.
        define_func(&mut env, "top_0", "[a] -> a", 1, true, "top_0");
        env.set_dec_arg_index(QualName::qualified("Queue", Name::ident("top_0")), 0);

        env
    }

    #[test]
    fn test_export_covers_every_kind() {
        let interface = ModuleInterface::from_environment(&sample_environment());
        assert_eq!(interface.name, "Queue");

        assert_eq!(interface.types.len(), 1);
        assert_eq!(interface.types[0].haskell_name, "Tree");
        assert_eq!(interface.types[0].coq_name, "Tree");
        assert_eq!(interface.types[0].arity, 1);

        assert_eq!(interface.synonyms.len(), 1);
        let forest = &interface.synonyms[0];
        assert_eq!(forest.haskell_name, "Forest");
        assert_eq!(forest.coq_name, "Forest");
        assert_eq!(forest.type_args, vec!["a".to_string()]);
        assert_eq!(forest.haskell_type, "[Tree a]");

        assert_eq!(interface.constructors.len(), 1);
        let leaf = &interface.constructors[0];
        assert_eq!(leaf.haskell_name, "Leaf");
        assert_eq!(leaf.haskell_type, "a -> Tree a");
        assert_eq!(leaf.coq_name, "leaf");
        assert_eq!(leaf.coq_smart_name, "Leaf");
        assert_eq!(leaf.arity, 1);

        let names: Vec<&str> = interface
            .functions
            .iter()
            .map(|f| f.haskell_name.as_str())
            .collect();
        assert_eq!(names, vec!["enqueue", "top"]);
        let enqueue = &interface.functions[0];
        assert_eq!(enqueue.haskell_type, "a -> [a] -> [a]");
        assert_eq!(enqueue.arity, 2);
        assert!(!enqueue.partial);
        let top = &interface.functions[1];
        assert_eq!(top.haskell_type, "[a] -> a");
        assert!(top.partial);
    }

    #[test]
    fn test_helper_with_dec_arg_index_is_excluded() {
        // `top_0` carries full types, so only the recorded
        // decreasing-argument index keeps it internal.
        let interface = ModuleInterface::from_environment(&sample_environment());
        assert!(
            !interface.functions.iter().any(|f| f.haskell_name == "top_0"),
            "helpers must not be exported: {:?}",
            interface.functions
        );
    }

    #[test]
    fn test_round_trip_through_json_and_register() {
        let interface = ModuleInterface::from_environment(&sample_environment());
        let json = interface.to_json().expect("serializes");
        let reloaded = ModuleInterface::from_json(&json).expect("parses");
        assert_eq!(reloaded.name, "Queue");

        let mut env = Environment::new();
        reloaded.register(&mut env).expect("registers");

        let tree = QualName::qualified("Queue", Name::ident("Tree"));
        assert!(matches!(
            env.lookup(Namespace::Type, &tree),
            Some(Entry::Data { arity: 1, .. })
        ));

        let forest = QualName::qualified("Queue", Name::ident("Forest"));
        match env.lookup(Namespace::Type, &forest) {
            Some(Entry::TypeSyn {
                arity,
                type_args,
                body,
                ident,
            }) => {
                assert_eq!(*arity, 1);
                assert_eq!(type_args, &vec!["a".to_string()]);
                assert_eq!(body.to_string(), "[Tree a]");
                assert_eq!(ident, "Forest");
            }
            other => panic!("expected synonym entry, got {:?}", other),
        }

        let leaf = QualName::qualified("Queue", Name::ident("Leaf"));
        match env.lookup(Namespace::Value, &leaf) {
            Some(Entry::Con {
                arity,
                return_type,
                ident,
                smart_ident,
                ..
            }) => {
                assert_eq!(*arity, 1);
                assert_eq!(return_type.to_string(), "Tree a");
                assert_eq!(ident, "leaf");
                assert_eq!(smart_ident, "Leaf");
            }
            other => panic!("expected constructor entry, got {:?}", other),
        }

        let top = QualName::qualified("Queue", Name::ident("top"));
        match env.lookup(Namespace::Value, &top) {
            Some(Entry::Func {
                arity,
                partial,
                ident,
                return_type,
                ..
            }) => {
                assert_eq!(*arity, 1);
                assert!(*partial);
                assert_eq!(ident, "top");
                assert_eq!(
                    return_type.as_ref().map(|ty| ty.to_string()),
                    Some("a".to_string())
                );
            }
            other => panic!("expected function entry, got {:?}", other),
        }

        // Either spelling of a registered name resolves.
        let unqualified = QualName::unqualified(Name::ident("enqueue"));
        assert!(matches!(
            env.lookup(Namespace::Value, &unqualified),
            Some(Entry::Func { partial: false, .. })
        ));
    }
}
