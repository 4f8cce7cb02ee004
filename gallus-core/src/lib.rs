pub mod ast;
pub mod codegen;
pub mod config;
pub mod coq;
pub mod dependency;
pub mod environment;
pub mod error;
pub mod interface;
pub mod lexer;
pub mod name_resolution;
pub mod parser;
pub mod partiality;
pub mod recursion;
pub mod reporter;
pub mod scope;
pub mod signatures;
pub mod termination;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod dependency_tests;
#[cfg(test)]
mod environment_tests;
#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod recursion_tests;
#[cfg(test)]
mod scope_tests;
#[cfg(test)]
mod termination_tests;

use std::marker::PhantomData;

use ast::{ImportDecl, Module, NodeCounter, TypeDecl};
use dependency::DeclGroup;
use error::Result;

pub use codegen::Converter;
pub use environment::Environment;
pub use reporter::Reporter;

// =============================================================================
// Generic ID allocation
// =============================================================================

/// Generic counter for generating unique IDs.
///
/// The ID type must implement `From<u32>` to convert the raw counter value.
#[derive(Debug, Clone)]
pub struct IdSource<Id> {
    next_id: u32,
    _phantom: PhantomData<Id>,
}

impl<Id: From<u32>> IdSource<Id> {
    pub fn new() -> Self {
        IdSource {
            next_id: 0,
            _phantom: PhantomData,
        }
    }

    pub fn next_id(&mut self) -> Id {
        let id = Id::from(self.next_id);
        self.next_id += 1;
        id
    }
}

impl<Id: From<u32>> Default for IdSource<Id> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Typestate compiler pipeline
// =============================================================================
//
// Each struct represents a stage; methods consume `self` and return the
// next stage, enforcing valid ordering:
//
//   let parsed = Compiler::parse(source, &mut node_counter)?;
//   let resolved = parsed.resolve(&mut env, &mut reporter)?;   // qualify names
//   let grouped = resolved.group()?;                            // SCCs + signatures
//   let converted = grouped.convert(&mut converter)?;           // Gallina sentences
//   let text = converted.render();

/// Entry point for the compiler. Use `Compiler::parse()` to start the
/// pipeline.
pub struct Compiler;

impl Compiler {
    /// Parse source code into the IR using the provided node counter.
    pub fn parse(source: &str, node_counter: &mut NodeCounter) -> Result<Parsed> {
        let module = parser::parse_module(source, node_counter)?;
        Ok(Parsed { module })
    }
}

/// Source has been parsed into the IR
pub struct Parsed {
    pub module: Module,
}

impl Parsed {
    /// Register the interfaces of imported modules and qualify every
    /// reference with its defining module.
    pub fn resolve(mut self, env: &mut Environment, reporter: &mut Reporter) -> Result<Resolved> {
        for import in &self.module.imports {
            if let Some(interface) = env.interface(&import.module_name).cloned() {
                interface.register(env)?;
            }
        }
        name_resolution::resolve_module(&mut self.module, env, reporter)?;
        Ok(Resolved {
            module: self.module,
        })
    }
}

/// Names have been resolved
pub struct Resolved {
    pub module: Module,
}

impl Resolved {
    /// Elaborate signatures and group declarations into dependency order.
    pub fn group(self) -> Result<Grouped> {
        let name = self.module.target_name().to_string();
        let Module {
            imports,
            type_decls,
            type_sigs,
            mut func_decls,
            ..
        } = self.module;

        let table = signatures::signature_table(&type_sigs);
        for func in &mut func_decls {
            signatures::elaborate_func_decl(func, &table)?;
        }

        let type_groups = dependency::group_type_decls(type_decls, &name)?;
        let func_groups = dependency::group_func_decls(func_decls, &name);

        Ok(Grouped {
            name,
            imports,
            type_groups,
            func_groups,
        })
    }
}

/// Declarations have been grouped into strongly connected components in
/// dependency order, signatures elaborated.
pub struct Grouped {
    pub name: String,
    pub imports: Vec<ImportDecl>,
    pub type_groups: Vec<DeclGroup<TypeDecl>>,
    pub func_groups: Vec<DeclGroup<ast::FuncDecl>>,
}

impl Grouped {
    /// Convert the module to Gallina sentences.
    pub fn convert(self, converter: &mut Converter) -> Result<Converted> {
        let (sentences, interface) = codegen::convert_module(self, converter)?;
        Ok(Converted {
            sentences,
            interface,
        })
    }
}

/// Final stage: Gallina sentences plus the module's interface
#[derive(Debug)]
pub struct Converted {
    pub sentences: Vec<coq::Sentence>,
    pub interface: interface::ModuleInterface,
}

impl Converted {
    /// Render the sentences to the text of a `.v` file.
    pub fn render(&self) -> String {
        coq::pretty::write_sentences(&self.sentences)
    }
}

/// Run the whole pipeline for one module against the given base
/// environment. The environment is cloned per module; the caller decides
/// whether to cache the resulting interface.
pub fn compile_source(
    source: &str,
    env: &Environment,
    reporter: &mut Reporter,
) -> Result<Converted> {
    let mut node_counter = NodeCounter::new();
    let mut module_env = env.clone();
    let parsed = Compiler::parse(source, &mut node_counter)?;
    let resolved = parsed.resolve(&mut module_env, &mut *reporter)?;
    let grouped = resolved.group()?;
    let mut converter = Converter {
        env: module_env,
        nc: node_counter,
        reporter,
    };
    grouped.convert(&mut converter)
}

/// A base environment with the default predefined entries, as the driver
/// builds it before compiling anything.
pub fn default_environment() -> Result<Environment> {
    let mut env = Environment::new();
    config::EnvConfig::default_config()?.apply(&mut env)?;
    Ok(env)
}
