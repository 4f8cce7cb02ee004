//! Declaration conversion: Gallina sentences for datatypes, synonyms and
//! functions.
//!
//! Order of emission inside a module follows the dependency analysis: the
//! preamble, type components, then function components. Each component
//! registers its entries first (pass 1) so mutual references resolve, then
//! emits its sentences. Recursive function components run through the
//! termination analysis and the recursion transformation; the helpers form
//! one mutually recursive `Fixpoint` block, followed by a `Definition` per
//! driver.

pub mod expr;
pub mod types;

use crate::ast::{ConDecl, DeclIdent, FuncDecl, Name, NodeCounter, QualName, Type, TypeDecl};
use crate::coq::{Binder, DefinitionSentence, FixBody, InductiveBody, Sentence, Term};
use crate::dependency::DeclGroup;
use crate::environment::{Entry, Environment, Namespace};
use crate::err_type_at;
use crate::error::Result;
use crate::interface::ModuleInterface;
use crate::partiality;
use crate::recursion;
use crate::reporter::Reporter;
use crate::signatures;
use crate::termination;
use crate::Grouped;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;
use types::{POS, SHAPE};

/// The conversion context: the module's environment, the shared node
/// counter and the diagnostics sink, threaded through every pass.
pub struct Converter<'a> {
    pub env: Environment,
    pub nc: NodeCounter,
    pub reporter: &'a mut Reporter,
}

impl Converter<'_> {
    /// Run `f` inside a fresh environment scope; released on every exit
    /// path.
    fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.env.push_scope();
        let result = f(self);
        self.env.pop_scope();
        result
    }
}

/// Convert a grouped module to Gallina sentences plus its interface.
pub fn convert_module(
    module: Grouped,
    conv: &mut Converter,
) -> Result<(Vec<Sentence>, ModuleInterface)> {
    let name = module.name.clone();
    conv.env.set_current_module(&name);
    debug!("converting module {}", name);

    let mut sentences = Vec::new();
    sentences.push(Sentence::RequireImport {
        from: Some("Base".to_string()),
        modules: vec!["Free".to_string()],
    });
    sentences.push(Sentence::RequireImport {
        from: Some("Base".to_string()),
        modules: vec!["Prelude".to_string()],
    });
    for import in &module.imports {
        sentences.push(Sentence::RequireImport {
            from: None,
            modules: vec![import.module_name.clone()],
        });
    }
    sentences.push(Sentence::ModuleStart(name.clone()));

    for group in module.type_groups {
        convert_type_group(group, conv, &mut sentences)?;
    }

    let partial_set = partiality::partial_functions(&module.func_groups, &conv.env, &name);
    for group in module.func_groups {
        convert_func_group(group, &partial_set, conv, &mut sentences)?;
    }

    sentences.push(Sentence::ModuleEnd(name));
    let interface = ModuleInterface::from_environment(&conv.env);
    Ok((sentences, interface))
}

// ----------------------------------------------------------------------
// Type declarations
// ----------------------------------------------------------------------

fn convert_type_group(
    group: DeclGroup<TypeDecl>,
    conv: &mut Converter,
    sentences: &mut Vec<Sentence>,
) -> Result<()> {
    let module = conv.env.current_module().to_string();
    let recursive = matches!(group, DeclGroup::Recursive(_));
    let members = match group {
        DeclGroup::NonRecursive(decl) => vec![decl],
        DeclGroup::Recursive(decls) => decls,
    };

    // Pass 1: entries for every member, so mutual references resolve.
    for decl in &members {
        register_type_decl(decl, conv, &module);
    }

    // Synonyms of a recursive component are expanded inside constructor
    // fields; Coq rejects them in inductive positions.
    let mut scc_synonyms: IndexMap<QualName, (Vec<String>, Type)> = IndexMap::new();
    if recursive {
        for decl in &members {
            if let TypeDecl::Synonym {
                ident,
                type_args,
                body,
            } = decl
            {
                scc_synonyms.insert(
                    QualName::qualified(&module, ident.name.clone()),
                    (
                        type_args.iter().map(|a| a.name.as_str().to_string()).collect(),
                        body.clone(),
                    ),
                );
            }
        }
    }

    let mut inductive_bodies = Vec::new();
    let mut synonym_sentences = Vec::new();
    let mut trailing = Vec::new();
    for decl in &members {
        match decl {
            TypeDecl::Data {
                ident,
                type_args,
                constructors,
            } => convert_data_decl(
                ident,
                type_args,
                constructors,
                &scc_synonyms,
                conv,
                &mut inductive_bodies,
                &mut trailing,
            )?,
            TypeDecl::Synonym {
                ident,
                type_args,
                body,
            } => synonym_sentences.push(convert_synonym_decl(ident, type_args, body, conv)?),
        }
    }

    if !inductive_bodies.is_empty() {
        sentences.push(Sentence::Inductive(inductive_bodies));
    }
    sentences.extend(synonym_sentences);
    sentences.extend(trailing);
    Ok(())
}

fn register_type_decl(decl: &TypeDecl, conv: &mut Converter, module: &str) {
    match decl {
        TypeDecl::Data {
            ident,
            type_args,
            constructors,
        } => {
            let original = QualName::qualified(module, ident.name.clone());
            let target = conv.env.rename_ident(&ident.name);
            conv.env.define(
                Namespace::Type,
                &original,
                Entry::Data {
                    arity: type_args.len(),
                    ident: target,
                },
            );

            let arg_names: Vec<String> = type_args
                .iter()
                .map(|arg| arg.name.as_str().to_string())
                .collect();
            let return_type = types::constructed_type(&original, &arg_names);
            for con in constructors {
                let con_original = QualName::qualified(module, con.ident.name.clone());
                let (raw, smart) = conv.env.rename_con_idents(&con.ident.name);
                conv.env.define(
                    Namespace::Value,
                    &con_original,
                    Entry::Con {
                        arity: con.fields.len(),
                        arg_types: con.fields.clone(),
                        return_type: return_type.clone(),
                        ident: raw,
                        smart_ident: smart,
                    },
                );
            }
        }
        TypeDecl::Synonym {
            ident,
            type_args,
            body,
        } => {
            let original = QualName::qualified(module, ident.name.clone());
            let target = conv.env.rename_ident(&ident.name);
            conv.env.define(
                Namespace::Type,
                &original,
                Entry::TypeSyn {
                    arity: type_args.len(),
                    type_args: type_args.iter().map(|a| a.name.as_str().to_string()).collect(),
                    body: body.clone(),
                    ident: target,
                },
            );
        }
    }
}

fn convert_data_decl(
    ident: &DeclIdent,
    type_args: &[DeclIdent],
    constructors: &[ConDecl],
    scc_synonyms: &IndexMap<QualName, (Vec<String>, Type)>,
    conv: &mut Converter,
    bodies: &mut Vec<InductiveBody>,
    trailing: &mut Vec<Sentence>,
) -> Result<()> {
    let module = conv.env.current_module().to_string();
    let original = QualName::qualified(&module, ident.name.clone());
    let data_ident = match conv.env.lookup(Namespace::Type, &original) {
        Some(entry) => entry.ident().to_string(),
        None => return Err(err_type_at!(ident.span, "unknown type constructor `{}`", ident.name)),
    };

    conv.scoped(|conv| -> Result<()> {
        let mut params = types::generic_binders();
        let mut tyvar_idents = Vec::new();
        for type_arg in type_args {
            let target = conv.env.rename_ident(&type_arg.name);
            conv.env.define_type_var(
                type_arg.name.as_str(),
                Entry::TypeVar {
                    ident: target.clone(),
                },
            );
            params.push(Binder::explicit(&target, Term::Sort));
            tyvar_idents.push(target);
        }

        let mut result_args = vec![Term::qualid(SHAPE), Term::qualid(POS)];
        result_args.extend(tyvar_idents.iter().map(|ident| Term::qualid(ident)));
        let result_type = Term::app(Term::qualid(&data_ident), result_args);

        let mut con_list = Vec::new();
        for con in constructors {
            let con_original = QualName::qualified(&module, con.ident.name.clone());
            let (raw, smart) = match conv.env.lookup(Namespace::Value, &con_original) {
                Some(entry @ Entry::Con { .. }) => (
                    entry.ident().to_string(),
                    entry.smart_ident().unwrap_or_default().to_string(),
                ),
                _ => {
                    return Err(err_type_at!(
                        con.ident.span,
                        "unknown constructor `{}`",
                        con.ident.name
                    ))
                }
            };

            let mut con_type = result_type.clone();
            for field in con.fields.iter().rev() {
                let expanded = types::expand_scc_synonyms(field, scc_synonyms, con.ident.span)?;
                let lifted = types::lift_type(&expanded, &conv.env)?;
                con_type = Term::arrow(lifted, con_type);
            }
            con_list.push((raw.clone(), con_type));

            let mut implicits = vec![SHAPE.to_string(), POS.to_string()];
            implicits.extend(tyvar_idents.iter().cloned());
            trailing.push(Sentence::Arguments {
                ident: raw.clone(),
                implicits,
            });

            trailing.push(Sentence::Definition(smart_constructor(
                con,
                &raw,
                &smart,
                &tyvar_idents,
                &result_type,
                conv,
            )?));
        }

        bodies.push(InductiveBody {
            name: data_ident.clone(),
            params,
            constructors: con_list,
        });
        Ok(())
    })
}

/// The smart constructor wraps the raw constructor in `pure` so callers in
/// monadic code can apply it directly. The raw constructor's parameters are
/// implicit by the `Arguments` sentence.
fn smart_constructor(
    con: &ConDecl,
    raw: &str,
    smart: &str,
    tyvar_idents: &[String],
    result_type: &Term,
    conv: &mut Converter,
) -> Result<DefinitionSentence> {
    let mut binders = types::generic_binders();
    for ident in tyvar_idents {
        binders.push(Binder::implicit(vec![ident.clone()], Term::Sort));
    }

    let mut field_vars = Vec::with_capacity(con.fields.len());
    for field in &con.fields {
        let field_ident = conv.env.fresh_ident("x");
        let lifted = types::lift_type(field, &conv.env)?;
        binders.push(Binder::explicit(&field_ident, lifted));
        field_vars.push(Term::qualid(&field_ident));
    }

    Ok(DefinitionSentence {
        name: smart.to_string(),
        binders,
        return_type: Some(types::free_type(result_type.clone())),
        body: Term::pure(Term::app(Term::qualid(raw), field_vars)),
    })
}

fn convert_synonym_decl(
    ident: &DeclIdent,
    type_args: &[DeclIdent],
    body: &Type,
    conv: &mut Converter,
) -> Result<Sentence> {
    let module = conv.env.current_module().to_string();
    let original = QualName::qualified(&module, ident.name.clone());
    let target = match conv.env.lookup(Namespace::Type, &original) {
        Some(entry) => entry.ident().to_string(),
        None => return Err(err_type_at!(ident.span, "unknown type constructor `{}`", ident.name)),
    };

    conv.scoped(|conv| -> Result<Sentence> {
        let mut binders = types::generic_binders();
        for type_arg in type_args {
            let tyvar = conv.env.rename_ident(&type_arg.name);
            conv.env.define_type_var(
                type_arg.name.as_str(),
                Entry::TypeVar {
                    ident: tyvar.clone(),
                },
            );
            binders.push(Binder::explicit(&tyvar, Term::Sort));
        }
        let body = types::convert_type(body, &conv.env)?;
        Ok(Sentence::Definition(DefinitionSentence {
            name: target,
            binders,
            return_type: Some(Term::Sort),
            body,
        }))
    })
}

// ----------------------------------------------------------------------
// Function declarations
// ----------------------------------------------------------------------

fn convert_func_group(
    group: DeclGroup<FuncDecl>,
    partial_set: &HashSet<QualName>,
    conv: &mut Converter,
    sentences: &mut Vec<Sentence>,
) -> Result<()> {
    let module = conv.env.current_module().to_string();
    match group {
        DeclGroup::NonRecursive(decl) => {
            let qualified = QualName::qualified(&module, decl.ident.name.clone());
            let partial = partial_set.contains(&qualified);
            signatures::register_func_decl(&decl, &mut conv.env, &module, partial)?;
            let definition = convert_definition(&decl, conv)?;
            sentences.push(Sentence::Definition(definition));
        }
        DeclGroup::Recursive(members) => {
            // Pass 1: register every member before any body converts.
            for decl in &members {
                let qualified = QualName::qualified(&module, decl.ident.name.clone());
                let partial = partial_set.contains(&qualified);
                signatures::register_func_decl(decl, &mut conv.env, &module, partial)?;
            }

            let refs: Vec<&FuncDecl> = members.iter().collect();
            let indices = termination::analyze_group(&refs, &module)?;
            for (decl, &index) in members.iter().zip(indices.iter()) {
                conv.env
                    .set_dec_arg_index(QualName::qualified(&module, decl.ident.name.clone()), index);
            }

            let transformed =
                recursion::transform_group(members, &indices, &mut conv.env, &mut conv.nc, &module)?;

            // Drivers are non-recursive now; their call sites must not
            // unwrap anything.
            for driver in &transformed.drivers {
                conv.env
                    .clear_dec_arg_index(&QualName::qualified(&module, driver.ident.name.clone()));
            }

            for helper in &transformed.helpers {
                let helper_name = QualName::qualified(&module, helper.decl.ident.name.clone());
                let partial = partial_set.contains(&helper.parent);
                conv.env.define(
                    Namespace::Value,
                    &helper_name,
                    Entry::Func {
                        arity: helper.decl.args.len(),
                        type_args: helper
                            .decl
                            .type_args
                            .iter()
                            .map(|a| a.name.as_str().to_string())
                            .collect(),
                        arg_types: helper.decl.args.iter().map(|pat| pat.ty.clone()).collect(),
                        return_type: None,
                        partial,
                        ident: helper.decl.ident.name.as_str().to_string(),
                    },
                );
                conv.env.set_dec_arg_index(helper_name, helper.dec_arg_index);
            }

            let mut fix_bodies = Vec::with_capacity(transformed.helpers.len());
            for helper in &transformed.helpers {
                fix_bodies.push(convert_fix_body(&helper.decl, helper.dec_arg_index, conv)?);
            }
            if !fix_bodies.is_empty() {
                sentences.push(Sentence::Fixpoint(fix_bodies));
            }
            for driver in &transformed.drivers {
                let definition = convert_definition(driver, conv)?;
                sentences.push(Sentence::Definition(definition));
            }
        }
    }
    Ok(())
}

fn func_entry(decl: &FuncDecl, conv: &Converter) -> Result<(bool, String)> {
    let module = conv.env.current_module();
    let qualified = QualName::qualified(module, decl.ident.name.clone());
    match conv.env.lookup(Namespace::Value, &qualified) {
        Some(Entry::Func { partial, ident, .. }) => Ok((*partial, ident.clone())),
        _ => Err(err_type_at!(
            decl.ident.span,
            "unknown function `{}`",
            decl.ident.name
        )),
    }
}

fn convert_definition(decl: &FuncDecl, conv: &mut Converter) -> Result<DefinitionSentence> {
    let (partial, target) = func_entry(decl, conv)?;
    conv.scoped(|conv| -> Result<DefinitionSentence> {
        let (binders, _) = build_binders(decl, partial, None, conv)?;
        let return_type = match &decl.return_type {
            Some(ty) => Some(types::lift_type(ty, &conv.env)?),
            None => None,
        };
        let body = expr::convert_expr(&decl.body, conv)?;
        Ok(DefinitionSentence {
            name: target,
            binders,
            return_type,
            body,
        })
    })
}

fn convert_fix_body(
    decl: &FuncDecl,
    dec_arg_index: usize,
    conv: &mut Converter,
) -> Result<FixBody> {
    let (partial, target) = func_entry(decl, conv)?;
    conv.scoped(|conv| -> Result<FixBody> {
        let (binders, struct_arg) = build_binders(decl, partial, Some(dec_arg_index), conv)?;
        let return_type = match &decl.return_type {
            Some(ty) => Some(types::lift_type(ty, &conv.env)?),
            None => None,
        };
        let body = expr::convert_expr(&decl.body, conv)?;
        Ok(FixBody {
            name: target,
            binders,
            struct_arg: struct_arg.expect("fixpoint body must have a decreasing binder"),
            return_type,
            body,
        })
    })
}

/// Build the binder list of a function: the two generic parameters, the
/// `Partial` instance for partial functions, one implicit `Type` binder per
/// type argument, then the value arguments. The decreasing argument of a
/// fixpoint binds pure (unlifted) and is returned for the `{struct ...}`
/// annotation.
fn build_binders(
    decl: &FuncDecl,
    partial: bool,
    dec_position: Option<usize>,
    conv: &mut Converter,
) -> Result<(Vec<Binder>, Option<String>)> {
    let mut binders = types::generic_binders();
    if partial {
        binders.push(types::partial_binder());
    }

    for type_arg in &decl.type_args {
        let target = conv.env.rename_ident(&type_arg.name);
        conv.env.define_type_var(
            type_arg.name.as_str(),
            Entry::TypeVar {
                ident: target.clone(),
            },
        );
        binders.push(Binder::implicit(vec![target], Term::Sort));
    }

    let mut struct_arg = None;
    for (position, pat) in decl.args.iter().enumerate() {
        let target = if pat.name == "_" {
            conv.env.fresh_ident("x")
        } else {
            conv.env.rename_ident(&Name::Ident(pat.name.clone()))
        };
        let pure = dec_position == Some(position);
        conv.env.define_local_var(
            &pat.name,
            Entry::Var {
                pure,
                ident: target.clone(),
            },
        );
        let ty = match &pat.ty {
            Some(ty) if pure => Some(types::convert_type(ty, &conv.env)?),
            Some(ty) => Some(types::lift_type(ty, &conv.env)?),
            None => None,
        };
        if pure {
            struct_arg = Some(target.clone());
        }
        binders.push(Binder {
            names: vec![target],
            ty,
            implicit: false,
        });
    }

    Ok((binders, struct_arg))
}
