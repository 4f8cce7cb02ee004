//! Dependency analysis.
//!
//! Builds the type-level and value-level dependency graphs of a module and
//! groups declarations into strongly connected components, ordered so that
//! every component precedes the components that depend on it. The SCC
//! computation is an iterative Tarjan so adversarial inputs cannot overflow
//! the call stack.

use crate::ast::{Expr, ExprKind, FuncDecl, QualName, Type, TypeDecl};
use crate::err_type_at;
use crate::error::Result;
use indexmap::IndexMap;
use log::debug;

/// A strongly connected component of declarations.
///
/// A singleton without a self-edge is `NonRecursive`; everything else,
/// including a self-calling singleton, is `Recursive`.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclGroup<T> {
    NonRecursive(T),
    Recursive(Vec<T>),
}

impl<T> DeclGroup<T> {
    pub fn members(&self) -> Vec<&T> {
        match self {
            DeclGroup::NonRecursive(decl) => vec![decl],
            DeclGroup::Recursive(decls) => decls.iter().collect(),
        }
    }
}

/// Group the type declarations of a module into dependency order.
/// Components consisting solely of type synonyms that reference each other
/// are rejected; recursive data components are allowed.
pub fn group_type_decls(decls: Vec<TypeDecl>, module: &str) -> Result<Vec<DeclGroup<TypeDecl>>> {
    let names: Vec<QualName> = decls
        .iter()
        .map(|decl| QualName::qualified(module, decl.ident().name.clone()))
        .collect();
    let index_of: IndexMap<&QualName, usize> =
        names.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(decls.len());
    for decl in &decls {
        let mut refs = Vec::new();
        match decl {
            TypeDecl::Data { constructors, .. } => {
                for con in constructors {
                    for field in &con.fields {
                        collect_type_cons(field, &mut refs);
                    }
                }
            }
            TypeDecl::Synonym { body, .. } => collect_type_cons(body, &mut refs),
        }
        adjacency.push(to_edges(&refs, &index_of));
    }

    let groups = condense(decls, &adjacency);

    for group in &groups {
        if let DeclGroup::Recursive(members) = group {
            let all_synonyms = members
                .iter()
                .all(|decl| matches!(decl, TypeDecl::Synonym { .. }));
            if all_synonyms {
                let ident = members[0].ident();
                return Err(err_type_at!(
                    ident.span,
                    "mutually recursive type synonym `{}`",
                    ident.name
                ));
            }
        }
    }

    debug!("type declarations form {} dependency groups", groups.len());
    Ok(groups)
}

/// Group the function declarations of a module into dependency order.
pub fn group_func_decls(decls: Vec<FuncDecl>, module: &str) -> Vec<DeclGroup<FuncDecl>> {
    let names: Vec<QualName> = decls
        .iter()
        .map(|decl| QualName::qualified(module, decl.ident.name.clone()))
        .collect();
    let index_of: IndexMap<&QualName, usize> =
        names.iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(decls.len());
    for decl in &decls {
        let mut refs = Vec::new();
        collect_var_refs(&decl.body, &mut refs);
        adjacency.push(to_edges(&refs, &index_of));
    }

    let groups = condense(decls, &adjacency);
    debug!("function declarations form {} dependency groups", groups.len());
    groups
}

/// Translate referenced names to vertex indices, dropping references to
/// other modules and deduplicating while keeping first-occurrence order.
fn to_edges(refs: &[QualName], index_of: &IndexMap<&QualName, usize>) -> Vec<usize> {
    let mut edges = Vec::new();
    for name in refs {
        if let Some(&target) = index_of.get(name) {
            if !edges.contains(&target) {
                edges.push(target);
            }
        }
    }
    edges
}

fn collect_type_cons(ty: &Type, out: &mut Vec<QualName>) {
    match ty {
        Type::Var(_) => {}
        Type::Con(name) => out.push(name.clone()),
        Type::App(f, a) => {
            collect_type_cons(f, out);
            collect_type_cons(a, out);
        }
        Type::Func(a, r) => {
            collect_type_cons(a, out);
            collect_type_cons(r, out);
        }
    }
}

fn collect_var_refs(expr: &Expr, out: &mut Vec<QualName>) {
    match &expr.kind {
        ExprKind::Var(name) => out.push(name.clone()),
        ExprKind::Con(_) | ExprKind::IntLiteral(_) | ExprKind::Undefined | ExprKind::ErrorCall(_) => {}
        ExprKind::App(f, a) => {
            collect_var_refs(f, out);
            collect_var_refs(a, out);
        }
        ExprKind::If(c, t, e) => {
            collect_var_refs(c, out);
            collect_var_refs(t, out);
            collect_var_refs(e, out);
        }
        ExprKind::Case(scrutinee, alts) => {
            collect_var_refs(scrutinee, out);
            for alt in alts {
                collect_var_refs(&alt.rhs, out);
            }
        }
        ExprKind::Lambda(_, body) => collect_var_refs(body, out),
    }
}

/// Order declarations by strongly connected components and label each
/// component. Vertices inside a component keep their source order.
fn condense<T>(decls: Vec<T>, adjacency: &[Vec<usize>]) -> Vec<DeclGroup<T>> {
    let components = strongly_connected_components(adjacency);

    let mut slots: Vec<Option<T>> = decls.into_iter().map(Some).collect();
    let mut groups = Vec::with_capacity(components.len());
    for mut component in components {
        component.sort_unstable();
        if component.len() == 1 {
            let v = component[0];
            let decl = slots[v].take().expect("declaration taken twice");
            if adjacency[v].contains(&v) {
                groups.push(DeclGroup::Recursive(vec![decl]));
            } else {
                groups.push(DeclGroup::NonRecursive(decl));
            }
        } else {
            let members = component
                .into_iter()
                .map(|v| slots[v].take().expect("declaration taken twice"))
                .collect();
            groups.push(DeclGroup::Recursive(members));
        }
    }
    groups
}

/// Iterative Tarjan. Components come out in reverse topological order of
/// the condensation: every component precedes the components that depend
/// on it, and the traversal visits vertices in source order, which makes
/// the output deterministic.
fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut index: Vec<Option<u32>> = vec![None; n];
    let mut lowlink: Vec<u32> = vec![0; n];
    let mut on_stack: Vec<bool> = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index: u32 = 0;
    let mut components: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }

        // Explicit DFS frames: (vertex, next adjacency position).
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = Some(next_index);
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        loop {
            let (v, next_edge) = match frames.last_mut() {
                Some(frame) => {
                    let v = frame.0;
                    if frame.1 < adjacency[v].len() {
                        let w = adjacency[v][frame.1];
                        frame.1 += 1;
                        (v, Some(w))
                    } else {
                        (v, None)
                    }
                }
                None => break,
            };

            match next_edge {
                Some(w) => match index[w] {
                    None => {
                        index[w] = Some(next_index);
                        lowlink[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        frames.push((w, 0));
                    }
                    Some(w_index) => {
                        if on_stack[w] {
                            lowlink[v] = lowlink[v].min(w_index);
                        }
                    }
                },
                None => {
                    frames.pop();
                    if let Some(&(parent, _)) = frames.last() {
                        lowlink[parent] = lowlink[parent].min(lowlink[v]);
                    }
                    if Some(lowlink[v]) == index[v] {
                        let mut component = Vec::new();
                        loop {
                            let w = stack.pop().expect("Tarjan stack underflow");
                            on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        components.push(component);
                    }
                }
            }
        }
    }

    components
}
