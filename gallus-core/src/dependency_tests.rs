use crate::ast::{FuncDecl, Module, NodeCounter, TypeDecl};
use crate::dependency::{self, DeclGroup};
use crate::{default_environment, Compiler, Reporter};

fn resolved(source: &str) -> Module {
    let mut env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let mut nc = NodeCounter::new();
    let parsed = Compiler::parse(source, &mut nc).expect("parse");
    parsed.resolve(&mut env, &mut reporter).expect("resolve").module
}

fn func_groups(source: &str) -> Vec<DeclGroup<FuncDecl>> {
    let module = resolved(source);
    dependency::group_func_decls(module.func_decls, module.name.as_deref().unwrap_or("Main"))
}

fn type_groups(source: &str) -> crate::error::Result<Vec<DeclGroup<TypeDecl>>> {
    let module = resolved(source);
    dependency::group_type_decls(module.type_decls, module.name.as_deref().unwrap_or("Main"))
}

fn group_names(groups: &[DeclGroup<FuncDecl>]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|group| {
            group
                .members()
                .iter()
                .map(|decl| decl.ident.name.as_str().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn test_single_function_is_non_recursive() {
    let groups = func_groups("id :: a -> a\nid x = x\n");
    assert_eq!(groups.len(), 1);
    assert!(matches!(groups[0], DeclGroup::NonRecursive(_)));
}

#[test]
fn test_self_call_makes_recursive_singleton() {
    let groups = func_groups("loop :: a -> a\nloop x = loop x\n");
    assert_eq!(groups.len(), 1);
    match &groups[0] {
        DeclGroup::Recursive(members) => assert_eq!(members.len(), 1),
        other => panic!("expected recursive group, got {:?}", other),
    }
}

#[test]
fn test_mutual_recursion_is_one_component_in_source_order() {
    let source = "\
data Nat = Zero | Succ Nat
even :: Nat -> Bool
even n = case n of { Zero -> True ; Succ m -> odd m }
odd :: Nat -> Bool
odd n = case n of { Zero -> False ; Succ m -> even m }
";
    let groups = func_groups(source);
    assert_eq!(group_names(&groups), vec![vec!["even", "odd"]]);
    assert!(matches!(groups[0], DeclGroup::Recursive(_)));
}

#[test]
fn test_dependencies_come_before_dependents() {
    // `caller` uses `helper`, so `helper`'s component is emitted first even
    // though `caller` is declared first.
    let source = "\
caller :: Integer -> Integer
caller x = helper x
helper :: Integer -> Integer
helper x = x
";
    let groups = func_groups(source);
    assert_eq!(group_names(&groups), vec![vec!["helper"], vec!["caller"]]);
}

#[test]
fn test_independent_functions_keep_source_order() {
    let source = "\
f :: Integer -> Integer
f x = x
g :: Integer -> Integer
g x = x
";
    let groups = func_groups(source);
    assert_eq!(group_names(&groups), vec![vec!["f"], vec!["g"]]);
}

#[test]
fn test_reverse_topological_order_over_condensation() {
    // f -> g -> h with f also calling h directly: expect h, g, f.
    let source = "\
f :: Integer -> Integer
f x = g (h x)
g :: Integer -> Integer
g x = h x
h :: Integer -> Integer
h x = x
";
    let groups = func_groups(source);
    let names = group_names(&groups);
    let position = |needle: &str| {
        names
            .iter()
            .position(|group| group.iter().any(|name| name == needle))
            .expect("declaration present")
    };
    // Every edge u -> v requires v's component before u's.
    assert!(position("h") < position("g"));
    assert!(position("g") < position("f"));
    assert!(position("h") < position("f"));
}

#[test]
fn test_recursive_data_is_allowed() {
    let groups = type_groups("data Nat = Zero | Succ Nat\n").expect("grouping should succeed");
    assert_eq!(groups.len(), 1);
    assert!(matches!(groups[0], DeclGroup::Recursive(_)));
}

#[test]
fn test_mixed_data_synonym_component_is_allowed() {
    let source = "\
type Forest a = [Tree a]
data Tree a = Leaf a | Branch (Forest a)
";
    let groups = type_groups(source).expect("grouping should succeed");
    assert_eq!(groups.len(), 1);
    match &groups[0] {
        DeclGroup::Recursive(members) => assert_eq!(members.len(), 2),
        other => panic!("expected recursive group, got {:?}", other),
    }
}

#[test]
fn test_self_recursive_synonym_is_rejected() {
    let error = type_groups("type Rose a = [Rose a]\n").expect_err("cycle should be rejected");
    assert!(
        error.to_string().contains("recursive type synonym"),
        "got: {}",
        error
    );
}

#[test]
fn test_mutually_recursive_synonyms_are_rejected() {
    let source = "\
type A = B
type B = A
";
    let error = type_groups(source).expect_err("cycle should be rejected");
    assert!(
        error.to_string().contains("recursive type synonym"),
        "got: {}",
        error
    );
}

#[test]
fn test_synonym_before_data_orders_by_dependency() {
    let source = "\
type Names = [Label]
data Label = MkLabel Integer
";
    let groups = type_groups(source).expect("grouping should succeed");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].members()[0].ident().name.as_str(), "Label");
    assert_eq!(groups[1].members()[0].ident().name.as_str(), "Names");
}
