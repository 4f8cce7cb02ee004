use crate::ast::{Name, QualName};
use crate::environment::{Entry, Environment, Namespace};

#[test]
fn test_rename_plain_identifier() {
    let mut env = Environment::new();
    assert_eq!(env.rename_ident(&Name::ident("length")), "length");
}

#[test]
fn test_rename_avoids_gallina_keywords() {
    let mut env = Environment::new();
    assert_eq!(env.rename_ident(&Name::ident("fix")), "fix0");
    assert_eq!(env.rename_ident(&Name::ident("match")), "match0");
    assert_eq!(env.rename_ident(&Name::ident("Type")), "Type0");
}

#[test]
fn test_rename_avoids_reserved_encoding_names() {
    let mut env = Environment::new();
    // `Shape`, `Pos` and `pure` appear in every emitted sentence.
    assert_eq!(env.rename_ident(&Name::ident("Shape")), "Shape0");
    assert_eq!(env.rename_ident(&Name::ident("pure")), "pure0");
}

#[test]
fn test_rename_disambiguates_collisions() {
    let mut env = Environment::new();
    assert_eq!(env.rename_ident(&Name::ident("foo")), "foo");
    assert_eq!(env.rename_ident(&Name::ident("foo")), "foo0");
    assert_eq!(env.rename_ident(&Name::ident("foo")), "foo1");
}

#[test]
fn test_rename_sanitizes_symbols() {
    let mut env = Environment::new();
    assert_eq!(env.rename_ident(&Name::symbol("+")), "op_plus");
    assert_eq!(env.rename_ident(&Name::symbol("<=")), "op_lt_eq");
    assert_eq!(env.rename_ident(&Name::symbol("<+>")), "op_lt_plus_gt");
}

#[test]
fn test_constructor_idents_raw_and_smart_differ() {
    let mut env = Environment::new();
    let (raw, smart) = env.rename_con_idents(&Name::ident("Leaf"));
    assert_eq!(smart, "Leaf");
    assert_eq!(raw, "leaf");

    // A symbolic constructor lowercases to itself, so the raw form gets a
    // suffix instead.
    let (raw, smart) = env.rename_con_idents(&Name::symbol(":+:"));
    assert_eq!(smart, "con_colon_plus_colon");
    assert_eq!(raw, "con_colon_plus_colon0");
}

#[test]
fn test_renaming_is_injective() {
    let mut env = Environment::new();
    let names = [
        Name::ident("foo"),
        Name::ident("foo"),
        Name::ident("foo'"),
        Name::ident("fix"),
        Name::ident("fix0"),
        Name::symbol("+"),
        Name::symbol("+"),
    ];
    let mut assigned = Vec::new();
    for name in &names {
        assigned.push(env.rename_ident(name));
    }
    let mut deduped = assigned.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), assigned.len(), "assigned: {:?}", assigned);
}

#[test]
fn test_fresh_idents_are_deterministic() {
    let mut env1 = Environment::new();
    let mut env2 = Environment::new();
    let a: Vec<String> = (0..3).map(|_| env1.fresh_ident("x")).collect();
    let b: Vec<String> = (0..3).map(|_| env2.fresh_ident("x")).collect();
    assert_eq!(a, b);
    assert_eq!(a, vec!["x_0", "x_1", "x_2"]);
}

#[test]
fn test_fresh_ident_skips_taken_names() {
    let mut env = Environment::new();
    assert_eq!(env.rename_ident(&Name::ident("x_0")), "x_0");
    assert_eq!(env.fresh_ident("x"), "x_1");
}

#[test]
fn test_qualified_and_unqualified_lookup() {
    let mut env = Environment::new();
    let original = QualName::qualified("Queue", Name::ident("enqueue"));
    env.define(
        Namespace::Value,
        &original,
        Entry::Func {
            arity: 2,
            type_args: vec!["a".to_string()],
            arg_types: vec![None, None],
            return_type: None,
            partial: false,
            ident: "enqueue".to_string(),
        },
    );

    assert!(env.lookup(Namespace::Value, &original).is_some());
    let unqualified = QualName::unqualified(Name::ident("enqueue"));
    assert!(env.lookup(Namespace::Value, &unqualified).is_some());
    // The two namespaces are independent.
    assert!(env.lookup(Namespace::Type, &original).is_none());
}

#[test]
fn test_scoped_entries_pop_on_exit() {
    let mut env = Environment::new();
    env.with_scope(|env| {
        env.define_local_var(
            "x",
            Entry::Var {
                pure: false,
                ident: "x".to_string(),
            },
        );
        let key = QualName::unqualified(Name::ident("x"));
        assert!(env.lookup(Namespace::Value, &key).is_some());
    });
    let key = QualName::unqualified(Name::ident("x"));
    assert!(env.lookup(Namespace::Value, &key).is_none());
}

#[test]
fn test_dec_arg_side_table() {
    let mut env = Environment::new();
    let name = QualName::qualified("Main", Name::ident("length_0"));
    assert_eq!(env.dec_arg_index(&name), None);
    env.set_dec_arg_index(name.clone(), 0);
    assert_eq!(env.dec_arg_index(&name), Some(0));
    env.clear_dec_arg_index(&name);
    assert_eq!(env.dec_arg_index(&name), None);
}
