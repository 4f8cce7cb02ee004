use crate::ast::{FuncDecl, NodeCounter};
use crate::dependency::DeclGroup;
use crate::termination;
use crate::{default_environment, Compiler, Reporter};

/// Run the pipeline up to grouping and return the first recursive
/// component's members.
fn recursive_members(source: &str) -> Vec<FuncDecl> {
    let mut env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let mut nc = NodeCounter::new();
    let grouped = Compiler::parse(source, &mut nc)
        .expect("parse")
        .resolve(&mut env, &mut reporter)
        .expect("resolve")
        .group()
        .expect("group");
    for group in grouped.func_groups {
        if let DeclGroup::Recursive(members) = group {
            return members;
        }
    }
    panic!("no recursive component in test source");
}

fn analyze(source: &str) -> crate::error::Result<Vec<usize>> {
    let members = recursive_members(source);
    let refs: Vec<&FuncDecl> = members.iter().collect();
    termination::analyze_group(&refs, "Main")
}

#[test]
fn test_length_decreases_on_first_argument() {
    let source = "\
length :: [a] -> Integer
length xs = case xs of { [] -> 0 ; _ : xs' -> 1 + length xs' }
";
    assert_eq!(analyze(source).expect("length terminates"), vec![0]);
}

#[test]
fn test_decreasing_argument_can_be_later_position() {
    let source = "\
drop2 :: Integer -> [a] -> [a]
drop2 n xs = case xs of { [] -> [] ; _ : xs' -> drop2 n xs' }
";
    assert_eq!(analyze(source).expect("drop2 terminates"), vec![1]);
}

#[test]
fn test_lowest_index_tuple_wins() {
    // Both arguments decrease; index 0 is picked.
    let source = "\
both :: [a] -> [a] -> Integer
both xs ys = case xs of { [] -> 0 ; _ : xs' -> case ys of { [] -> 0 ; _ : ys' -> both xs' ys' } }
";
    assert_eq!(analyze(source).expect("both terminates"), vec![0]);
}

#[test]
fn test_mutual_recursion() {
    let source = "\
data Nat = Zero | Succ Nat
even :: Nat -> Bool
even n = case n of { Zero -> True ; Succ m -> odd m }
odd :: Nat -> Bool
odd n = case n of { Zero -> False ; Succ m -> even m }
";
    assert_eq!(analyze(source).expect("even/odd terminate"), vec![0, 0]);
}

#[test]
fn test_non_decreasing_call_is_rejected() {
    // The recursive call passes the original argument, not the tail.
    let source = "\
bad :: [a] -> Integer
bad xs = case xs of { [] -> 0 ; _ : xs' -> bad xs }
";
    let error = analyze(source).expect_err("bad must be rejected");
    assert!(
        error.to_string().contains("decreasing argument"),
        "got: {}",
        error
    );
}

#[test]
fn test_direct_self_call_is_rejected() {
    let source = "\
spin :: a -> a
spin x = spin x
";
    assert!(analyze(source).is_err());
}

#[test]
fn test_case_must_scrutinize_the_decreasing_chain() {
    // The tail of `ys` is matched but the call passes `ys` itself, and
    // `xs` is never matched at all; no argument tuple can be justified.
    let source = "\
bad :: [a] -> [a] -> Integer
bad xs ys = case ys of { [] -> 0 ; _ : ys' -> bad xs ys }
";
    assert!(analyze(source).is_err());
}

#[test]
fn test_nested_case_extends_smaller_set() {
    // xs'' is two constructors below xs and still accepted.
    let source = "\
pairs :: [a] -> Integer
pairs xs = case xs of { [] -> 0 ; _ : xs' -> case xs' of { [] -> 0 ; _ : xs'' -> 1 + pairs xs'' } }
";
    assert_eq!(analyze(source).expect("pairs terminates"), vec![0]);
}

#[test]
fn test_shadowed_binder_leaves_smaller_set() {
    // The lambda rebinds xs', so the inner call cannot be justified.
    let source = "\
shadow :: [a] -> Integer
shadow xs = case xs of { [] -> 0 ; y : xs' -> (\\xs' -> shadow xs') 1 }
";
    assert!(analyze(source).is_err());
}

#[test]
fn test_member_used_as_plain_value_is_rejected() {
    // A bare reference to the component cannot be checked structurally.
    let source = "\
hof :: (Integer -> Integer) -> Integer
hof f = 0
weird :: Integer -> Integer
weird n = hof weird
";
    assert!(analyze(source).is_err());
}
