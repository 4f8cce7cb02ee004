use crate::coq::{DefinitionSentence, FixBody, Sentence, Term};
use crate::{compile_source, default_environment, Converted, Reporter};

fn compile(source: &str) -> Converted {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    compile_source(source, &env, &mut reporter).expect("compilation should succeed")
}

fn fixpoint_bodies(converted: &Converted) -> &[FixBody] {
    for sentence in &converted.sentences {
        if let Sentence::Fixpoint(bodies) = sentence {
            return bodies;
        }
    }
    panic!("no Fixpoint sentence emitted");
}

fn definition<'a>(converted: &'a Converted, name: &str) -> &'a DefinitionSentence {
    for sentence in &converted.sentences {
        if let Sentence::Definition(def) = sentence {
            if def.name == name {
                return def;
            }
        }
    }
    panic!("no Definition named {}", name);
}

const LENGTH: &str = "\
length :: [a] -> Integer
length xs = case xs of { [] -> 0 ; _ : xs' -> 1 + length xs' }
";

#[test]
fn test_single_recursive_function_splits_into_helper_and_driver() {
    let converted = compile(LENGTH);

    let bodies = fixpoint_bodies(&converted);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].name, "length_0");
    assert_eq!(bodies[0].struct_arg, "xs");

    // The driver is an ordinary definition that only forwards to the
    // helper, unwrapping the decreasing argument.
    let driver = definition(&converted, "length");
    assert!(
        matches!(driver.body, Term::Bind(_, _)),
        "driver body should bind-open its argument, got {:?}",
        driver.body
    );
}

#[test]
fn test_helper_matches_decreasing_argument_at_top_level() {
    let converted = compile(LENGTH);
    let bodies = fixpoint_bodies(&converted);

    // The decreasing binder is pure, so the scrutinee is the variable
    // itself with no bind around the match.
    match &bodies[0].body {
        Term::Match(scrutinee, arms) => {
            assert_eq!(**scrutinee, Term::qualid("xs"));
            assert_eq!(arms.len(), 2);
        }
        other => panic!("helper body should be a top-level match, got {:?}", other),
    }
}

#[test]
fn test_helper_calls_helper_after_inlining() {
    let converted = compile(LENGTH);
    let text = converted.render();
    // The recursive call goes through the helper, with its decreasing
    // argument unwrapped first.
    assert!(
        text.contains("xs' >>= (fun xs'_0 => length_0 Shape Pos xs'_0)"),
        "got:\n{}",
        text
    );
}

#[test]
fn test_mutual_recursion_emits_one_fixpoint_block() {
    let source = "\
data Nat = Zero | Succ Nat
even :: Nat -> Bool
even n = case n of { Zero -> True ; Succ m -> odd m }
odd :: Nat -> Bool
odd n = case n of { Zero -> False ; Succ m -> even m }
";
    let converted = compile(source);
    let bodies = fixpoint_bodies(&converted);
    let names: Vec<&str> = bodies.iter().map(|body| body.name.as_str()).collect();
    assert_eq!(names, vec!["even_0", "odd_0"]);
    assert!(bodies.iter().all(|body| body.struct_arg == "n"));

    // One driver per member.
    definition(&converted, "even");
    definition(&converted, "odd");

    // After single-level inlining the helpers call each other directly.
    let text = converted.render();
    assert!(text.contains("odd_0 Shape Pos"), "got:\n{}", text);
    assert!(text.contains("even_0 Shape Pos"), "got:\n{}", text);
}

#[test]
fn test_two_match_sites_produce_two_helpers() {
    let source = "\
two :: [a] -> Integer
two xs = if True then case xs of { [] -> 0 ; _ : r -> two r } else case xs of { [] -> 1 ; _ : r -> two r }
";
    let converted = compile(source);
    let bodies = fixpoint_bodies(&converted);
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0].name, "two_0");
    assert_eq!(bodies[1].name, "two_1");

    // The driver keeps the conditional and calls one helper per branch.
    let driver = definition(&converted, "two");
    let text = converted.render();
    assert!(text.contains("two_0 Shape Pos"), "got:\n{}", text);
    assert!(text.contains("two_1 Shape Pos"), "got:\n{}", text);
    assert!(
        !matches!(driver.body, Term::Match(_, _)),
        "driver must not match on the decreasing argument"
    );
}

#[test]
fn test_helper_captures_free_variables_in_occurrence_order() {
    let source = "\
addAll :: Integer -> [Integer] -> Integer
addAll n xs = case xs of { [] -> n ; y : ys -> addAll n ys }
";
    let converted = compile(source);
    let bodies = fixpoint_bodies(&converted);
    assert_eq!(bodies.len(), 1);

    // Captured closure: the scrutinee comes first, then the other free
    // variables in first-occurrence order.
    let names: Vec<&str> = bodies[0]
        .binders
        .iter()
        .flat_map(|binder| binder.names.iter().map(|name| name.as_str()))
        .collect();
    assert_eq!(names, vec!["Shape", "Pos", "xs", "n"]);
    assert_eq!(bodies[0].struct_arg, "xs");
}

#[test]
fn test_non_recursive_function_stays_a_single_definition() {
    let converted = compile("id :: a -> a\nid x = x\n");
    for sentence in &converted.sentences {
        assert!(
            !matches!(sentence, Sentence::Fixpoint(_)),
            "no Fixpoint expected for a non-recursive function"
        );
    }
    definition(&converted, "id");
}
