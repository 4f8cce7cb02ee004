//! End-to-end pipeline tests: source text in, Gallina text out.

use crate::coq::{Sentence, Term};
use crate::error::CompilerError;
use crate::{compile_source, default_environment, Converted, Environment, Reporter};

fn compile(source: &str) -> Converted {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    compile_source(source, &env, &mut reporter).expect("compilation should succeed")
}

fn compile_err(source: &str) -> CompilerError {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    compile_source(source, &env, &mut reporter).expect_err("compilation should fail")
}

const MIXED_MODULE: &str = "\
module Showcase where
type Forest a = [Tree a]
data Tree a = Leaf a | Branch (Forest a)
size :: Tree a -> Integer
size t = case t of { Leaf x -> 1 ; Branch ts -> 1 + sizes ts }
sizes :: [Tree a] -> Integer
sizes ts = case ts of { [] -> 0 ; t : ts' -> size t + sizes ts' }
";

#[test]
fn test_output_is_deterministic() {
    let first = compile(MIXED_MODULE).render();
    let second = compile(MIXED_MODULE).render();
    assert_eq!(first, second);
}

#[test]
fn test_dependency_order_in_emission() {
    // size and sizes are mutually recursive with Tree/Forest above them;
    // types come first, and within the functions the shared Fixpoint block
    // precedes both drivers.
    let text = compile(MIXED_MODULE).render();
    let inductive = text.find("Inductive Tree").expect("inductive emitted");
    let fixpoint = text.find("Fixpoint").expect("fixpoint emitted");
    let size_driver = text.find("Definition size ").expect("size driver emitted");
    assert!(inductive < fixpoint);
    assert!(fixpoint < size_driver);
}

#[test]
fn test_binder_count_matches_arity_formula() {
    // #binders = #generic-args + (partial ? 1 : 0) + #type-args + arity
    let source = "\
head :: [a] -> a
head xs = case xs of { x : _ -> x ; [] -> undefined }
zip2 :: [a] -> [b] -> [(a, b)]
zip2 xs ys = []
";
    let converted = compile(source);
    for sentence in &converted.sentences {
        if let Sentence::Definition(def) = sentence {
            let count = def
                .binders
                .iter()
                .map(|binder| binder.names.len())
                .sum::<usize>();
            match def.name.as_str() {
                "head" => assert_eq!(count, 2 + 1 + 1 + 1, "head binders"),
                "zip2" => assert_eq!(count, 2 + 0 + 2 + 2, "zip2 binders"),
                _ => {}
            }
        }
    }
}

#[test]
fn test_pure_variable_invariant() {
    // Inside the generated Fixpoint the decreasing binder is the only pure
    // variable: the match scrutinizes it directly, while the driver has to
    // bind-open its (monadic) argument first.
    let converted = compile(
        "length :: [a] -> Integer\nlength xs = case xs of { [] -> 0 ; _ : xs' -> 1 + length xs' }\n",
    );
    let mut saw_fixpoint = false;
    for sentence in &converted.sentences {
        if let Sentence::Fixpoint(bodies) = sentence {
            saw_fixpoint = true;
            for body in bodies {
                match &body.body {
                    Term::Match(scrutinee, _) => {
                        assert_eq!(**scrutinee, Term::qualid(&body.struct_arg));
                    }
                    other => panic!("expected top-level match, got {:?}", other),
                }
            }
        }
    }
    assert!(saw_fixpoint);
}

#[test]
fn test_missing_type_signature_is_fatal() {
    let error = compile_err("f x = x\n");
    assert!(
        error.to_string().contains("missing type signature"),
        "got: {}",
        error
    );
}

#[test]
fn test_unknown_value_is_fatal() {
    let error = compile_err("f :: a -> a\nf x = g x\n");
    assert!(error.to_string().contains("unknown value `g`"), "got: {}", error);
}

#[test]
fn test_unknown_type_constructor_is_fatal() {
    let error = compile_err("f :: Missing -> Missing\nf x = x\n");
    assert!(
        error.to_string().contains("unknown type constructor `Missing`"),
        "got: {}",
        error
    );
}

#[test]
fn test_duplicate_binding_is_fatal() {
    let error = compile_err("f :: a -> a\nf x = x\nf y = y\n");
    assert!(error.to_string().contains("duplicate"), "got: {}", error);
}

#[test]
fn test_unknown_module_is_fatal() {
    let error = compile_err("import Nowhere\nf :: a -> a\nf x = x\n");
    assert!(error.to_string().contains("unknown module"), "got: {}", error);
}

#[test]
fn test_unused_signature_is_a_warning_not_an_error() {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let source = "ghost :: a -> a\nid2 :: a -> a\nid2 x = x\n";
    compile_source(source, &env, &mut reporter).expect("warnings are not fatal");
    assert!(!reporter.is_fatal());
    assert_eq!(reporter.diagnostics().len(), 1);
    assert!(reporter.diagnostics()[0].message.contains("ghost"));
}

const QUEUE_MODULE: &str = "\
module Queue where
enqueue :: a -> [a] -> [a]
enqueue x q = x : q
emptyQueue :: [a]
emptyQueue = []
";

fn environment_with_queue() -> Environment {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let converted = compile_source(QUEUE_MODULE, &env, &mut reporter).expect("Queue compiles");
    let mut env = env;
    env.add_interface(converted.interface);
    env
}

#[test]
fn test_interface_round_trips_through_json() {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let converted = compile_source(QUEUE_MODULE, &env, &mut reporter).expect("Queue compiles");

    let json = converted.interface.to_json().expect("serializes");
    let reloaded = crate::interface::ModuleInterface::from_json(&json).expect("parses");
    assert_eq!(reloaded.name, "Queue");
    assert_eq!(reloaded.functions.len(), 2);
    let enqueue = &reloaded.functions[0];
    assert_eq!(enqueue.haskell_name, "enqueue");
    assert_eq!(enqueue.haskell_type, "a -> [a] -> [a]");
    assert_eq!(enqueue.arity, 2);
    assert!(!enqueue.partial);
}

#[test]
fn test_import_resolves_qualified_and_unqualified_names() {
    let env = environment_with_queue();
    let mut reporter = Reporter::new();
    let source = "\
module Front where
import Queue
front :: [Integer] -> [Integer]
front q = Queue.enqueue 1 q
front2 :: [Integer] -> [Integer]
front2 q = enqueue 2 q
";
    let converted = compile_source(source, &env, &mut reporter).expect("Front compiles");
    let text = converted.render();
    assert!(text.contains("Require Import Queue."), "got:\n{}", text);
    assert!(text.contains("enqueue Shape Pos (pure 1%Z) q"), "got:\n{}", text);
    assert!(text.contains("enqueue Shape Pos (pure 2%Z) q"), "got:\n{}", text);
}

#[test]
fn test_import_is_required_for_qualified_access() {
    let env = environment_with_queue();
    let mut reporter = Reporter::new();
    let source = "\
module Front where
front :: [Integer] -> [Integer]
front q = Queue.enqueue 1 q
";
    let error = compile_source(source, &env, &mut reporter).expect_err("must fail");
    assert!(error.to_string().contains("not imported"), "got: {}", error);
}

#[test]
fn test_ambiguous_import_is_fatal() {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let module_a = "module A where\nshared :: Integer -> Integer\nshared x = x\n";
    let module_b = "module B where\nshared :: Integer -> Integer\nshared x = x\n";
    let converted_a = compile_source(module_a, &env, &mut reporter).expect("A compiles");
    let converted_b = compile_source(module_b, &env, &mut reporter).expect("B compiles");

    let mut env = env;
    env.add_interface(converted_a.interface);
    env.add_interface(converted_b.interface);

    let source = "\
module C where
import A
import B
use :: Integer -> Integer
use x = shared x
";
    let error = compile_source(source, &env, &mut reporter).expect_err("must fail");
    assert!(error.to_string().contains("ambiguous"), "got: {}", error);
}

#[test]
fn test_interfaces_do_not_leak_helpers() {
    let env = default_environment().expect("default environment");
    let mut reporter = Reporter::new();
    let source = "\
module Len where
len :: [a] -> Integer
len xs = case xs of { [] -> 0 ; _ : xs' -> 1 + len xs' }
";
    let converted = compile_source(source, &env, &mut reporter).expect("Len compiles");
    let names: Vec<&str> = converted
        .interface
        .functions
        .iter()
        .map(|f| f.haskell_name.as_str())
        .collect();
    assert_eq!(names, vec!["len"]);
}

#[test]
fn test_module_header_names_the_gallina_module() {
    let converted = compile(QUEUE_MODULE);
    let text = converted.render();
    assert!(text.contains("Module Queue.\n"), "got:\n{}", text);
    assert!(text.trim_end().ends_with("End Queue."), "got:\n{}", text);
}
