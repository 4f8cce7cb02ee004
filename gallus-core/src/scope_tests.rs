use crate::scope::ScopeStack;

#[test]
fn test_basic_scope_operations() {
    let mut scope_stack: ScopeStack<String, i32> = ScopeStack::new();

    // Insert in global scope
    scope_stack.insert("x".to_string(), 1);
    assert_eq!(scope_stack.lookup(&"x".to_string()), Some(&1));

    // Push new scope and shadow variable
    scope_stack.push_scope();
    scope_stack.insert("x".to_string(), 2);
    scope_stack.insert("y".to_string(), 3);

    assert_eq!(scope_stack.lookup(&"x".to_string()), Some(&2)); // Shadows outer x
    assert_eq!(scope_stack.lookup(&"y".to_string()), Some(&3));

    // Pop scope
    scope_stack.pop_scope();
    assert_eq!(scope_stack.lookup(&"x".to_string()), Some(&1)); // Back to outer x
    assert!(scope_stack.lookup(&"y".to_string()).is_none()); // y is gone
}

#[test]
fn test_global_scope_cannot_be_popped() {
    let mut scope_stack: ScopeStack<String, i32> = ScopeStack::new();
    scope_stack.insert("x".to_string(), 1);

    assert!(scope_stack.pop_scope().is_none());
    assert_eq!(scope_stack.lookup(&"x".to_string()), Some(&1));
}

#[test]
fn test_current_scope_check() {
    let mut scope_stack: ScopeStack<String, i32> = ScopeStack::new();
    scope_stack.insert("x".to_string(), 1);
    scope_stack.push_scope();

    assert!(!scope_stack.is_defined_in_current_scope(&"x".to_string()));
    assert!(scope_stack.is_defined(&"x".to_string()));

    scope_stack.insert("x".to_string(), 2);
    assert!(scope_stack.is_defined_in_current_scope(&"x".to_string()));
}

#[test]
fn test_global_bindings_iteration_order() {
    let mut scope_stack: ScopeStack<String, i32> = ScopeStack::new();
    scope_stack.insert("b".to_string(), 1);
    scope_stack.insert("a".to_string(), 2);
    scope_stack.insert("c".to_string(), 3);

    // Insertion order, not key order
    let keys: Vec<&String> = scope_stack.global_bindings().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
}
