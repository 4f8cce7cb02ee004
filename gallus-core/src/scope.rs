use indexmap::IndexMap;
use std::hash::Hash;

/// A single scope containing bindings. Uses IndexMap so iteration follows
/// insertion order, which keeps everything derived from a scope walk
/// deterministic.
#[derive(Debug, Clone)]
pub struct Scope<K, V> {
    bindings: IndexMap<K, V>,
}

impl<K: Eq + Hash, V> Default for Scope<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> Scope<K, V> {
    pub fn new() -> Self {
        Scope {
            bindings: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.bindings.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.bindings.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.bindings.iter()
    }
}

/// A stack-based scope manager that tracks nested scopes
#[derive(Debug, Clone)]
pub struct ScopeStack<K, V> {
    scopes: Vec<Scope<K, V>>,
}

impl<K: Eq + Hash, V> Default for ScopeStack<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> ScopeStack<K, V> {
    /// Create a new scope stack with a global scope
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::new()],
        }
    }

    /// Push a new scope onto the stack
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the current scope from the stack.
    /// Returns None if trying to pop the global scope.
    pub fn pop_scope(&mut self) -> Option<Scope<K, V>> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Insert a binding in the current (innermost) scope
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(current_scope) = self.scopes.last_mut() {
            current_scope.insert(key, value);
        }
    }

    /// Look up a binding, searching from innermost to outermost scope.
    pub fn lookup(&self, key: &K) -> Option<&V> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(key) {
                return Some(value);
            }
        }
        None
    }

    /// Check if a key is defined in the current scope (not outer scopes)
    pub fn is_defined_in_current_scope(&self, key: &K) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(key))
            .unwrap_or(false)
    }

    /// Check if a key is defined in any scope
    pub fn is_defined(&self, key: &K) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains_key(key))
    }

    /// Get the current scope depth (0 = global scope)
    pub fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    /// Iterate over the bindings of the global (outermost) scope in
    /// insertion order.
    pub fn global_bindings(&self) -> impl Iterator<Item = (&K, &V)> {
        self.scopes.first().into_iter().flat_map(|scope| scope.iter())
    }
}
