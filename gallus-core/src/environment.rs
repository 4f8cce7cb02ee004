//! The compilation environment: scoped symbol tables for the type and value
//! namespaces, the renamer that assigns Gallina target identifiers, and the
//! side tables for decreasing-argument indices and loaded module interfaces.
//!
//! Entries for top-level declarations are registered before any body is
//! converted so mutual references resolve; they are immutable afterwards.
//! Local entries (type variables, lambda- and pattern-bound variables) are
//! pushed on entry to a binding construct and popped on exit.

use crate::ast::{Name, QualName, Type};
use crate::interface::ModuleInterface;
use crate::scope::ScopeStack;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// The two independent namespaces of the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Type,
    Value,
}

/// A named entity known to the compiler.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A data type constructor
    Data { arity: usize, ident: String },
    /// A type synonym with its right-hand side
    TypeSyn {
        arity: usize,
        type_args: Vec<String>,
        body: Type,
        ident: String,
    },
    /// A locally bound type variable
    TypeVar { ident: String },
    /// A data constructor together with its smart constructor
    Con {
        arity: usize,
        arg_types: Vec<Type>,
        return_type: Type,
        ident: String,
        smart_ident: String,
    },
    /// A top-level function. Generated recursion helpers may lack types for
    /// some captured arguments, hence the options.
    Func {
        arity: usize,
        type_args: Vec<String>,
        arg_types: Vec<Option<Type>>,
        return_type: Option<Type>,
        partial: bool,
        ident: String,
    },
    /// A locally bound value variable. `pure` marks the structurally
    /// decreasing binder of a Fixpoint, which is never lifted into the
    /// free monad.
    Var { pure: bool, ident: String },
}

impl Entry {
    /// The Gallina identifier this entry is emitted under. For data
    /// constructors this is the raw constructor; see [`Entry::smart_ident`].
    pub fn ident(&self) -> &str {
        match self {
            Entry::Data { ident, .. }
            | Entry::TypeSyn { ident, .. }
            | Entry::TypeVar { ident }
            | Entry::Con { ident, .. }
            | Entry::Func { ident, .. }
            | Entry::Var { ident, .. } => ident,
        }
    }

    pub fn smart_ident(&self) -> Option<&str> {
        match self {
            Entry::Con { smart_ident, .. } => Some(smart_ident),
            _ => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Entry::Func { partial: true, .. })
    }
}

/// Keywords of the Vernacular/Gallina surface that can never be used as a
/// generated identifier.
const GALLINA_KEYWORDS: &[&str] = &[
    "as", "at", "cofix", "else", "end", "exists", "fix", "for", "forall", "fun", "if", "IF", "in",
    "let", "match", "mod", "Prop", "return", "Set", "then", "Type", "using", "where", "with",
];

/// Identifiers the free-monad encoding itself occupies in every emitted
/// sentence.
const RESERVED_IDENTS: &[&str] = &["Shape", "Pos", "P", "Free", "Partial", "pure", "bind"];

fn symbol_char_name(c: char) -> &'static str {
    match c {
        '+' => "plus",
        '-' => "minus",
        '*' => "star",
        '^' => "caret",
        ':' => "colon",
        '=' => "eq",
        '/' => "slash",
        '<' => "lt",
        '>' => "gt",
        '&' => "and",
        '|' => "or",
        ',' => "comma",
        '.' => "dot",
        '!' => "bang",
        '?' => "quest",
        '@' => "at",
        '#' => "hash",
        '$' => "dollar",
        '%' => "percent",
        '~' => "tilde",
        '\\' => "backslash",
        '(' => "lparen",
        ')' => "rparen",
        '[' => "lbrack",
        ']' => "rbrack",
        _ => "sym",
    }
}

/// Turn a source name into a candidate Gallina identifier. Identifiers pass
/// through with invalid characters dropped; symbols spell out their
/// characters, prefixed `op_` (functions) or `con_` (constructors).
fn sanitize(name: &Name, constructor: bool) -> String {
    match name {
        Name::Ident(s) => {
            let mut out: String = s
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '\'')
                .collect();
            let valid_start = out
                .chars()
                .next()
                .map(|c| c.is_ascii_alphabetic() || c == '_')
                .unwrap_or(false);
            if !valid_start {
                out.insert(0, 'x');
            }
            out
        }
        Name::Symbol(s) => {
            let prefix = if constructor { "con" } else { "op" };
            let parts: Vec<&str> = s.chars().map(symbol_char_name).collect();
            format!("{}_{}", prefix, parts.join("_"))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    type_scope: ScopeStack<QualName, Entry>,
    value_scope: ScopeStack<QualName, Entry>,
    /// Target identifiers occupied by predefined (configured) entries;
    /// shared by every module.
    global_used: HashSet<String>,
    /// Target identifiers assigned to top-level entries of the module
    /// being compiled.
    module_used: HashSet<String>,
    /// Target identifiers assigned in enclosing local scopes; one frame
    /// per open scope, released when the scope pops.
    local_used: Vec<HashSet<String>>,
    /// Per-prefix counters backing [`Environment::fresh_ident`].
    fresh_counters: HashMap<String, u32>,
    /// Decreasing-argument indices recorded by termination analysis.
    dec_arg_indices: HashMap<QualName, usize>,
    /// Interfaces of already-compiled modules, read-only during compilation.
    available_modules: IndexMap<String, ModuleInterface>,
    current_module: String,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            type_scope: ScopeStack::new(),
            value_scope: ScopeStack::new(),
            global_used: HashSet::new(),
            module_used: HashSet::new(),
            local_used: Vec::new(),
            fresh_counters: HashMap::new(),
            dec_arg_indices: HashMap::new(),
            available_modules: IndexMap::new(),
            current_module: String::new(),
        }
    }

    pub fn set_current_module(&mut self, name: &str) {
        self.current_module = name.to_string();
    }

    pub fn current_module(&self) -> &str {
        &self.current_module
    }

    fn scope_mut(&mut self, namespace: Namespace) -> &mut ScopeStack<QualName, Entry> {
        match namespace {
            Namespace::Type => &mut self.type_scope,
            Namespace::Value => &mut self.value_scope,
        }
    }

    fn scope(&self, namespace: Namespace) -> &ScopeStack<QualName, Entry> {
        match namespace {
            Namespace::Type => &self.type_scope,
            Namespace::Value => &self.value_scope,
        }
    }

    /// Register an entry for a top-level name. The entry is stored under
    /// both the qualified and the unqualified form of the name so either
    /// spelling resolves to it.
    pub fn define(&mut self, namespace: Namespace, original: &QualName, entry: Entry) {
        let scope = self.scope_mut(namespace);
        scope.insert(original.clone(), entry.clone());
        if original.is_qualified() {
            scope.insert(original.unqualify(), entry);
        }
    }

    /// Register a local (scoped) value variable under its source name.
    pub fn define_local_var(&mut self, name: &str, entry: Entry) {
        self.value_scope
            .insert(QualName::unqualified(Name::Ident(name.to_string())), entry);
    }

    /// Register a local type variable under its source name.
    pub fn define_type_var(&mut self, name: &str, entry: Entry) {
        self.type_scope
            .insert(QualName::unqualified(Name::Ident(name.to_string())), entry);
    }

    pub fn lookup(&self, namespace: Namespace, name: &QualName) -> Option<&Entry> {
        self.scope(namespace).lookup(name)
    }

    /// Run `f` inside a fresh scope of both namespaces; the scope is popped
    /// on every exit path, including error propagation.
    pub fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Open a fresh scope in both namespaces. Identifiers assigned inside
    /// the scope become available again when it pops.
    pub fn push_scope(&mut self) {
        self.type_scope.push_scope();
        self.value_scope.push_scope();
        self.local_used.push(HashSet::new());
    }

    /// Close the innermost scope of both namespaces.
    pub fn pop_scope(&mut self) {
        self.type_scope.pop_scope();
        self.value_scope.pop_scope();
        self.local_used.pop();
    }

    // ------------------------------------------------------------------
    // Renaming
    // ------------------------------------------------------------------

    fn is_taken(&self, candidate: &str) -> bool {
        GALLINA_KEYWORDS.contains(&candidate)
            || RESERVED_IDENTS.contains(&candidate)
            || self.global_used.contains(candidate)
            || self.module_used.contains(candidate)
            || self.local_used.iter().any(|frame| frame.contains(candidate))
    }

    /// Record an assigned identifier in the innermost open scope, or at
    /// module level when no scope is open.
    fn mark_assigned(&mut self, candidate: String) {
        match self.local_used.last_mut() {
            Some(frame) => {
                frame.insert(candidate);
            }
            None => {
                self.module_used.insert(candidate);
            }
        }
    }

    fn disambiguate(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut suffix = 0u32;
        while self.is_taken(&candidate) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }
        self.mark_assigned(candidate.clone());
        candidate
    }

    /// Pick a fresh target identifier for a source name: sanitized, distinct
    /// from every keyword and every identifier already assigned in this
    /// module, stable across runs for the same registration order.
    pub fn rename_ident(&mut self, name: &Name) -> String {
        self.disambiguate(sanitize(name, false))
    }

    /// Pick the raw and smart target identifiers for a data constructor.
    /// The smart constructor keeps the sanitized source name; the raw
    /// inductive constructor lowercases its initial.
    pub fn rename_con_idents(&mut self, name: &Name) -> (String, String) {
        let smart = self.disambiguate(sanitize(name, true));
        let mut raw_base = smart.clone();
        if let Some(first) = raw_base.get(0..1) {
            let lowered = first.to_ascii_lowercase();
            raw_base.replace_range(0..1, &lowered);
        }
        let raw = self.disambiguate(raw_base);
        (raw, smart)
    }

    /// A generated identifier `{prefix}_{n}`, never colliding with an
    /// existing target identifier. Deterministic per prefix.
    pub fn fresh_ident(&mut self, prefix: &str) -> String {
        loop {
            let counter = self.fresh_counters.entry(prefix.to_string()).or_insert(0);
            let candidate = format!("{}_{}", prefix, counter);
            *counter += 1;
            if !self.is_taken(&candidate) {
                self.mark_assigned(candidate.clone());
                return candidate;
            }
        }
    }

    /// Mark a configured target identifier (from the predefined environment
    /// or an imported interface) as occupied for every module.
    pub fn mark_predefined_ident(&mut self, ident: &str) {
        self.global_used.insert(ident.to_string());
    }

    // ------------------------------------------------------------------
    // Side tables
    // ------------------------------------------------------------------

    pub fn set_dec_arg_index(&mut self, name: QualName, index: usize) {
        self.dec_arg_indices.insert(name, index);
    }

    pub fn dec_arg_index(&self, name: &QualName) -> Option<usize> {
        self.dec_arg_indices.get(name).copied()
    }

    /// Drop a recorded decreasing-argument index. Drivers produced by the
    /// recursion transformation are no longer recursive, so call sites must
    /// not unwrap their arguments.
    pub fn clear_dec_arg_index(&mut self, name: &QualName) {
        self.dec_arg_indices.remove(name);
    }

    pub fn add_interface(&mut self, interface: ModuleInterface) {
        self.available_modules.insert(interface.name.clone(), interface);
    }

    pub fn interface(&self, module_name: &str) -> Option<&ModuleInterface> {
        self.available_modules.get(module_name)
    }

    pub fn has_module(&self, module_name: &str) -> bool {
        self.available_modules.contains_key(module_name)
    }

    /// The qualified top-level entries of the current module, in
    /// registration order. Used to build the module's interface.
    pub fn current_module_entries(
        &self,
        namespace: Namespace,
    ) -> impl Iterator<Item = (&QualName, &Entry)> {
        let module = self.current_module.clone();
        self.scope(namespace)
            .global_bindings()
            .filter(move |(name, _)| name.module_name.as_deref() == Some(module.as_str()))
    }
}
