//! The Gallina output language.
//!
//! A small AST for the sentences and terms the code generator emits. The
//! compiler never evaluates these; they only exist to be pretty-printed
//! (see [`pretty`]).

pub mod pretty;

/// A top-level Vernacular sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Comment(String),
    /// `From <from> Require Import <modules>.` (plain `Require Import`
    /// when `from` is `None`)
    RequireImport {
        from: Option<String>,
        modules: Vec<String>,
    },
    ModuleStart(String),
    ModuleEnd(String),
    /// One or more mutually recursive inductive bodies joined by `with`.
    Inductive(Vec<InductiveBody>),
    Definition(DefinitionSentence),
    /// One or more mutually recursive fixpoint bodies joined by `with`.
    Fixpoint(Vec<FixBody>),
    /// `Arguments <ident> {i1} {i2} ... .`
    Arguments { ident: String, implicits: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InductiveBody {
    pub name: String,
    pub params: Vec<Binder>,
    /// Constructor name and its full (arrow) type.
    pub constructors: Vec<(String, Term)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionSentence {
    pub name: String,
    pub binders: Vec<Binder>,
    pub return_type: Option<Term>,
    pub body: Term,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixBody {
    pub name: String,
    pub binders: Vec<Binder>,
    /// The binder named in the `{struct ...}` annotation.
    pub struct_arg: String,
    pub return_type: Option<Term>,
    pub body: Term,
}

/// A binder `(x : T)`, `{x : T}` or bare `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binder {
    pub names: Vec<String>,
    pub ty: Option<Term>,
    pub implicit: bool,
}

impl Binder {
    pub fn explicit(name: &str, ty: Term) -> Self {
        Binder {
            names: vec![name.to_string()],
            ty: Some(ty),
            implicit: false,
        }
    }

    pub fn implicit(names: Vec<String>, ty: Term) -> Self {
        Binder {
            names,
            ty: Some(ty),
            implicit: true,
        }
    }

    pub fn untyped(name: &str) -> Self {
        Binder {
            names: vec![name.to_string()],
            ty: None,
            implicit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A (possibly qualified) reference
    Qualid(String),
    /// The sort `Type`
    Sort,
    App(Box<Term>, Vec<Term>),
    /// `T1 -> T2`
    Arrow(Box<Term>, Box<Term>),
    /// `fun x ... => body`
    Fun(Vec<Binder>, Box<Term>),
    Match(Box<Term>, Vec<MatchArm>),
    /// `arg >>= cont`: the free monad's bind, rendered infix
    Bind(Box<Term>, Box<Term>),
    /// `pure t`
    Pure(Box<Term>),
    /// Integer in `%Z` scope
    IntLiteral(i64),
    /// String in `%string` scope
    StringLiteral(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub constructor: String,
    pub vars: Vec<String>,
    pub rhs: Term,
}

impl Term {
    pub fn qualid(name: &str) -> Term {
        Term::Qualid(name.to_string())
    }

    /// Apply `head` to `args`, flattening nested applications and dropping
    /// empty argument lists.
    pub fn app(head: Term, mut args: Vec<Term>) -> Term {
        if args.is_empty() {
            return head;
        }
        match head {
            Term::App(inner_head, mut inner_args) => {
                inner_args.append(&mut args);
                Term::App(inner_head, inner_args)
            }
            _ => Term::App(Box::new(head), args),
        }
    }

    pub fn arrow(from: Term, to: Term) -> Term {
        Term::Arrow(Box::new(from), Box::new(to))
    }

    pub fn pure(inner: Term) -> Term {
        Term::Pure(Box::new(inner))
    }

    pub fn bind(arg: Term, cont: Term) -> Term {
        Term::Bind(Box::new(arg), Box::new(cont))
    }

    /// The payload when this term is `pure t`; drives bind short-circuiting.
    pub fn as_pure(&self) -> Option<&Term> {
        match self {
            Term::Pure(inner) => Some(inner),
            _ => None,
        }
    }
}
