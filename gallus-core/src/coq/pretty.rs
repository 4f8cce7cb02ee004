//! Deterministic pretty printer for the Gallina AST.
//!
//! Output shape is fixed: one sentence per block, two-space indentation
//! inside modules and for definition bodies, multi-line `match` arms. The
//! printer is the single place that decides parenthesization, driven by a
//! three-level precedence: 0 admits any term; 1 is operand position
//! (`->`, `>>=`); 2 is application-argument position (atoms only).

use super::*;
use std::fmt::Write;

/// Render a sequence of sentences to a `.v` file body.
pub fn write_sentences(sentences: &[Sentence]) -> String {
    let mut out = String::new();
    let mut indent = 0usize;
    for sentence in sentences {
        if matches!(sentence, Sentence::ModuleEnd(_)) {
            indent = indent.saturating_sub(1);
        }
        write_sentence(sentence, indent, &mut out);
        if matches!(sentence, Sentence::ModuleStart(_)) {
            indent += 1;
        }
    }
    out
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

fn write_sentence(sentence: &Sentence, indent: usize, out: &mut String) {
    let lead = pad(indent);
    match sentence {
        Sentence::Comment(text) => {
            let _ = writeln!(out, "{}(* {} *)", lead, text);
        }
        Sentence::RequireImport { from, modules } => {
            let modules = modules.join(" ");
            match from {
                Some(prefix) => {
                    let _ = writeln!(out, "{}From {} Require Import {}.", lead, prefix, modules);
                }
                None => {
                    let _ = writeln!(out, "{}Require Import {}.", lead, modules);
                }
            }
        }
        Sentence::ModuleStart(name) => {
            let _ = writeln!(out, "{}Module {}.", lead, name);
            let _ = writeln!(out);
        }
        Sentence::ModuleEnd(name) => {
            let _ = writeln!(out, "{}End {}.", lead, name);
        }
        Sentence::Inductive(bodies) => {
            for (position, body) in bodies.iter().enumerate() {
                let keyword = if position == 0 { "Inductive" } else { "with" };
                let _ = writeln!(
                    out,
                    "{}{} {}{} : Type :=",
                    lead,
                    keyword,
                    body.name,
                    binders(&body.params)
                );
                for (con_name, con_type) in &body.constructors {
                    let _ = writeln!(
                        out,
                        "{}| {} : {}",
                        pad(indent),
                        con_name,
                        term(con_type, 0, indent + 1)
                    );
                }
            }
            trim_newline(out);
            let _ = writeln!(out, ".");
            let _ = writeln!(out);
        }
        Sentence::Definition(def) => {
            let _ = write!(out, "{}Definition {}{}", lead, def.name, binders(&def.binders));
            if let Some(return_type) = &def.return_type {
                let _ = write!(out, " : {}", term(return_type, 0, indent));
            }
            let _ = writeln!(out, " :=");
            let _ = writeln!(out, "{}{}.", pad(indent + 1), term(&def.body, 0, indent + 1));
            let _ = writeln!(out);
        }
        Sentence::Fixpoint(bodies) => {
            for (position, body) in bodies.iter().enumerate() {
                let keyword = if position == 0 { "Fixpoint" } else { "with" };
                let _ = write!(
                    out,
                    "{}{} {}{} {{struct {}}}",
                    lead,
                    keyword,
                    body.name,
                    binders(&body.binders),
                    body.struct_arg
                );
                if let Some(return_type) = &body.return_type {
                    let _ = write!(out, " : {}", term(return_type, 0, indent));
                }
                let _ = writeln!(out, " :=");
                let _ = writeln!(out, "{}{}", pad(indent + 1), term(&body.body, 0, indent + 1));
            }
            trim_newline(out);
            let _ = writeln!(out, ".");
            let _ = writeln!(out);
        }
        Sentence::Arguments { ident, implicits } => {
            let braced: Vec<String> = implicits.iter().map(|name| format!("{{{}}}", name)).collect();
            let _ = writeln!(out, "{}Arguments {} {}.", lead, ident, braced.join(" "));
        }
    }
}

/// Drop the final newline so a terminating `.` can attach to the last line.
fn trim_newline(out: &mut String) {
    if out.ends_with('\n') {
        out.pop();
    }
}

fn binders(list: &[Binder]) -> String {
    let mut out = String::new();
    for binder in list {
        let _ = write!(out, " {}", binder_text(binder));
    }
    out
}

fn binder_text(binder: &Binder) -> String {
    let names = binder.names.join(" ");
    match (&binder.ty, binder.implicit) {
        (Some(ty), true) => format!("{{{} : {}}}", names, term(ty, 0, 0)),
        (Some(ty), false) => format!("({} : {})", names, term(ty, 0, 0)),
        (None, true) => format!("{{{}}}", names),
        (None, false) => names,
    }
}

/// Render a term at the given precedence level.
fn term(t: &Term, prec: u8, indent: usize) -> String {
    match t {
        Term::Qualid(name) => name.clone(),
        Term::Sort => "Type".to_string(),
        Term::IntLiteral(value) => {
            if *value < 0 {
                format!("({}%Z)", value)
            } else {
                format!("{}%Z", value)
            }
        }
        // Coq escapes a double quote inside a string by doubling it.
        Term::StringLiteral(value) => format!("\"{}\"%string", value.replace('"', "\"\"")),
        Term::App(head, args) => {
            let mut text = term(head, 2, indent);
            for arg in args {
                text.push(' ');
                text.push_str(&term(arg, 2, indent));
            }
            parenthesize(text, prec >= 2)
        }
        Term::Pure(inner) => {
            let text = format!("pure {}", term(inner, 2, indent));
            parenthesize(text, prec >= 2)
        }
        Term::Arrow(from, to) => {
            let text = format!("{} -> {}", term(from, 1, indent), term(to, 0, indent));
            parenthesize(text, prec >= 1)
        }
        Term::Bind(arg, cont) => {
            let text = format!("{} >>= {}", term(arg, 1, indent), term(cont, 1, indent));
            parenthesize(text, prec >= 1)
        }
        Term::Fun(params, body) => {
            let text = format!("fun{} => {}", binders(params), term(body, 0, indent));
            parenthesize(text, prec >= 1)
        }
        Term::Match(scrutinee, arms) => {
            let mut text = format!("match {} with", term(scrutinee, 0, indent));
            for arm in arms {
                text.push('\n');
                text.push_str(&pad(indent));
                text.push_str("| ");
                text.push_str(&arm.constructor);
                for var in &arm.vars {
                    text.push(' ');
                    text.push_str(var);
                }
                text.push_str(" => ");
                text.push_str(&term(&arm.rhs, 0, indent + 1));
            }
            text.push('\n');
            text.push_str(&pad(indent));
            text.push_str("end");
            parenthesize(text, prec >= 1)
        }
    }
}

fn parenthesize(text: String, needed: bool) -> String {
    if needed {
        format!("({})", text)
    } else {
        text
    }
}
