//! Diagnostic accumulation and rendering.
//!
//! Passes report warnings and infos through a [`Reporter`]; fatal errors
//! travel as [`CompilerError`] results and are recorded here by the driver.
//! Diagnostics keep source order and are printed together at the end of a
//! module's compilation, each with a snippet of the offending line and a
//! caret pointer.

use crate::ast::Span;
use crate::error::CompilerError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Option<Span>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(span: Span, message: String) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            span: Some(span),
            message,
        }
    }

    pub fn info(span: Span, message: String) -> Self {
        Diagnostic {
            severity: Severity::Info,
            span: Some(span),
            message,
        }
    }
}

/// Collects diagnostics for one compilation. A fatal error stops further
/// accumulation for the current module but never aborts the process.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    fatal: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter {
            diagnostics: Vec::new(),
            fatal: false,
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        if !self.fatal {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn warn(&mut self, span: Span, message: String) {
        self.report(Diagnostic::warning(span, message));
    }

    /// Record a fatal compiler error and stop accumulating.
    pub fn fatal(&mut self, error: &CompilerError) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            span: error.span,
            message: error.to_string(),
        });
        self.fatal = true;
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render every collected diagnostic against the given source text.
    pub fn render_all(&self, file_name: &str, source: &str) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(&render_diagnostic(diagnostic, file_name, source));
            out.push('\n');
        }
        out
    }
}

/// Render one diagnostic with a source snippet and caret pointer:
///
/// ```text
/// error: unknown function `foo`
///   --> Queue.hs:3:12
///    |
///  3 | enqueue x q = foo q
///    |               ^^^
/// ```
pub fn render_diagnostic(diagnostic: &Diagnostic, file_name: &str, source: &str) -> String {
    let mut out = format!("{}: {}\n", diagnostic.severity, diagnostic.message);

    let span = match diagnostic.span {
        Some(span) if span.start_line > 0 => span,
        _ => return out,
    };

    out.push_str(&format!(
        "  --> {}:{}:{}\n",
        file_name, span.start_line, span.start_col
    ));

    let line = match source.lines().nth(span.start_line - 1) {
        Some(line) => line,
        None => return out,
    };

    let gutter_width = span.start_line.to_string().len();
    let pad = " ".repeat(gutter_width);
    out.push_str(&format!("{} |\n", pad));
    out.push_str(&format!("{} | {}\n", span.start_line, line));

    let caret_start = span.start_col.saturating_sub(1);
    let caret_len = if span.end_line == span.start_line && span.end_col > span.start_col {
        span.end_col - span.start_col
    } else {
        1
    };
    out.push_str(&format!(
        "{} | {}{}\n",
        pad,
        " ".repeat(caret_start),
        "^".repeat(caret_len.max(1))
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err_resolve_at;

    #[test]
    fn test_snippet_and_caret() {
        let source = "enqueue x q = foo q\n";
        let span = Span::new(1, 15, 1, 18);
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            span: Some(span),
            message: "unknown value `foo`".to_string(),
        };
        let rendered = render_diagnostic(&diagnostic, "Queue.hs", source);
        assert!(rendered.contains("error: unknown value `foo`"), "got:\n{}", rendered);
        assert!(rendered.contains("--> Queue.hs:1:15"), "got:\n{}", rendered);
        assert!(rendered.contains("1 | enqueue x q = foo q"), "got:\n{}", rendered);
        assert!(rendered.contains("|               ^^^"), "got:\n{}", rendered);
    }

    #[test]
    fn test_fatal_stops_accumulation() {
        let mut reporter = Reporter::new();
        reporter.warn(Span::new(1, 1, 1, 2), "first".to_string());
        reporter.fatal(&err_resolve_at!(Span::new(2, 1, 2, 2), "boom"));
        reporter.warn(Span::new(3, 1, 3, 2), "dropped".to_string());

        assert!(reporter.is_fatal());
        assert_eq!(reporter.diagnostics().len(), 2);
        assert_eq!(reporter.diagnostics()[1].severity, Severity::Error);
    }

    #[test]
    fn test_diagnostics_keep_source_order() {
        let mut reporter = Reporter::new();
        reporter.warn(Span::new(1, 1, 1, 2), "one".to_string());
        reporter.warn(Span::new(5, 1, 5, 2), "two".to_string());
        let messages: Vec<&str> =
            reporter.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }
}
