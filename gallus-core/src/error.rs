//! Compiler error type and constructor macros.
//!
//! Every error is fatal for the module being compiled: passes return
//! `Result<T>` and the first error aborts the module's pipeline. The driver
//! turns the error into a diagnostic and moves on to the next input file.

use crate::ast::Span;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompilerError>;

/// Which stage of the compiler produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Resolve,
    Type,
    Termination,
    Rename,
    Module,
    Config,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::Resolve => "resolver error",
            ErrorKind::Type => "type error",
            ErrorKind::Termination => "termination error",
            ErrorKind::Rename => "renaming error",
            ErrorKind::Module => "module error",
            ErrorKind::Config => "configuration error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}", self.render())]
pub struct CompilerError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub message: String,
}

impl CompilerError {
    pub fn new(kind: ErrorKind, span: Option<Span>, message: String) -> Self {
        CompilerError {
            kind,
            span,
            message,
        }
    }

    fn render(&self) -> String {
        match self.span {
            Some(span) => format!("{} at {}: {}", self.kind.label(), span, self.message),
            None => format!("{}: {}", self.kind.label(), self.message),
        }
    }
}

#[macro_export]
macro_rules! err_parse {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Parse, None, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_parse_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Parse, Some($span), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_parse_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_parse_at!($span, $($arg)*))
    };
}

#[macro_export]
macro_rules! err_resolve_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Resolve, Some($span), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_resolve_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_resolve_at!($span, $($arg)*))
    };
}

#[macro_export]
macro_rules! err_type {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Type, None, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_type_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Type, Some($span), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_type_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::err_type_at!($span, $($arg)*))
    };
}

#[macro_export]
macro_rules! err_termination_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::new(
            $crate::error::ErrorKind::Termination,
            Some($span),
            format!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! err_rename {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Rename, None, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_module {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Module, None, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_module_at {
    ($span:expr, $($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Module, Some($span), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_config {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::new($crate::error::ErrorKind::Config, None, format!($($arg)*))
    };
}
