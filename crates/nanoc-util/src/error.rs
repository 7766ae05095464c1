//! The compile-error taxonomy.
//!
//! One variant per failure class, carrying exactly the payload a diagnostic
//! needs. Every phase returns `Result<_, CompileError>`; the first error
//! aborts the pipeline (panic-mode, no recovery).
//!
//! The `Display` impls render the canonical diagnostic shape
//! `"<kind>: <message> at line <L>, col <C>"`, so the driver can print an
//! error with nothing more than `format!("{err}")`.

use thiserror::Error;

use crate::diagnostic::{Diagnostic, Level};
use crate::span::Span;

/// Any error the compiler core can produce.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// The lexer met a character no token can start with.
    #[error("LexError: unexpected character '{ch}' at line {line}, col {col}")]
    Lex { ch: char, line: u32, col: u32 },

    /// The parser met a token it did not expect.
    #[error("ParseError: expected {expected}, found {found} at line {line}, col {col}")]
    Parse {
        expected: String,
        found: String,
        line: u32,
        col: u32,
    },

    /// Operand or assignment types do not line up.
    #[error("TypeError: {message} at line {line}, col {col}")]
    Type {
        message: String,
        line: u32,
        col: u32,
    },

    /// Undeclared use, redeclaration, or a write to a `const`.
    #[error("NameError: {message} at line {line}, col {col}")]
    Name {
        message: String,
        line: u32,
        col: u32,
    },

    /// A call passed the wrong number of arguments.
    #[error("ArityError: {name} expects {expected} argument(s), got {got} at line {line}, col {col}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
        line: u32,
        col: u32,
    },

    /// A non-void function has a path that falls off the end.
    #[error("ReturnError: function '{function}' does not return on every path")]
    MissingReturn { function: String },

    /// `break` or `continue` outside any loop.
    #[error("ControlFlowError: '{keyword}' outside of a loop at line {line}, col {col}")]
    ControlFlow {
        keyword: &'static str,
        line: u32,
        col: u32,
    },

    /// An optimizer or codegen invariant was violated. Always a bug.
    #[error("InternalError: {context}")]
    Internal { context: String },
}

impl CompileError {
    /// Shorthand for an internal invariant violation.
    pub fn internal(context: impl Into<String>) -> Self {
        CompileError::Internal {
            context: context.into(),
        }
    }

    /// The source position the error points at, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex { line, col, .. }
            | CompileError::Parse { line, col, .. }
            | CompileError::Type { line, col, .. }
            | CompileError::Name { line, col, .. }
            | CompileError::Arity { line, col, .. }
            | CompileError::ControlFlow { line, col, .. } => Some(Span::point(*line, *col)),
            CompileError::MissingReturn { .. } | CompileError::Internal { .. } => None,
        }
    }

    /// Convert into the record the driver surfaces.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            level: Level::Error,
            message: self.to_string(),
            span: self.span().unwrap_or(Span::DUMMY),
        }
    }
}
