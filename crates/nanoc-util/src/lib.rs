//! nanoc-util - Shared infrastructure for the NanoC compiler.
//!
//! This crate holds the types every phase of the pipeline depends on:
//! source positions ([`Span`]), interned identifiers ([`Symbol`]), the
//! compile-error taxonomy ([`CompileError`]), and the diagnostic record the
//! driver renders ([`Diagnostic`]).
//!
//! The compiler is panic-mode: each phase returns
//! `Result<_, CompileError>` and the first error aborts the pipeline, so
//! there is no accumulating diagnostic handler here.

pub mod diagnostic;
pub mod error;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Level};
pub use error::CompileError;
pub use span::Span;
pub use symbol::Symbol;
