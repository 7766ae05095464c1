//! nanoc-sem - Semantic analysis for NanoC.
//!
//! Validates the AST before lowering: name resolution through a scope stack,
//! type checking with no implicit conversions, `const` enforcement,
//! structural return-path analysis, and loop-context checks for
//! `break`/`continue`.
//!
//! Two sub-passes: function signatures are collected into the globals frame
//! first (hoisting, so forward references are legal), then every body is
//! walked with a fresh scope stack state.

pub mod analysis;
pub mod scope;

pub use analysis::{check, SemanticAnalyzer};
pub use nanoc_par::ast::Type;
pub use scope::{ScopeStack, SymbolInfo, SymbolKind};
