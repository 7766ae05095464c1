//! The symbol table: a stack of scope frames.
//!
//! Frame 0 is the globals frame (functions and module-level variables);
//! every block pushes a frame on entry and pops it on exit. Declaration
//! checks only the innermost frame, so inner scopes may shadow outer
//! bindings; lookup walks outward.

use indexmap::IndexMap;
use nanoc_par::ast::Type;
use nanoc_util::{CompileError, Span, Symbol};

/// What a name is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Const,
    Func,
    Array,
}

/// A resolved symbol.
#[derive(Clone, Debug)]
pub struct SymbolInfo {
    pub name: Symbol,
    /// Value type; element type for arrays; return type for functions.
    pub ty: Type,
    pub kind: SymbolKind,
    /// Depth of the frame this symbol was declared in (0 = globals).
    pub scope_level: usize,
    /// Element count, for arrays.
    pub array_size: Option<usize>,
    /// Parameter types, for functions.
    pub params: Option<Vec<Type>>,
    /// Declaration site.
    pub span: Span,
}

impl SymbolInfo {
    /// A plain variable or constant.
    pub fn var(name: Symbol, ty: Type, is_const: bool, span: Span) -> Self {
        Self {
            name,
            ty,
            kind: if is_const {
                SymbolKind::Const
            } else {
                SymbolKind::Var
            },
            scope_level: 0,
            array_size: None,
            params: None,
            span,
        }
    }

    /// An array of `size` elements.
    pub fn array(name: Symbol, elem_ty: Type, size: usize, span: Span) -> Self {
        Self {
            name,
            ty: elem_ty,
            kind: SymbolKind::Array,
            scope_level: 0,
            array_size: Some(size),
            params: None,
            span,
        }
    }

    /// A function signature.
    pub fn func(name: Symbol, ret_ty: Type, params: Vec<Type>, span: Span) -> Self {
        Self {
            name,
            ty: ret_ty,
            kind: SymbolKind::Func,
            scope_level: 0,
            array_size: None,
            params: Some(params),
            span,
        }
    }

    pub fn is_assignable(&self) -> bool {
        self.kind == SymbolKind::Var
    }
}

/// Nested scopes as a stack of name → symbol frames.
pub struct ScopeStack {
    frames: Vec<IndexMap<Symbol, SymbolInfo>>,
}

impl ScopeStack {
    /// A fresh stack holding only the (empty) globals frame.
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    /// Current nesting depth; 0 means only globals.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Enter a block scope.
    pub fn push(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Leave the innermost block scope. The globals frame is never popped.
    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the globals frame");
        self.frames.pop();
    }

    /// Declare a symbol in the innermost frame.
    ///
    /// Fails if the same frame already binds the name; shadowing an outer
    /// frame's binding is allowed.
    pub fn declare(&mut self, mut info: SymbolInfo) -> Result<(), CompileError> {
        info.scope_level = self.depth();
        let frame = self.frames.last_mut().expect("at least the globals frame");
        if frame.contains_key(&info.name) {
            return Err(CompileError::Name {
                message: format!("redeclaration of '{}'", info.name),
                line: info.span.line,
                col: info.span.column,
            });
        }
        frame.insert(info.name, info);
        Ok(())
    }

    /// Resolve a name, walking from the innermost frame outward.
    pub fn lookup(&self, name: Symbol) -> Option<&SymbolInfo> {
        self.frames.iter().rev().find_map(|frame| frame.get(&name))
    }

    /// Resolve a name in the globals frame only.
    pub fn lookup_global(&self, name: Symbol) -> Option<&SymbolInfo> {
        self.frames[0].get(&name)
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
