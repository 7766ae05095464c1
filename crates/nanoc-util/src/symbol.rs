//! String interning for identifiers.
//!
//! Every identifier the lexer produces is interned once and referred to by a
//! 4-byte [`Symbol`] handle afterwards. Comparison and hashing become O(1)
//! index operations, and the many repeated occurrences of the same name in
//! tokens, AST, symbol tables, and IR share a single allocation.
//!
//! Interned strings are leaked and live for the program's lifetime; the
//! total is bounded by the size of the source text, which is acceptable for
//! a batch compiler.
//!
//! # Examples
//!
//! ```
//! use nanoc_util::Symbol;
//!
//! let a = Symbol::intern("main");
//! let b = Symbol::intern("main");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "main");
//! ```

use std::sync::{OnceLock, RwLock};

use rustc_hash::FxHashMap;

/// A handle to an interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct Interner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::new(),
        }
    }

    fn intern(&mut self, text: &str) -> u32 {
        if let Some(&idx) = self.map.get(text) {
            return idx;
        }
        // Leak the allocation so the handle stays valid for the program
        // lifetime without an explicit arena.
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let idx = self.strings.len() as u32;
        self.strings.push(leaked);
        self.map.insert(leaked, idx);
        idx
    }
}

fn interner() -> &'static RwLock<Interner> {
    static INTERNER: OnceLock<RwLock<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| RwLock::new(Interner::new()))
}

impl Symbol {
    /// Intern a string, returning its handle.
    ///
    /// Interning the same text twice yields the same handle.
    pub fn intern(text: &str) -> Symbol {
        {
            let guard = interner().read().expect("interner poisoned");
            if let Some(&idx) = guard.map.get(text) {
                return Symbol(idx);
            }
        }
        let mut guard = interner().write().expect("interner poisoned");
        Symbol(guard.intern(text))
    }

    /// Resolve the handle back to its string.
    pub fn as_str(self) -> &'static str {
        let guard = interner().read().expect("interner poisoned");
        guard.strings[self.0 as usize]
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_handle() {
        let a = Symbol::intern("counter");
        let b = Symbol::intern("counter");
        let c = Symbol::intern("counter2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn round_trips_text() {
        let s = Symbol::intern("readInt");
        assert_eq!(s.as_str(), "readInt");
        assert_eq!(s.to_string(), "readInt");
    }

    #[test]
    fn empty_string_is_internable() {
        let s = Symbol::intern("");
        assert_eq!(s.as_str(), "");
    }
}
