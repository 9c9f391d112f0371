//! String interning.
//!
//! Identifier and function names are repeated through every phase of the
//! pipeline (tokens, AST, symbol tables, TAC operands, emitted labels).
//! Interning stores one copy of each distinct string and hands out a
//! 4-byte [`Symbol`], so operand equality and hashing are integer
//! operations instead of string walks.
//!
//! Strings are leaked into the table to get `'static` references. The
//! table lives for the whole process and entries are never removed, so no
//! lifetime tracking is needed. The pipeline is single-threaded; a
//! read/write lock over an `FxHashMap` is all the synchronization the
//! table requires.

use std::fmt;
use std::sync::{LazyLock, RwLock};

use rustc_hash::FxHashMap;

static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// An interned string.
///
/// Two symbols are equal iff the strings they were interned from are
/// equal.
///
/// # Examples
///
/// ```
/// use micac_util::Symbol;
///
/// let a = Symbol::intern("main");
/// let b = Symbol::intern("main");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "main");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    index: u32,
}

impl Symbol {
    /// Intern a string, returning its symbol.
    pub fn intern(string: &str) -> Symbol {
        STRING_TABLE.intern(string)
    }

    /// The string this symbol was interned from.
    pub fn as_str(self) -> &'static str {
        STRING_TABLE.resolve(self.index)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

struct StringTable {
    inner: RwLock<TableInner>,
}

struct TableInner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl StringTable {
    fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner {
                map: FxHashMap::default(),
                strings: Vec::new(),
            }),
        }
    }

    fn intern(&self, string: &str) -> Symbol {
        if let Some(&index) = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .map
            .get(string)
        {
            return Symbol { index };
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(&index) = inner.map.get(string) {
            return Symbol { index };
        }
        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = inner.strings.len() as u32;
        inner.strings.push(leaked);
        inner.map.insert(leaked, index);
        Symbol { index }
    }

    fn resolve(&self, index: u32) -> &'static str {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).strings[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedupes() {
        let a = Symbol::intern("counter");
        let b = Symbol::intern("counter");
        assert_eq!(a, b);
        assert_eq!(a.index, b.index);
    }

    #[test]
    fn test_distinct_strings_distinct_symbols() {
        let a = Symbol::intern("left");
        let b = Symbol::intern("right");
        assert_ne!(a, b);
    }

    #[test]
    fn test_as_str_roundtrip() {
        let s = Symbol::intern("print_integer");
        assert_eq!(s.as_str(), "print_integer");
    }

    #[test]
    fn test_display() {
        let s = Symbol::intern("x");
        assert_eq!(s.to_string(), "x");
        assert_eq!(format!("{:?}", s), "Symbol(\"x\")");
    }
}
