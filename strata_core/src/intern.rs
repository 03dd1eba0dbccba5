//! Global symbol table.
//!
//! Selectors, constant names and instance-slot names are interned once and
//! compared by index afterwards. A `Symbol` is a 4-byte handle; equality and
//! hashing never touch the underlying string.
//!
//! Interned strings are leaked and live for the rest of the process, so
//! `Symbol::as_str` can hand out `&'static str` without holding a lock.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::OnceLock;

// =============================================================================
// Symbol
// =============================================================================

/// An interned identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct SymbolTable {
    ids: FxHashMap<&'static str, Symbol>,
    names: Vec<&'static str>,
}

static SYMBOLS: OnceLock<RwLock<SymbolTable>> = OnceLock::new();

#[inline]
fn table() -> &'static RwLock<SymbolTable> {
    SYMBOLS.get_or_init(|| {
        RwLock::new(SymbolTable {
            ids: FxHashMap::default(),
            names: Vec::new(),
        })
    })
}

/// Intern a string, returning its symbol.
///
/// Interning the same string twice returns the same symbol.
pub fn intern(name: &str) -> Symbol {
    if let Some(&sym) = table().read().ids.get(name) {
        return sym;
    }

    let mut table = table().write();
    // Another thread may have won the race between the two locks.
    if let Some(&sym) = table.ids.get(name) {
        return sym;
    }

    let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
    let sym = Symbol(table.names.len() as u32);
    table.names.push(leaked);
    table.ids.insert(leaked, sym);
    sym
}

/// Number of symbols interned so far.
pub fn symbol_count() -> usize {
    table().read().names.len()
}

impl Symbol {
    /// The interned string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        table().read().names[self.0 as usize]
    }

    /// Raw index in the symbol table.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Look a symbol up by raw index.
    pub fn from_index(index: u32) -> Option<Symbol> {
        if (index as usize) < table().read().names.len() {
            Some(Symbol(index))
        } else {
            None
        }
    }

    /// Whether this symbol is a valid constant name (leading uppercase letter).
    pub fn is_constant_name(self) -> bool {
        self.as_str()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    /// Whether this symbol names a writer (`name=`).
    pub fn is_setter(self) -> bool {
        let name = self.as_str();
        name.len() > 1 && name.ends_with('=')
    }

    /// The writer selector for this name: `x` becomes `x=`.
    pub fn setter(self) -> Symbol {
        intern(&format!("{}=", self.as_str()))
    }

    /// The instance-slot name for this name: `x` becomes `@x`.
    ///
    /// Names that already carry the sigil are returned unchanged.
    pub fn ivar(self) -> Symbol {
        let name = self.as_str();
        if name.starts_with('@') {
            self
        } else {
            intern(&format!("@{}", name))
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    #[inline]
    fn from(name: &str) -> Self {
        intern(name)
    }
}

impl From<&String> for Symbol {
    #[inline]
    fn from(name: &String) -> Self {
        intern(name)
    }
}

impl From<String> for Symbol {
    #[inline]
    fn from(name: String) -> Self {
        intern(&name)
    }
}

// =============================================================================
// Tests
// =============================================================================
