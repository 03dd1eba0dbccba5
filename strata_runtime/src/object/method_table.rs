//! Per-module method table.
//!
//! Maps selectors to bound method entries. Every mutation bumps the space's
//! topology version, which makes every cached resolution stale at once.

use crate::dispatch::TopologyVersion;
use crate::method::{MethodEntry, Visibility};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use strata_core::Symbol;

/// Selector → method entry mapping owned by exactly one module.
pub struct MethodTable {
    entries: RwLock<FxHashMap<Symbol, MethodEntry>>,
    version: TopologyVersion,
}

impl MethodTable {
    pub(crate) fn new(version: TopologyVersion) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            version,
        }
    }

    /// Insert or replace a binding. Returns the previous entry.
    pub fn define(&self, selector: Symbol, entry: MethodEntry) -> Option<MethodEntry> {
        let previous = self.entries.write().insert(selector, entry);
        self.version.bump();
        previous
    }

    #[inline]
    pub fn lookup(&self, selector: Symbol) -> Option<MethodEntry> {
        self.entries.read().get(&selector).cloned()
    }

    #[inline]
    pub fn contains(&self, selector: Symbol) -> bool {
        self.entries.read().contains_key(&selector)
    }

    /// Remove a binding. Only an actual removal bumps the version.
    pub fn remove(&self, selector: Symbol) -> Option<MethodEntry> {
        let removed = self.entries.write().remove(&selector);
        if removed.is_some() {
            self.version.bump();
        }
        removed
    }

    /// Change the visibility of an existing binding in place.
    ///
    /// Returns `false` if the selector is not bound here.
    pub fn set_visibility(&self, selector: Symbol, visibility: Visibility) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(&selector) {
            Some(entry) => {
                if entry.visibility != visibility {
                    entry.visibility = visibility;
                    drop(entries);
                    self.version.bump();
                }
                true
            }
            None => false,
        }
    }

    /// Bound selectors, sorted by name.
    pub fn selectors(&self) -> Vec<Symbol> {
        let mut selectors: Vec<Symbol> = self.entries.read().keys().copied().collect();
        selectors.sort_by_key(|sym| sym.as_str());
        selectors
    }

    /// Selectors bound with the given visibility, sorted by name.
    pub fn selectors_with(&self, visibility: Visibility) -> Vec<Symbol> {
        let mut selectors: Vec<Symbol> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.visibility == visibility)
            .map(|(sym, _)| *sym)
            .collect();
        selectors.sort_by_key(|sym| sym.as_str());
        selectors
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
