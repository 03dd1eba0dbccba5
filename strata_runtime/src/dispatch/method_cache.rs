//! Method resolution cache.
//!
//! Memoizes the result of an ancestor walk per `(module, selector)` pair,
//! including negative results. Every entry is stamped with the topology
//! version at the time it was cached.
//!
//! # Invalidation
//!
//! There is no targeted invalidation. Any structural mutation anywhere in the
//! space (method definition, removal or visibility change, include, extend)
//! bumps one `TopologyVersion`. An entry whose stamp differs from the current
//! version is stale and is treated as absent. This costs some avoidable
//! misses after unrelated mutations, but a change to a deeply shared module
//! can never leave a stale hit behind.
//!
//! # Thread Safety
//!
//! Lookups take a read lock; inserts take a write lock. Counters are relaxed
//! atomics used only for statistics.

use crate::dispatch::resolver::ResolvedMethod;
use crate::object::ModuleId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use strata_core::Symbol;

// =============================================================================
// Topology Version
// =============================================================================

/// Monotonic counter bumped on every structural mutation of a space.
///
/// Cloning shares the counter; every table and chain of one space holds a
/// clone.
#[derive(Debug, Clone, Default)]
pub struct TopologyVersion(Arc<AtomicU64>);

impl TopologyVersion {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance the version, returning the new value.
    #[inline]
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

// =============================================================================
// Cache Entries
// =============================================================================

/// Cache key: the module the walk started at and the selector.
type CacheKey = (ModuleId, Symbol);

/// A cached resolution outcome.
#[derive(Debug, Clone)]
pub enum CacheState {
    /// The walk found a binding.
    Hit(ResolvedMethod),
    /// The walk found nothing.
    Miss,
}

impl CacheState {
    #[inline]
    pub fn into_resolved(self) -> Option<ResolvedMethod> {
        match self {
            CacheState::Hit(resolved) => Some(resolved),
            CacheState::Miss => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedMethod {
    /// Outcome of the walk, positive or negative.
    state: CacheState,

    /// Topology version read before the walk started.
    ///
    /// The entry is only served while the space is still at this version.
    /// A walk that raced a mutation carries the older stamp, so its entry is
    /// stale from the moment it is written.
    version: u64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups served from a current entry.
    pub hits: u64,
    /// Lookups that found no entry or a stale one.
    pub misses: u64,
    /// Stale entries discarded, plus full clears.
    pub invalidations: u64,
    /// Entries held at snapshot time, stale ones included.
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// =============================================================================
// Method Cache
// =============================================================================

/// Version-stamped `(module, selector)` → outcome cache.
pub struct MethodCache {
    /// The actual cache storage
    cache: RwLock<FxHashMap<CacheKey, CachedMethod>>,
    /// Entry count that triggers a purge on the next new key
    capacity: usize,
    /// Cache hit counter (for profiling and tuning)
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
    /// Invalidation counter (stale entries and clears)
    invalidations: AtomicU64,
}

impl MethodCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(FxHashMap::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Look up a cached outcome that is current at `version`.
    ///
    /// A stale entry counts as a miss and is left for the next insert to
    /// overwrite.
    ///
    /// # Performance
    ///
    /// One read lock and one hash probe; readers never block each other.
    #[inline]
    pub fn get(&self, module: ModuleId, selector: Symbol, version: u64) -> Option<CacheState> {
        let guard = self.cache.read();
        match guard.get(&(module, selector)) {
            Some(entry) if entry.version == version => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.state.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.invalidations.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Record an outcome computed at `version`.
    ///
    /// At capacity, entries older than the newest stamp held are purged
    /// first; if none are older the whole cache is cleared. An outcome whose
    /// stamp is already older than the newest one is dropped rather than
    /// evicting current entries.
    pub fn insert(&self, module: ModuleId, selector: Symbol, state: CacheState, version: u64) {
        let mut guard = self.cache.write();
        let key = (module, selector);

        if guard.len() >= self.capacity && !guard.contains_key(&key) {
            let newest = guard.values().map(|entry| entry.version).max().unwrap_or(version);
            if version < newest {
                return;
            }

            let before = guard.len();
            guard.retain(|_, entry| entry.version == version);
            let purged = before - guard.len();
            if purged > 0 {
                self.invalidations
                    .fetch_add(purged as u64, Ordering::Relaxed);
            } else {
                guard.clear();
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
        }

        guard.insert(key, CachedMethod { state, version });
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.write().clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
