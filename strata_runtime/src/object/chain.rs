//! Ancestor chains.
//!
//! Each module owns an `AncestorChain`: the modules it has included, as
//! `IncludedModule` proxies ordered from the most recently included to the
//! earliest. A proxy shares its target, so methods defined on a module after
//! it was mixed in are visible through every chain that includes it.
//!
//! The full lookup path of a module is linearized as:
//!
//! ```text
//! self ─► self.chain[0] ─► self.chain[1] ─► … ─► superclass ─► superclass.chain[0] ─► …
//! ```
//!
//! A single chain never holds two proxies for the same module.

use crate::dispatch::TopologyVersion;
use crate::object::module::ModuleRef;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::fmt;

/// Chains are short; most modules include a handful of mixins at most.
type ChainVec = SmallVec<[IncludedModule; 4]>;

// =============================================================================
// Included Module
// =============================================================================

/// A chain entry referencing a shared module without copying its table.
#[derive(Clone, PartialEq, Eq)]
pub struct IncludedModule {
    target: ModuleRef,
}

impl IncludedModule {
    #[inline]
    pub fn new(target: ModuleRef) -> Self {
        Self { target }
    }

    /// The module this proxy stands for.
    #[inline]
    pub fn target(&self) -> &ModuleRef {
        &self.target
    }
}

impl fmt::Debug for IncludedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IncludedModule({})", self.target)
    }
}

// =============================================================================
// Ancestor Chain
// =============================================================================

/// The included modules of one module, most recent first.
pub struct AncestorChain {
    entries: RwLock<ChainVec>,
    version: TopologyVersion,
}

impl AncestorChain {
    pub(crate) fn new(version: TopologyVersion) -> Self {
        Self {
            entries: RwLock::new(SmallVec::new()),
            version,
        }
    }

    /// Snapshot of the proxies.
    pub fn entries(&self) -> SmallVec<[IncludedModule; 4]> {
        self.entries.read().clone()
    }

    /// Snapshot of the included modules.
    pub fn modules(&self) -> Vec<ModuleRef> {
        self.entries
            .read()
            .iter()
            .map(|p| p.target.clone())
            .collect()
    }

    #[inline]
    pub fn contains(&self, module: &ModuleRef) -> bool {
        self.entries.read().iter().any(|p| p.target == *module)
    }

    pub fn position(&self, module: &ModuleRef) -> Option<usize> {
        self.entries.read().iter().position(|p| p.target == *module)
    }

    /// Splice proxies at the front, keeping their relative order.
    ///
    /// Proxies whose target is already present are skipped. Returns how many
    /// were inserted; the version is bumped only if that is non-zero.
    pub(crate) fn prepend(&self, proxies: &[IncludedModule]) -> usize {
        let mut entries = self.entries.write();
        let fresh: ChainVec = proxies
            .iter()
            .filter(|p| !entries.iter().any(|e| e.target == p.target))
            .cloned()
            .collect();
        let count = fresh.len();
        if count > 0 {
            entries.insert_many(0, fresh);
            drop(entries);
            self.version.bump();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// =============================================================================
// Linearization
// =============================================================================

/// One step of a linearized lookup path.
#[derive(Clone, PartialEq, Eq)]
pub enum AncestorEntry {
    /// The module the walk started at.
    Own(ModuleRef),
    /// A proxy found in `host`'s chain.
    Included {
        host: ModuleRef,
        proxy: IncludedModule,
    },
    /// A superclass reached through the class links.
    Superclass(ModuleRef),
}

impl AncestorEntry {
    /// The module whose tables this step consults.
    #[inline]
    pub fn module(&self) -> &ModuleRef {
        match self {
            AncestorEntry::Own(m) | AncestorEntry::Superclass(m) => m,
            AncestorEntry::Included { proxy, .. } => proxy.target(),
        }
    }

    /// The module whose own chain holds this step.
    #[inline]
    pub fn host(&self) -> &ModuleRef {
        match self {
            AncestorEntry::Own(m) | AncestorEntry::Superclass(m) => m,
            AncestorEntry::Included { host, .. } => host,
        }
    }
}

impl fmt::Debug for AncestorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AncestorEntry::Own(m) => write!(f, "Own({})", m),
            AncestorEntry::Included { host, proxy } => {
                write!(f, "Included({} in {})", proxy.target(), host)
            }
            AncestorEntry::Superclass(m) => write!(f, "Superclass({})", m),
        }
    }
}

/// Visit the lookup path of `module` in order until `visit` returns `Some`.
pub fn search<T, F>(module: &ModuleRef, mut visit: F) -> Option<T>
where
    F: FnMut(&AncestorEntry) -> Option<T>,
{
    let mut current = Some(module.clone());
    let mut first = true;

    while let Some(host) = current {
        let own = if first {
            AncestorEntry::Own(host.clone())
        } else {
            AncestorEntry::Superclass(host.clone())
        };
        first = false;

        if let Some(found) = visit(&own) {
            return Some(found);
        }

        for proxy in host.chain().entries() {
            let entry = AncestorEntry::Included {
                host: host.clone(),
                proxy,
            };
            if let Some(found) = visit(&entry) {
                return Some(found);
            }
        }

        current = host.superclass().cloned();
    }

    None
}

/// The full linearized lookup path of `module`.
pub fn walk(module: &ModuleRef) -> Vec<AncestorEntry> {
    let mut entries = Vec::new();
    search::<(), _>(module, |entry| {
        entries.push(entry.clone());
        None
    });
    entries
}

/// The modules on the lookup path of `module`, starting with itself.
pub fn ancestors(module: &ModuleRef) -> Vec<ModuleRef> {
    walk(module)
        .into_iter()
        .map(|entry| entry.module().clone())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
