//! Module representation.
//!
//! A `Module` owns its method table, constant table, ancestor chain and
//! instance slots. Classes and metaclasses are modules with a superclass link
//! and a `ModuleKind` describing what they allocate or what they are attached
//! to.
//!
//! # Thread Safety
//!
//! Every mutable part sits behind a `parking_lot::RwLock`, so lookups from
//! many threads proceed in parallel. Structural mutations are serialized by
//! the owning `ObjectSpace`, not here.

use crate::dispatch::TopologyVersion;
use crate::object::chain::AncestorChain;
use crate::object::class::AllocationPolicy;
use crate::object::instance::InstanceSlots;
use crate::object::metaclass::Attached;
use crate::object::method_table::MethodTable;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use strata_core::Symbol;

// =============================================================================
// Module Identity
// =============================================================================

/// Global counter for module identities.
static NEXT_MODULE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique, never-reused identity of a module.
///
/// Used as the resolver cache key and for hierarchy membership sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    fn allocate() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

// =============================================================================
// Module Kind
// =============================================================================

/// What a module is.
#[derive(Debug, Clone)]
pub enum ModuleKind {
    /// A mixin: no superclass, cannot allocate.
    Module,
    /// A class with its instance-allocation policy.
    Class { allocation: AllocationPolicy },
    /// A per-object singleton class.
    MetaClass { attached: Attached },
}

// =============================================================================
// Module
// =============================================================================

/// A module, class or metaclass.
pub struct Module {
    id: ModuleId,

    /// Display name; `None` for anonymous modules.
    name: RwLock<Option<Arc<str>>>,

    kind: ModuleKind,

    /// Fixed at creation. Always `None` for plain modules.
    superclass: Option<ModuleRef>,

    methods: MethodTable,

    constants: RwLock<FxHashMap<Symbol, Value>>,

    /// Included modules, most recent first.
    chain: AncestorChain,

    /// Singleton class, created on first demand.
    metaclass: RwLock<Option<ModuleRef>>,

    /// Modules are objects too and carry their own instance slots.
    slots: InstanceSlots,
}

impl Module {
    pub(crate) fn new(
        name: Option<&str>,
        kind: ModuleKind,
        superclass: Option<ModuleRef>,
        version: &TopologyVersion,
    ) -> ModuleRef {
        ModuleRef(Arc::new(Module {
            id: ModuleId::allocate(),
            name: RwLock::new(name.map(Arc::from)),
            kind,
            superclass,
            methods: MethodTable::new(version.clone()),
            constants: RwLock::new(FxHashMap::default()),
            chain: AncestorChain::new(version.clone()),
            metaclass: RwLock::new(None),
            slots: InstanceSlots::new(),
        }))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Display name, if the module has been named.
    pub fn name(&self) -> Option<Arc<str>> {
        self.name.read().clone()
    }

    /// Name a module the first time it is bound to a constant.
    ///
    /// Returns `false` if the module already had a name.
    pub(crate) fn assign_name(&self, name: &str) -> bool {
        let mut slot = self.name.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::from(name));
        true
    }

    #[inline]
    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    /// Classes and metaclasses.
    #[inline]
    pub fn is_class(&self) -> bool {
        !matches!(self.kind, ModuleKind::Module)
    }

    #[inline]
    pub fn is_metaclass(&self) -> bool {
        matches!(self.kind, ModuleKind::MetaClass { .. })
    }

    #[inline]
    pub fn superclass(&self) -> Option<&ModuleRef> {
        self.superclass.as_ref()
    }

    #[inline]
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    #[inline]
    pub fn chain(&self) -> &AncestorChain {
        &self.chain
    }

    #[inline]
    pub fn slots(&self) -> &InstanceSlots {
        &self.slots
    }

    /// The singleton class, if one has been created.
    #[inline]
    pub fn metaclass(&self) -> Option<ModuleRef> {
        self.metaclass.read().clone()
    }

    #[inline]
    pub(crate) fn metaclass_slot(&self) -> &RwLock<Option<ModuleRef>> {
        &self.metaclass
    }

    // =========================================================================
    // Constants
    // =========================================================================

    /// Constant defined directly on this module.
    #[inline]
    pub fn own_constant(&self, name: Symbol) -> Option<Value> {
        self.constants.read().get(&name).cloned()
    }

    #[inline]
    pub fn has_own_constant(&self, name: Symbol) -> bool {
        self.constants.read().contains_key(&name)
    }

    pub(crate) fn set_own_constant(&self, name: Symbol, value: Value) -> Option<Value> {
        self.constants.write().insert(name, value)
    }

    pub(crate) fn remove_own_constant(&self, name: Symbol) -> Option<Value> {
        self.constants.write().remove(&name)
    }

    /// Names of constants defined directly on this module, sorted by name.
    pub fn own_constant_names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.constants.read().keys().copied().collect();
        names.sort_by_key(|sym| sym.as_str());
        names
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.read().as_deref() {
            return f.write_str(name);
        }
        match &self.kind {
            ModuleKind::Module => write!(f, "#<Module:0x{:06x}>", self.id.raw()),
            ModuleKind::Class { .. } => write!(f, "#<Class:0x{:06x}>", self.id.raw()),
            ModuleKind::MetaClass { attached } => match attached.upgrade() {
                Some(value) => write!(f, "#<Class:{}>", value.inspect()),
                None => write!(f, "#<Class:0x{:06x}>", self.id.raw()),
            },
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.to_string())
            .field("kind", &self.kind)
            .field("methods", &self.methods.len())
            .field("chain", &self.chain.len())
            .finish()
    }
}

// =============================================================================
// Module Reference
// =============================================================================

/// Shared handle to a module. Equality and hashing are by identity.
#[derive(Clone)]
pub struct ModuleRef(Arc<Module>);

impl ModuleRef {
    #[inline]
    pub fn ptr_eq(&self, other: &ModuleRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> Weak<Module> {
        Arc::downgrade(&self.0)
    }

    #[inline]
    pub(crate) fn from_arc(inner: Arc<Module>) -> Self {
        ModuleRef(inner)
    }
}

impl Deref for ModuleRef {
    type Target = Module;

    #[inline]
    fn deref(&self) -> &Module {
        &self.0
    }
}

impl PartialEq for ModuleRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ModuleRef {}

impl Hash for ModuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleRef({})", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
