//! Instances and instance slots.
//!
//! An `Instance` is allocated by a class and stores named slots (`@name`).
//! Slot storage is a plain hash map; accessors address slots by symbol.

use crate::object::module::ModuleRef;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use strata_core::Symbol;

/// Global counter for object identities.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn allocate() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

// =============================================================================
// Instance Slots
// =============================================================================

/// Named instance slots, shared by instances and modules.
#[derive(Debug, Default)]
pub struct InstanceSlots {
    slots: RwLock<FxHashMap<Symbol, Value>>,
}

impl InstanceSlots {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: Symbol) -> Option<Value> {
        self.slots.read().get(&name).cloned()
    }

    /// Set a slot, returning the previous value.
    #[inline]
    pub fn set(&self, name: Symbol, value: Value) -> Option<Value> {
        self.slots.write().insert(name, value)
    }

    #[inline]
    pub fn remove(&self, name: Symbol) -> Option<Value> {
        self.slots.write().remove(&name)
    }

    #[inline]
    pub fn contains(&self, name: Symbol) -> bool {
        self.slots.read().contains_key(&name)
    }

    /// Slot names, sorted.
    pub fn names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.slots.read().keys().copied().collect();
        names.sort_by_key(|sym| sym.as_str());
        names
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

// =============================================================================
// Instance
// =============================================================================

/// An instance of a class.
pub struct Instance {
    id: ObjectId,
    class: ModuleRef,
    slots: InstanceSlots,
    singleton: RwLock<Option<ModuleRef>>,
}

impl Instance {
    pub(crate) fn allocate(class: &ModuleRef) -> ObjectRef {
        ObjectRef(Arc::new(Instance {
            id: ObjectId::allocate(),
            class: class.clone(),
            slots: InstanceSlots::new(),
            singleton: RwLock::new(None),
        }))
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The class this instance was allocated by.
    #[inline]
    pub fn class(&self) -> &ModuleRef {
        &self.class
    }

    #[inline]
    pub fn slots(&self) -> &InstanceSlots {
        &self.slots
    }

    /// The singleton class, if one has been created.
    #[inline]
    pub fn singleton(&self) -> Option<ModuleRef> {
        self.singleton.read().clone()
    }

    #[inline]
    pub(crate) fn singleton_slot(&self) -> &RwLock<Option<ModuleRef>> {
        &self.singleton
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("class", &self.class.to_string())
            .field("slots", &self.slots.len())
            .finish()
    }
}

// =============================================================================
// Object Reference
// =============================================================================

/// Shared handle to an instance. Equality and hashing are by identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Instance>);

impl ObjectRef {
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> Weak<Instance> {
        Arc::downgrade(&self.0)
    }

    #[inline]
    pub(crate) fn from_arc(inner: Arc<Instance>) -> Self {
        ObjectRef(inner)
    }
}

impl Deref for ObjectRef {
    type Target = Instance;

    #[inline]
    fn deref(&self) -> &Instance {
        &self.0
    }
}

impl PartialEq for ObjectRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.0.class)
    }
}

// =============================================================================
// Tests
// =============================================================================
