//! Metaclass attachment.
//!
//! A metaclass wraps exactly one attached instance: the object or module it
//! holds singleton methods for. The owner keeps the metaclass alive through a
//! strong reference, so the back-reference is weak to avoid a cycle.

use crate::object::instance::{Instance, ObjectRef};
use crate::object::module::{Module, ModuleKind, ModuleRef};
use crate::value::Value;
use std::fmt;
use std::sync::Weak;

/// Weak back-reference from a metaclass to its attached instance.
#[derive(Clone)]
pub enum Attached {
    Module(Weak<Module>),
    Object(Weak<Instance>),
}

impl Attached {
    pub(crate) fn module(module: &ModuleRef) -> Self {
        Attached::Module(module.downgrade())
    }

    pub(crate) fn object(object: &ObjectRef) -> Self {
        Attached::Object(object.downgrade())
    }

    /// The attached instance, if it is still alive.
    pub fn upgrade(&self) -> Option<Value> {
        match self {
            Attached::Module(weak) => weak.upgrade().map(|m| Value::Module(ModuleRef::from_arc(m))),
            Attached::Object(weak) => weak.upgrade().map(|o| Value::Object(ObjectRef::from_arc(o))),
        }
    }
}

impl fmt::Debug for Attached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attached::Module(_) => f.write_str("Attached::Module"),
            Attached::Object(_) => f.write_str("Attached::Object"),
        }
    }
}

impl Module {
    /// The instance a metaclass is attached to; `None` for other modules.
    pub fn attached_instance(&self) -> Option<Value> {
        match self.kind() {
            ModuleKind::MetaClass { attached } => attached.upgrade(),
            _ => None,
        }
    }
}
