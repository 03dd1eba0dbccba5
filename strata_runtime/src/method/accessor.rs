//! Synthesized instance-slot accessors.
//!
//! `attr_reader :x` does not compile a method body. It binds an
//! `AccessVariable` that reads slot `@x` on the receiver; `attr_writer :x`
//! binds one that writes it under the selector `x=`. Accessors are stateless
//! and structurally identical across classes, but every class gets its own
//! handle.

use crate::method::{Arity, Executable, MethodHandle, MethodKind};
use crate::object::InstanceSlots;
use crate::space::ObjectSpace;
use crate::value::Value;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult, Symbol};

/// Whether an accessor reads or writes its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

// =============================================================================
// Access Variable
// =============================================================================

/// A method implementation bound to one instance slot.
#[derive(Debug, Clone)]
pub struct AccessVariable {
    slot: Symbol,
    mode: AccessMode,
}

impl AccessVariable {
    /// Reader for slot `@name`.
    pub fn get_ivar(slot: Symbol) -> Self {
        Self {
            slot: slot.ivar(),
            mode: AccessMode::Read,
        }
    }

    /// Writer for slot `@name`.
    pub fn set_ivar(slot: Symbol) -> Self {
        Self {
            slot: slot.ivar(),
            mode: AccessMode::Write,
        }
    }

    #[inline]
    pub fn slot(&self) -> Symbol {
        self.slot
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

/// Slot storage of a receiver. Only instances and modules have slots.
pub(crate) fn slots_of(receiver: &Value) -> StrataResult<&InstanceSlots> {
    match receiver {
        Value::Object(object) => Ok(object.slots()),
        Value::Module(module) => Ok(module.slots()),
        other => Err(StrataError::type_mismatch(format!(
            "can't access instance variables of {}",
            other.describe()
        ))),
    }
}

impl Executable for AccessVariable {
    fn invoke(&self, _space: &ObjectSpace, receiver: &Value, args: &[Value]) -> StrataResult<Value> {
        let slots = slots_of(receiver)?;
        match self.mode {
            AccessMode::Read => Ok(slots.get(self.slot).unwrap_or_default()),
            AccessMode::Write => {
                let value = args.first().cloned().unwrap_or_default();
                slots.set(self.slot, value.clone());
                Ok(value)
            }
        }
    }

    fn arity(&self) -> Arity {
        match self.mode {
            AccessMode::Read => Arity::Exact(0),
            AccessMode::Write => Arity::Exact(1),
        }
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Accessor
    }

    fn duplicate(&self) -> Arc<dyn Executable> {
        Arc::new(self.clone())
    }
}

// =============================================================================
// Accessor Synthesizer
// =============================================================================

/// Builds accessor handles and the selectors they are bound under.
pub struct AccessorSynthesizer;

impl AccessorSynthesizer {
    /// `(name, reader of @name)`.
    pub fn reader(name: Symbol) -> (Symbol, MethodHandle) {
        (name, MethodHandle::new(AccessVariable::get_ivar(name)))
    }

    /// `(name=, writer of @name)`.
    pub fn writer(name: Symbol) -> (Symbol, MethodHandle) {
        (name.setter(), MethodHandle::new(AccessVariable::set_ivar(name)))
    }
}

// =============================================================================
// Tests
// =============================================================================
