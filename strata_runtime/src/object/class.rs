//! Class-specific behavior layered over `Module`.
//!
//! A class is a module with exactly one superclass link (absent only for the
//! root) and an allocation policy that subclasses inherit.

use crate::object::module::{Module, ModuleKind, ModuleRef};

// =============================================================================
// Allocation Policy
// =============================================================================

/// How a class allocates instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationPolicy {
    /// Plain instances with an empty slot table.
    #[default]
    Instances,
    /// No allocator: values of this class are created by the runtime only
    /// (integers, strings, modules).
    Forbidden,
}

impl Module {
    /// Allocation policy of a class; `None` for plain modules and metaclasses.
    pub fn allocation_policy(&self) -> Option<AllocationPolicy> {
        match self.kind() {
            ModuleKind::Class { allocation } => Some(*allocation),
            _ => None,
        }
    }

    /// Superclasses from the nearest to the root, excluding `self`.
    pub fn superclasses(&self) -> Superclasses {
        Superclasses {
            next: self.superclass().cloned(),
        }
    }

    /// Whether `other` is `self` or one of its superclasses.
    pub fn inherits_from(&self, other: &ModuleRef) -> bool {
        if self.id() == other.id() {
            return true;
        }
        self.superclasses().any(|s| s == *other)
    }
}

/// Iterator over a superclass chain.
pub struct Superclasses {
    next: Option<ModuleRef>,
}

impl Iterator for Superclasses {
    type Item = ModuleRef;

    fn next(&mut self) -> Option<ModuleRef> {
        let current = self.next.take()?;
        self.next = current.superclass().cloned();
        Some(current)
    }
}

// =============================================================================
// Tests
// =============================================================================
