//! Method implementations.
//!
//! The object model treats a method implementation as an opaque callable
//! unit with one invocation contract (`Executable`), whether it is a
//! synthesized accessor, a native closure or a host primitive. A
//! `MethodHandle` is a shared reference to one; a `MethodEntry` is a handle
//! bound in a method table together with its visibility.
//!
//! Handle identity matters: an alias binds the *same* handle under a second
//! selector, so redefining the original later does not retarget the alias.

pub mod accessor;
pub mod native;
pub mod primitive;

pub use accessor::{AccessMode, AccessVariable, AccessorSynthesizer};
pub use native::{NativeFn, NativeMethod};
pub use primitive::{
    CURRENT_PROCESS, FfiSignature, FfiType, NoPrimitives, Primitive, PrimitiveFn, PrimitiveHost,
    PrimitiveRegistry,
};

use crate::space::ObjectSpace;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult, Symbol};

// =============================================================================
// Visibility
// =============================================================================

/// Who may call a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Callable only without an explicit receiver.
    Private,
}

// =============================================================================
// Arity
// =============================================================================

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    #[inline]
    pub fn accepts(self, given: usize) -> bool {
        match self {
            Arity::Exact(n) => given == n,
            Arity::AtLeast(n) => given >= n,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "{}+", n),
            Arity::Any => f.write_str("any"),
        }
    }
}

/// What backs a handle. Informational only; dispatch never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Accessor,
    Native,
    Primitive,
}

// =============================================================================
// Executable
// =============================================================================

/// The invocation contract every method implementation satisfies.
pub trait Executable: Send + Sync {
    /// Run the method. Arity has already been checked.
    fn invoke(&self, space: &ObjectSpace, receiver: &Value, args: &[Value]) -> StrataResult<Value>;

    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn kind(&self) -> MethodKind;

    /// A structurally identical but distinct implementation.
    fn duplicate(&self) -> Arc<dyn Executable>;
}

// =============================================================================
// Method Handle
// =============================================================================

/// Shared reference to a method implementation.
#[derive(Clone)]
pub struct MethodHandle(Arc<dyn Executable>);

impl MethodHandle {
    pub fn new(executable: impl Executable + 'static) -> Self {
        MethodHandle(Arc::new(executable))
    }

    /// Whether two handles refer to the same implementation.
    #[inline]
    pub fn ptr_eq(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A distinct copy of this implementation.
    pub fn dup(&self) -> MethodHandle {
        MethodHandle(self.0.duplicate())
    }

    #[inline]
    pub fn kind(&self) -> MethodKind {
        self.0.kind()
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.0.arity()
    }

    /// Check arity, then invoke.
    pub fn call(
        &self,
        space: &ObjectSpace,
        selector: Symbol,
        receiver: &Value,
        args: &[Value],
    ) -> StrataResult<Value> {
        let arity = self.0.arity();
        if !arity.accepts(args.len()) {
            return Err(StrataError::arity(
                selector.as_str(),
                arity.to_string(),
                args.len(),
            ));
        }
        self.0.invoke(space, receiver, args)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MethodHandle({:?}, arity={}, {:p})",
            self.0.kind(),
            self.0.arity(),
            Arc::as_ptr(&self.0) as *const ()
        )
    }
}

// =============================================================================
// Method Entry
// =============================================================================

/// A handle as bound in a method table.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub handle: MethodHandle,
    pub visibility: Visibility,
}

impl MethodEntry {
    #[inline]
    pub fn new(handle: MethodHandle, visibility: Visibility) -> Self {
        Self { handle, visibility }
    }

    #[inline]
    pub fn public(handle: MethodHandle) -> Self {
        Self::new(handle, Visibility::Public)
    }

    #[inline]
    pub fn private(handle: MethodHandle) -> Self {
        Self::new(handle, Visibility::Private)
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Same handle, different visibility.
    pub fn with_visibility(&self, visibility: Visibility) -> Self {
        Self::new(self.handle.clone(), visibility)
    }
}

// =============================================================================
// Tests
// =============================================================================
