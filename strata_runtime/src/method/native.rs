//! Native methods backed by Rust closures.
//!
//! Built-in module methods and embedder-defined methods are closures over
//! `(space, receiver, args)`.

use crate::method::{Arity, Executable, MethodHandle, MethodKind};
use crate::space::ObjectSpace;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use strata_core::{StrataResult, Symbol};

/// Signature of a native method body.
pub type NativeFn = dyn Fn(&ObjectSpace, &Value, &[Value]) -> StrataResult<Value> + Send + Sync;

/// A method implemented by a Rust closure.
#[derive(Clone)]
pub struct NativeMethod {
    name: Symbol,
    arity: Arity,
    func: Arc<NativeFn>,
}

impl NativeMethod {
    pub fn new<F>(name: impl Into<Symbol>, arity: Arity, func: F) -> Self
    where
        F: Fn(&ObjectSpace, &Value, &[Value]) -> StrataResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    #[inline]
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn into_handle(self) -> MethodHandle {
        MethodHandle::new(self)
    }
}

impl Executable for NativeMethod {
    fn invoke(&self, space: &ObjectSpace, receiver: &Value, args: &[Value]) -> StrataResult<Value> {
        (self.func)(space, receiver, args)
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Native
    }

    fn duplicate(&self) -> Arc<dyn Executable> {
        Arc::new(self.clone())
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
