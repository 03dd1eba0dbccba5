//! Host primitives bound with `attach_function`.
//!
//! The object model does not call native code itself. It asks a
//! `PrimitiveHost` for a named operation in a named library and binds the
//! result as a method handle. An absent operation surfaces as
//! `PrimitiveUnavailable`.

use crate::method::{Arity, Executable, MethodKind};
use crate::space::ObjectSpace;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult, Symbol};

/// Library name used when a module never called `ffi_lib`.
pub const CURRENT_PROCESS: &str = "current process";

/// A host-native operation.
pub type PrimitiveFn = Arc<dyn Fn(&[Value]) -> StrataResult<Value> + Send + Sync>;

// =============================================================================
// Primitive Host
// =============================================================================

/// Source of host-native operations.
pub trait PrimitiveHost: Send + Sync {
    fn lookup(&self, library: &str, name: &str) -> Option<PrimitiveFn>;
}

/// A host with no primitives at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrimitives;

impl PrimitiveHost for NoPrimitives {
    fn lookup(&self, _library: &str, _name: &str) -> Option<PrimitiveFn> {
        None
    }
}

/// An in-process table of primitives keyed by `(library, name)`.
#[derive(Default)]
pub struct PrimitiveRegistry {
    functions: RwLock<FxHashMap<(String, String), PrimitiveFn>>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, library: &str, name: &str, func: F)
    where
        F: Fn(&[Value]) -> StrataResult<Value> + Send + Sync + 'static,
    {
        self.functions
            .write()
            .insert((library.to_string(), name.to_string()), Arc::new(func));
    }

    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }
}

impl PrimitiveHost for PrimitiveRegistry {
    fn lookup(&self, library: &str, name: &str) -> Option<PrimitiveFn> {
        self.functions
            .read()
            .get(&(library.to_string(), name.to_string()))
            .cloned()
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// Argument and return types a primitive is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    Void,
    Int,
    Bool,
    String,
    /// Any value, passed through unchecked.
    Pointer,
}

impl FfiType {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FfiType::Void => value.is_nil(),
            FfiType::Int => matches!(value, Value::Int(_)),
            FfiType::Bool => matches!(value, Value::Bool(_)),
            FfiType::String => matches!(value, Value::Str(_)),
            FfiType::Pointer => true,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FfiType::Void => "void",
            FfiType::Int => "int",
            FfiType::Bool => "bool",
            FfiType::String => "string",
            FfiType::Pointer => "pointer",
        }
    }
}

/// Declared signature of a primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiSignature {
    pub args: SmallVec<[FfiType; 4]>,
    pub ret: FfiType,
}

impl FfiSignature {
    pub fn new(args: &[FfiType], ret: FfiType) -> Self {
        Self {
            args: args.iter().copied().collect(),
            ret,
        }
    }
}

// =============================================================================
// Primitive
// =============================================================================

/// A method handle that bottoms out in a host primitive.
#[derive(Clone)]
pub struct Primitive {
    name: Symbol,
    library: Arc<str>,
    signature: FfiSignature,
    func: PrimitiveFn,
}

impl Primitive {
    pub fn new(name: Symbol, library: &str, signature: FfiSignature, func: PrimitiveFn) -> Self {
        Self {
            name,
            library: Arc::from(library),
            signature,
            func,
        }
    }

    #[inline]
    pub fn name(&self) -> Symbol {
        self.name
    }

    #[inline]
    pub fn library(&self) -> &str {
        &self.library
    }

    #[inline]
    pub fn signature(&self) -> &FfiSignature {
        &self.signature
    }
}

impl Executable for Primitive {
    fn invoke(&self, _space: &ObjectSpace, _receiver: &Value, args: &[Value]) -> StrataResult<Value> {
        for (ty, arg) in self.signature.args.iter().zip(args) {
            if !ty.accepts(arg) {
                return Err(StrataError::wrong_argument_type(arg.type_name(), ty.as_str()));
            }
        }

        let result = (self.func)(args)?;
        if self.signature.ret == FfiType::Void {
            Ok(Value::Nil)
        } else {
            Ok(result)
        }
    }

    fn arity(&self) -> Arity {
        Arity::Exact(self.signature.args.len())
    }

    fn kind(&self) -> MethodKind {
        MethodKind::Primitive
    }

    fn duplicate(&self) -> Arc<dyn Executable> {
        Arc::new(self.clone())
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("library", &self.library)
            .field("signature", &self.signature)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::intern;

    #[test]
    fn test_no_primitives() {
        assert!(NoPrimitives.lookup("libc", "getpid").is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = PrimitiveRegistry::new();
        registry.register("libm", "abs", |args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0).abs()))
        });
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("libm", "abs").is_some());
        assert!(registry.lookup("libc", "abs").is_none());
    }

    #[test]
    fn test_type_checks() {
        assert!(FfiType::Int.accepts(&Value::Int(1)));
        assert!(!FfiType::Int.accepts(&Value::string("1")));
        assert!(FfiType::Pointer.accepts(&Value::Nil));
    }

    #[test]
    fn test_invoke_checks_argument_types() {
        let space = ObjectSpace::new();
        let func: PrimitiveFn = Arc::new(|args| Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2)));
        let prim = Primitive::new(
            intern("double"),
            "libtest",
            FfiSignature::new(&[FfiType::Int], FfiType::Int),
            func,
        );

        assert_eq!(prim.arity(), Arity::Exact(1));
        assert_eq!(
            prim.invoke(&space, &Value::Nil, &[Value::Int(4)]).unwrap(),
            Value::Int(8)
        );
        let err = prim
            .invoke(&space, &Value::Nil, &[Value::string("4")])
            .unwrap_err();
        assert_eq!(err.to_string(), "wrong argument type String (expected int)");
    }

    #[test]
    fn test_void_return_is_nil() {
        let space = ObjectSpace::new();
        let func: PrimitiveFn = Arc::new(|_| Ok(Value::Int(99)));
        let prim = Primitive::new(
            intern("flush"),
            CURRENT_PROCESS,
            FfiSignature::new(&[], FfiType::Void),
            func,
        );
        assert_eq!(prim.invoke(&space, &Value::Nil, &[]).unwrap(), Value::Nil);
    }
}
