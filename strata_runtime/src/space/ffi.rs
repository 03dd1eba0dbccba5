//! Binding host primitives as singleton methods.

use crate::method::{CURRENT_PROCESS, FfiSignature, MethodEntry, MethodHandle, Primitive};
use crate::object::ModuleRef;
use crate::space::ObjectSpace;
use crate::value::Value;
use strata_core::{StrataError, StrataResult, intern};

/// Slot holding the library a module binds primitives from.
const FFI_LIB_SLOT: &str = "@ffi_lib";

impl ObjectSpace {
    /// Set the library later `attach_function` calls on `module` bind from.
    pub fn ffi_lib(&self, module: &ModuleRef, library: &str) {
        module
            .slots()
            .set(intern(FFI_LIB_SLOT), Value::string(library));
    }

    /// The library `module` binds from; the current process by default.
    pub fn ffi_library(&self, module: &ModuleRef) -> String {
        module
            .slots()
            .get(intern(FFI_LIB_SLOT))
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| CURRENT_PROCESS.to_string())
    }

    /// Bind host operation `name` as a public singleton method of `module`.
    ///
    /// The method is bound under `alias` when given, else under `name`.
    pub fn attach_function(
        &self,
        module: &ModuleRef,
        name: &str,
        alias: Option<&str>,
        signature: FfiSignature,
    ) -> StrataResult<MethodHandle> {
        let library = self.ffi_library(module);
        let func = self
            .primitives()
            .lookup(&library, name)
            .ok_or_else(|| StrataError::primitive_unavailable(name, library.as_str()))?;

        let selector = intern(alias.unwrap_or(name));
        let handle = MethodHandle::new(Primitive::new(selector, &library, signature, func));

        let _guard = self.lock();
        let meta = self.singleton_class(&Value::Module(module.clone()))?;
        meta.methods()
            .define(selector, MethodEntry::public(handle.clone()));

        tracing::debug!(
            module = %module,
            function = name,
            selector = %selector,
            library = %library,
            "function attached"
        );
        Ok(handle)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpaceConfig;
    use crate::method::{FfiType, PrimitiveRegistry};
    use std::sync::Arc;

    fn space_with_libm() -> ObjectSpace {
        let registry = PrimitiveRegistry::new();
        registry.register("libm", "labs", |args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0).abs()))
        });
        ObjectSpace::with_primitives(SpaceConfig::default(), Arc::new(registry))
    }

    #[test]
    fn test_default_library() {
        let space = ObjectSpace::new();
        let m = space.define_module("Native").unwrap();
        assert_eq!(space.ffi_library(&m), CURRENT_PROCESS);
        space.ffi_lib(&m, "libm");
        assert_eq!(space.ffi_library(&m), "libm");
    }

    #[test]
    fn test_attach_and_call() {
        let space = space_with_libm();
        let m = space.define_module("LibM").unwrap();
        space.ffi_lib(&m, "libm");
        space
            .attach_function(
                &m,
                "labs",
                Some("abs"),
                FfiSignature::new(&[FfiType::Int], FfiType::Int),
            )
            .unwrap();

        let receiver = Value::Module(m.clone());
        assert_eq!(
            space.send(&receiver, "abs", &[Value::Int(-4)]).unwrap(),
            Value::Int(4)
        );
        assert!(space.resolve(&m, "abs").is_none());
    }

    #[test]
    fn test_missing_function() {
        let space = space_with_libm();
        let m = space.define_module("Broken").unwrap();
        let err = space
            .attach_function(&m, "labs", None, FfiSignature::new(&[FfiType::Int], FfiType::Int))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 'labs' not found in [current process]"
        );
        assert!(m.metaclass().is_none());
    }
}
