//! The object space.
//!
//! An `ObjectSpace` owns everything one runtime instance needs to evaluate
//! the object model: the bootstrap class hierarchy, the method resolver and
//! its cache, the configuration, the host primitive source and the lock that
//! serializes structural mutation.
//!
//! # Concurrency
//!
//! Lookups and sends run in parallel from any number of threads. Structural
//! mutations (definition, include, extend, alias, visibility changes) take a
//! re-entrant exclusive section, so an inclusion hook that itself includes
//! modules on the same thread does not deadlock, while a mutation from
//! another thread waits until the outer one finishes.
//!
//! The operations are split by concern:
//! - `definition`: defining modules, classes and methods; `ModuleBody`
//! - `include`: `include`, `append_features`, `extend`
//! - `constants`: constant tables
//! - `ffi`: `ffi_lib` and `attach_function`

mod constants;
mod definition;
mod ffi;
mod include;

pub use definition::{DefinitionScope, ModuleBody};

use crate::builtins;
use crate::config::SpaceConfig;
use crate::dispatch::{CacheStats, CallKind, MethodResolver, ResolvedMethod, TopologyVersion};
use crate::dispatch::{call_method, respond_to};
use crate::method::accessor::slots_of;
use crate::method::{MethodEntry, MethodHandle, NoPrimitives, PrimitiveHost};
use crate::object::{
    AllocationPolicy, Attached, Instance, Module, ModuleKind, ModuleRef, ancestors,
};
use crate::value::Value;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::fmt;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult, Symbol, intern};

// =============================================================================
// Core Classes
// =============================================================================

/// Classes created at bootstrap.
#[derive(Debug, Clone)]
pub struct CoreClasses {
    /// The root class.
    pub object: ModuleRef,
    /// Class of every module; holds the hook builtins.
    pub module: ModuleRef,
    /// Class of every class. Subclass of `Module`.
    pub class: ModuleRef,
    /// Class of `nil`.
    pub nil_class: ModuleRef,
    pub true_class: ModuleRef,
    pub false_class: ModuleRef,
    /// Class of immediate integers. Has no singleton class.
    pub integer: ModuleRef,
    pub string: ModuleRef,
    /// Class of interned symbols. Has no singleton class.
    pub symbol: ModuleRef,
}

impl CoreClasses {
    fn bootstrap(version: &TopologyVersion) -> Self {
        let class = |name: &str, superclass: Option<&ModuleRef>, allocation| {
            Module::new(
                Some(name),
                ModuleKind::Class { allocation },
                superclass.cloned(),
                version,
            )
        };

        let object = class("Object", None, AllocationPolicy::Instances);
        let module = class("Module", Some(&object), AllocationPolicy::Forbidden);
        let class_class = class("Class", Some(&module), AllocationPolicy::Forbidden);
        let value_class = |name: &str| class(name, Some(&object), AllocationPolicy::Forbidden);

        Self {
            nil_class: value_class("NilClass"),
            true_class: value_class("TrueClass"),
            false_class: value_class("FalseClass"),
            integer: value_class("Integer"),
            string: value_class("String"),
            symbol: value_class("Symbol"),
            object,
            module,
            class: class_class,
        }
    }

    fn all(&self) -> [&ModuleRef; 9] {
        [
            &self.object,
            &self.module,
            &self.class,
            &self.nil_class,
            &self.true_class,
            &self.false_class,
            &self.integer,
            &self.string,
            &self.symbol,
        ]
    }
}

// =============================================================================
// Object Space
// =============================================================================

/// One runtime's object model.
pub struct ObjectSpace {
    config: SpaceConfig,
    version: TopologyVersion,
    resolver: MethodResolver,
    core: CoreClasses,
    primitives: Arc<dyn PrimitiveHost>,
    mutation: ReentrantMutex<()>,
}

impl ObjectSpace {
    /// A space with default configuration and no host primitives.
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    /// A space configured from `STRATA_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_config(SpaceConfig::from_env())
    }

    pub fn with_config(config: SpaceConfig) -> Self {
        Self::with_primitives(config, Arc::new(NoPrimitives))
    }

    /// A space whose `attach_function` binds from `primitives`.
    pub fn with_primitives(config: SpaceConfig, primitives: Arc<dyn PrimitiveHost>) -> Self {
        let version = TopologyVersion::new();
        let resolver = MethodResolver::new(&config, version.clone());
        let core = CoreClasses::bootstrap(&version);

        let space = Self {
            config,
            version,
            resolver,
            core,
            primitives,
            mutation: ReentrantMutex::new(()),
        };

        for class in space.core.all() {
            if let Some(name) = class.name() {
                space
                    .core
                    .object
                    .set_own_constant(intern(&name), Value::Module(class.clone()));
            }
        }
        builtins::install(&space);

        tracing::debug!(
            method_cache = space.config.method_cache,
            cache_capacity = space.config.cache_capacity,
            "object space ready"
        );
        space
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    #[inline]
    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    #[inline]
    pub fn object_class(&self) -> &ModuleRef {
        &self.core.object
    }

    #[inline]
    pub fn module_class(&self) -> &ModuleRef {
        &self.core.module
    }

    #[inline]
    pub fn class_class(&self) -> &ModuleRef {
        &self.core.class
    }

    #[inline]
    pub fn resolver(&self) -> &MethodResolver {
        &self.resolver
    }

    /// Current topology version. Advances on every structural mutation.
    #[inline]
    pub fn topology_version(&self) -> u64 {
        self.version.current()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.stats()
    }

    #[inline]
    pub(crate) fn primitives(&self) -> &dyn PrimitiveHost {
        self.primitives.as_ref()
    }

    /// Enter the structural mutation section.
    #[inline]
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutation.lock()
    }

    // =========================================================================
    // Classes of Values
    // =========================================================================

    /// The nominal class of a value, ignoring singleton classes.
    pub fn class_of(&self, value: &Value) -> ModuleRef {
        let core = &self.core;
        match value {
            Value::Nil => core.nil_class.clone(),
            Value::Bool(true) => core.true_class.clone(),
            Value::Bool(false) => core.false_class.clone(),
            Value::Int(_) => core.integer.clone(),
            Value::Str(_) => core.string.clone(),
            Value::Symbol(_) => core.symbol.clone(),
            Value::Object(object) => object.class().clone(),
            Value::Module(module) if module.is_class() => core.class.clone(),
            Value::Module(_) => core.module.clone(),
        }
    }

    /// The class lookup starts at: the singleton class when one exists.
    ///
    /// A class without its own singleton class dispatches through the nearest
    /// superclass that has one, which walks the same path its own singleton
    /// class would.
    pub fn dispatch_class(&self, value: &Value) -> ModuleRef {
        match value {
            Value::Object(object) => object
                .singleton()
                .unwrap_or_else(|| object.class().clone()),
            Value::Module(module) => {
                if let Some(meta) = module.metaclass() {
                    return meta;
                }
                if module.is_class() && !module.is_metaclass() {
                    if let Some(meta) = module.superclasses().find_map(|s| s.metaclass()) {
                        return meta;
                    }
                }
                self.class_of(value)
            }
            _ => self.class_of(value),
        }
    }

    /// The singleton class of a value, created on first use.
    ///
    /// Superclass of a new singleton class:
    /// - instance → its class
    /// - plain module → `Module`
    /// - class `C < S` → singleton class of `S`
    /// - root class or singleton class → `Class`
    pub fn singleton_class(&self, value: &Value) -> StrataResult<ModuleRef> {
        match value {
            Value::Object(object) => {
                if let Some(existing) = object.singleton() {
                    return Ok(existing);
                }
                let _guard = self.lock();
                let mut slot = object.singleton_slot().write();
                if let Some(existing) = slot.as_ref() {
                    return Ok(existing.clone());
                }
                let meta = Module::new(
                    None,
                    ModuleKind::MetaClass {
                        attached: Attached::object(object),
                    },
                    Some(object.class().clone()),
                    &self.version,
                );
                *slot = Some(meta.clone());
                Ok(meta)
            }
            Value::Module(module) => {
                if let Some(existing) = module.metaclass() {
                    return Ok(existing);
                }
                let _guard = self.lock();
                let superclass = match module.kind() {
                    ModuleKind::Module => self.core.module.clone(),
                    ModuleKind::MetaClass { .. } => self.core.class.clone(),
                    ModuleKind::Class { .. } => match module.superclass() {
                        Some(parent) => self.singleton_class(&Value::Module(parent.clone()))?,
                        None => self.core.class.clone(),
                    },
                };
                let mut slot = module.metaclass_slot().write();
                if let Some(existing) = slot.as_ref() {
                    return Ok(existing.clone());
                }
                let meta = Module::new(
                    None,
                    ModuleKind::MetaClass {
                        attached: Attached::module(module),
                    },
                    Some(superclass),
                    &self.version,
                );
                *slot = Some(meta.clone());
                Ok(meta)
            }
            other => Err(StrataError::type_mismatch(format!(
                "can't define singleton for {}",
                other.describe()
            ))),
        }
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Allocate an uninitialized instance of `class`.
    pub fn allocate(&self, class: &ModuleRef) -> StrataResult<Value> {
        match class.kind() {
            ModuleKind::Class {
                allocation: AllocationPolicy::Instances,
            } => Ok(Value::Object(Instance::allocate(class))),
            ModuleKind::Class {
                allocation: AllocationPolicy::Forbidden,
            } => Err(StrataError::allocation(format!(
                "allocator undefined for {}",
                class
            ))),
            ModuleKind::MetaClass { .. } => Err(StrataError::allocation(
                "can't create instance of singleton class",
            )),
            ModuleKind::Module => Err(StrataError::allocation(format!(
                "can't instantiate module {}",
                class
            ))),
        }
    }

    /// Allocate, then run `initialize` with `args`.
    pub fn new_instance(&self, class: &ModuleRef, args: &[Value]) -> StrataResult<Value> {
        let instance = self.allocate(class)?;
        let initialize = intern("initialize");
        match self.resolve(class, initialize) {
            Some(found) => {
                found.handle().call(self, initialize, &instance, args)?;
            }
            None if !args.is_empty() => {
                return Err(StrataError::arity("initialize", "0", args.len()));
            }
            None => {}
        }
        Ok(instance)
    }

    pub fn instance_variable_get(&self, value: &Value, name: impl Into<Symbol>) -> StrataResult<Value> {
        let name = ivar_name(name.into())?;
        Ok(slots_of(value)?.get(name).unwrap_or_default())
    }

    pub fn instance_variable_set(
        &self,
        value: &Value,
        name: impl Into<Symbol>,
        new_value: Value,
    ) -> StrataResult<Value> {
        let name = ivar_name(name.into())?;
        slots_of(value)?.set(name, new_value.clone());
        Ok(new_value)
    }

    // =========================================================================
    // Resolution and Dispatch
    // =========================================================================

    /// Resolve `selector` starting at `module`.
    #[inline]
    pub fn resolve(&self, module: &ModuleRef, selector: impl Into<Symbol>) -> Option<ResolvedMethod> {
        self.resolver.resolve(module, selector.into())
    }

    /// Explicit-receiver send. Private methods are rejected.
    pub fn send(
        &self,
        receiver: &Value,
        selector: impl Into<Symbol>,
        args: &[Value],
    ) -> StrataResult<Value> {
        call_method(self, receiver, selector.into(), args, CallKind::Explicit)
    }

    /// Receiver-less send. Private methods are allowed.
    pub fn call(
        &self,
        receiver: &Value,
        selector: impl Into<Symbol>,
        args: &[Value],
    ) -> StrataResult<Value> {
        call_method(self, receiver, selector.into(), args, CallKind::Functional)
    }

    pub fn respond_to(
        &self,
        receiver: &Value,
        selector: impl Into<Symbol>,
        include_private: bool,
    ) -> bool {
        respond_to(self, receiver, selector.into(), include_private)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The linearized lookup path of `module`, starting with itself.
    pub fn ancestors(&self, module: &ModuleRef) -> Vec<ModuleRef> {
        ancestors(module)
    }

    /// The plain modules on the lookup path of `module`.
    pub fn included_modules(&self, module: &ModuleRef) -> Vec<ModuleRef> {
        ancestors(module)
            .into_iter()
            .filter(|m| !m.is_class())
            .collect()
    }

    /// Bind `handle` as a public singleton method of `value`.
    pub fn define_singleton_method(
        &self,
        value: &Value,
        selector: impl Into<Symbol>,
        handle: MethodHandle,
    ) -> StrataResult<ModuleRef> {
        let _guard = self.lock();
        let meta = self.singleton_class(value)?;
        meta.methods()
            .define(selector.into(), MethodEntry::public(handle));
        Ok(meta)
    }
}

impl Default for ObjectSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpace")
            .field("config", &self.config)
            .field("version", &self.version.current())
            .field("cache", &self.resolver.stats())
            .finish()
    }
}

/// Instance variable names carry the `@` sigil.
fn ivar_name(name: Symbol) -> StrataResult<Symbol> {
    let text = name.as_str();
    if text.len() > 1 && text.starts_with('@') {
        Ok(name)
    } else {
        Err(StrataError::name(
            text,
            format!("`{}' is not allowed as an instance variable name", text),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
