//! Dynamic object model for the Strata runtime.
//!
//! This crate provides:
//! - Modules, classes and per-object metaclasses (`object`)
//! - Method tables and ancestor chains with mixin flattening
//! - Method handles: synthesized accessors, native methods, host primitives (`method`)
//! - Method resolution with a version-invalidated cache (`dispatch`)
//! - The object space: bootstrap hierarchy, `include`, `alias_method`,
//!   `module_function`, `attr_*`, constants and dispatch entry points (`space`)
//! - Runtime configuration (`config`)
//!
//! # Example
//!
//! ```
//! use strata_runtime::{ObjectSpace, Value};
//!
//! let space = ObjectSpace::new();
//! let point = space.define_class("Point", None).unwrap();
//! space.attr_accessor(&point, &["x"]).unwrap();
//!
//! let p = space.new_instance(&point, &[]).unwrap();
//! space.send(&p, "x=", &[Value::Int(3)]).unwrap();
//! assert_eq!(space.send(&p, "x", &[]).unwrap(), Value::Int(3));
//! ```

pub mod builtins;
pub mod config;
pub mod dispatch;
pub mod method;
pub mod object;
pub mod space;
pub mod value;

// Re-export commonly used items
pub use config::SpaceConfig;
pub use dispatch::{CacheStats, MethodResolver, ResolvedMethod};
pub use method::{Arity, Executable, MethodEntry, MethodHandle, MethodKind, Visibility};
pub use object::{IncludedModule, ModuleId, ModuleKind, ModuleRef, ObjectRef};
pub use space::{DefinitionScope, ModuleBody, ObjectSpace};
pub use value::Value;

pub use strata_core::{ErrorKind, StrataError, StrataResult, Symbol, intern};
