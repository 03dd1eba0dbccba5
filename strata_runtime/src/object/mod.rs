//! Object model data structures.
//!
//! Modules, classes and metaclasses share one representation (`Module`)
//! distinguished by `ModuleKind`. They are shared through `ModuleRef`, a
//! reference-counted handle whose equality is identity, so "is this module
//! already an ancestor?" is a pointer comparison and never a deep one.
//!
//! ```text
//! ModuleRef ──► Module
//!               ├── id: ModuleId            (cache key, never reused)
//!               ├── kind: Module | Class | MetaClass
//!               ├── superclass: Option<ModuleRef>
//!               ├── methods: MethodTable     (exclusively owned)
//!               ├── chain: AncestorChain     (IncludedModule proxies)
//!               ├── constants
//!               └── metaclass: Option<ModuleRef> (created lazily)
//! ```

pub mod chain;
pub mod class;
pub mod instance;
pub mod metaclass;
pub mod method_table;
pub mod module;

pub use chain::{AncestorChain, AncestorEntry, IncludedModule, ancestors, search, walk};
pub use class::AllocationPolicy;
pub use instance::{Instance, InstanceSlots, ObjectId, ObjectRef};
pub use metaclass::Attached;
pub use method_table::MethodTable;
pub use module::{Module, ModuleId, ModuleKind, ModuleRef};
