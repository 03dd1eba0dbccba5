//! Method dispatch.
//!
//! - **Resolution**: `MethodResolver` walks the ancestor chain of the
//!   receiver's dispatch class and returns the first binding.
//! - **Caching**: `MethodCache` memoizes hits and misses per
//!   `(module, selector)`, validated against a space-wide `TopologyVersion`.
//! - **Invocation**: `call_method` applies visibility, arity and
//!   `method_missing` rules on top of resolution.
//!
//! ```text
//! send(receiver, selector)
//!   └─► dispatch_class(receiver)          (singleton class first, if any)
//!         └─► MethodCache (module, selector, version)
//!               └─► chain walk on miss ─► cache result
//!                     └─► handle.call / method_missing / NoMethod
//! ```

pub mod call_method;
pub mod method_cache;
pub mod resolver;

pub use call_method::{CallKind, call_method, respond_to};
pub use method_cache::{CacheState, CacheStats, MethodCache, TopologyVersion};
pub use resolver::{MethodResolver, ResolvedMethod};
