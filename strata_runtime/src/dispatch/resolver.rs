//! Selector resolution along the ancestor chain.
//!
//! Resolution walks the lookup path of a module (own table, then included
//! modules most recent first, then each superclass the same way) and stops at
//! the first table that binds the selector. Results, including misses, go
//! through the `MethodCache` when it is enabled.

use crate::config::SpaceConfig;
use crate::dispatch::method_cache::{CacheState, CacheStats, MethodCache, TopologyVersion};
use crate::method::{MethodEntry, MethodHandle, Visibility};
use crate::object::{ModuleRef, search};
use strata_core::Symbol;
use tracing::trace;

// =============================================================================
// Resolved Method
// =============================================================================

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    /// The binding that was found.
    pub entry: MethodEntry,
    /// The module whose table holds the binding.
    pub owner: ModuleRef,
    /// Position of `owner` on the lookup path (0 = the starting module).
    pub depth: usize,
}

impl ResolvedMethod {
    #[inline]
    pub fn handle(&self) -> &MethodHandle {
        &self.entry.handle
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.entry.visibility
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.entry.is_private()
    }
}

// =============================================================================
// Method Resolver
// =============================================================================

/// Resolves selectors for one object space.
pub struct MethodResolver {
    cache: Option<MethodCache>,
    version: TopologyVersion,
    trace_dispatch: bool,
}

impl MethodResolver {
    pub fn new(config: &SpaceConfig, version: TopologyVersion) -> Self {
        Self {
            cache: config
                .method_cache
                .then(|| MethodCache::new(config.cache_capacity)),
            version,
            trace_dispatch: config.trace_dispatch,
        }
    }

    /// The topology version this resolver validates cache entries against.
    #[inline]
    pub fn version(&self) -> &TopologyVersion {
        &self.version
    }

    /// Resolve `selector` starting at `module`.
    ///
    /// # Performance
    ///
    /// A current cache entry answers in O(1). A miss walks the whole lookup
    /// path, O(chain length), and records the outcome under the version read
    /// before the walk.
    pub fn resolve(&self, module: &ModuleRef, selector: Symbol) -> Option<ResolvedMethod> {
        let Some(cache) = &self.cache else {
            return self.resolve_uncached(module, selector);
        };

        // Read the version before walking: a mutation racing with the walk
        // leaves an entry stamped with the older version, which is then stale.
        let version = self.version.current();
        if let Some(state) = cache.get(module.id(), selector, version) {
            return state.into_resolved();
        }

        trace!(module = %module, selector = %selector, version, "method cache miss");
        let resolved = self.resolve_uncached(module, selector);
        let state = match &resolved {
            Some(found) => CacheState::Hit(found.clone()),
            None => CacheState::Miss,
        };
        cache.insert(module.id(), selector, state, version);
        resolved
    }

    /// Walk the lookup path of `module` without consulting the cache.
    pub fn resolve_uncached(&self, module: &ModuleRef, selector: Symbol) -> Option<ResolvedMethod> {
        let mut depth = 0;
        let resolved = search(module, |entry| {
            let owner = entry.module();
            let found = owner.methods().lookup(selector).map(|entry| ResolvedMethod {
                entry,
                owner: owner.clone(),
                depth,
            });
            depth += 1;
            found
        });

        if self.trace_dispatch {
            match &resolved {
                Some(found) => trace!(
                    module = %module,
                    selector = %selector,
                    owner = %found.owner,
                    depth = found.depth,
                    "chain walk hit"
                ),
                None => trace!(module = %module, selector = %selector, steps = depth, "chain walk miss"),
            }
        }

        resolved
    }

    /// Whether the resolver caches results.
    #[inline]
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache counters; all zero when caching is disabled.
    pub fn stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(MethodCache::stats)
            .unwrap_or_default()
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Arity, NativeMethod};
    use crate::object::{AllocationPolicy, IncludedModule, Module, ModuleKind};
    use crate::value::Value;
    use strata_core::intern;

    struct Fixture {
        version: TopologyVersion,
        resolver: MethodResolver,
    }

    impl Fixture {
        fn new(config: SpaceConfig) -> Self {
            let version = TopologyVersion::new();
            let resolver = MethodResolver::new(&config, version.clone());
            Self { version, resolver }
        }

        fn class(&self, name: &str, superclass: Option<&ModuleRef>) -> ModuleRef {
            Module::new(
                Some(name),
                ModuleKind::Class {
                    allocation: AllocationPolicy::Instances,
                },
                superclass.cloned(),
                &self.version,
            )
        }

        fn module(&self, name: &str) -> ModuleRef {
            Module::new(Some(name), ModuleKind::Module, None, &self.version)
        }
    }

    fn define(module: &ModuleRef, selector: &str, n: i64) -> MethodHandle {
        let handle =
            NativeMethod::new(selector, Arity::Exact(0), move |_, _, _| Ok(Value::Int(n)))
                .into_handle();
        module
            .methods()
            .define(intern(selector), MethodEntry::public(handle.clone()));
        handle
    }

    #[test]
    fn test_resolves_through_superclass() {
        let fx = Fixture::new(SpaceConfig::default());
        let base = fx.class("Base", None);
        let derived = fx.class("Derived", Some(&base));
        let handle = define(&base, "greet", 1);

        let found = fx.resolver.resolve(&derived, intern("greet")).unwrap();
        assert!(found.handle().ptr_eq(&handle));
        assert_eq!(found.owner, base);
        assert_eq!(found.depth, 1);
    }

    #[test]
    fn test_shadowing_order() {
        let fx = Fixture::new(SpaceConfig::default());
        let base = fx.class("Base", None);
        let derived = fx.class("Derived", Some(&base));
        let mixin = fx.module("Mixin");
        derived.chain().prepend(&[IncludedModule::new(mixin.clone())]);

        define(&base, "who", 1);
        let from_mixin = define(&mixin, "who", 2);
        let found = fx.resolver.resolve(&derived, intern("who")).unwrap();
        assert!(found.handle().ptr_eq(&from_mixin));

        let own = define(&derived, "who", 3);
        let found = fx.resolver.resolve(&derived, intern("who")).unwrap();
        assert!(found.handle().ptr_eq(&own));
    }

    #[test]
    fn test_miss_is_cached_then_invalidated() {
        let fx = Fixture::new(SpaceConfig::default());
        let class = fx.class("Thing", None);

        assert!(fx.resolver.resolve(&class, intern("late")).is_none());
        assert!(fx.resolver.resolve(&class, intern("late")).is_none());
        assert_eq!(fx.resolver.stats().hits, 1);

        let handle = define(&class, "late", 1);
        let found = fx.resolver.resolve(&class, intern("late")).unwrap();
        assert!(found.handle().ptr_eq(&handle));
    }

    #[test]
    fn test_shared_module_mutation_is_visible() {
        let fx = Fixture::new(SpaceConfig::default());
        let shared = fx.module("Shared");
        let a = fx.class("A", None);
        let b = fx.class("B", None);
        a.chain().prepend(&[IncludedModule::new(shared.clone())]);
        b.chain().prepend(&[IncludedModule::new(shared.clone())]);

        assert!(fx.resolver.resolve(&a, intern("ping")).is_none());
        assert!(fx.resolver.resolve(&b, intern("ping")).is_none());

        let handle = define(&shared, "ping", 1);
        assert!(fx.resolver.resolve(&a, intern("ping")).unwrap().handle().ptr_eq(&handle));
        assert!(fx.resolver.resolve(&b, intern("ping")).unwrap().handle().ptr_eq(&handle));
    }

    #[test]
    fn test_cache_disabled() {
        let fx = Fixture::new(SpaceConfig::default().with_method_cache(false));
        let class = fx.class("Thing", None);
        define(&class, "x", 1);

        assert!(!fx.resolver.is_caching());
        assert!(fx.resolver.resolve(&class, intern("x")).is_some());
        assert_eq!(fx.resolver.stats(), CacheStats::default());
    }
}
