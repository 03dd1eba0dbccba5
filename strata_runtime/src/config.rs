//! Object space configuration.
//!
//! Settings are resolved once when an `ObjectSpace` is built, either from
//! defaults or from `STRATA_*` environment variables. Nothing re-reads the
//! environment afterwards.

// =============================================================================
// Defaults
// =============================================================================

/// Default number of resolver cache entries before stale entries are purged.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Enables or disables the resolver cache.
pub const ENV_METHOD_CACHE: &str = "STRATA_METHOD_CACHE";

/// Resolver cache capacity.
pub const ENV_METHOD_CACHE_CAPACITY: &str = "STRATA_METHOD_CACHE_CAPACITY";

/// Emits a trace event for every uncached chain walk.
pub const ENV_TRACE_DISPATCH: &str = "STRATA_TRACE_DISPATCH";

// =============================================================================
// Space Configuration
// =============================================================================

/// Configuration of an object space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceConfig {
    /// Cache method resolution results per (class, selector).
    pub method_cache: bool,

    /// Entry count at which the resolver cache purges stale entries.
    pub cache_capacity: usize,

    /// Trace every uncached chain walk.
    pub trace_dispatch: bool,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            method_cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            trace_dispatch: false,
        }
    }
}

impl SpaceConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let method_cache = lookup(ENV_METHOD_CACHE)
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.method_cache);

        let cache_capacity = lookup(ENV_METHOD_CACHE_CAPACITY)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.cache_capacity);

        let trace_dispatch = lookup(ENV_TRACE_DISPATCH)
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.trace_dispatch);

        Self {
            method_cache,
            cache_capacity,
            trace_dispatch,
        }
    }

    pub fn with_method_cache(mut self, enabled: bool) -> Self {
        self.method_cache = enabled;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}

/// A variable is truthy when non-empty and not `0`, `false`, `off` or `no`.
#[inline]
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !matches!(
            value.to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        )
}

// =============================================================================
// Tests
// =============================================================================
