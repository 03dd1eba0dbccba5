//! Mixin composition: `include` and `extend`.
//!
//! # Inclusion
//!
//! `include(host, [A, B])` processes its arguments in order, and every
//! inclusion inserts at the front of the host's chain, so the last argument
//! ends up nearest to the host:
//!
//! ```text
//! host.include(A, B)   =>   host ─► B ─► A ─► (earlier includes) ─► superclass
//! ```
//!
//! Each inclusion sends `append_features(host)` then `included(host)` to the
//! module. The built-in `append_features` flattens: the module's own included
//! modules come along behind it, minus any the host already has.
//!
//! # Re-inclusion
//!
//! Including a module that is already on the host's lookup path does not
//! touch the chain. Instead, every module the included module itself
//! includes receives `append_features` and `included` again, addressed to
//! the module whose chain holds the existing entry.

use crate::object::{AncestorEntry, IncludedModule, ModuleRef, ancestors, walk};
use crate::space::ObjectSpace;
use crate::value::Value;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use strata_core::{StrataError, StrataResult};

/// The pair of hooks a composition sends to each module.
struct Hooks {
    attach: &'static str,
    notify: &'static str,
}

const INCLUDE_HOOKS: Hooks = Hooks {
    attach: "append_features",
    notify: "included",
};

const EXTEND_HOOKS: Hooks = Hooks {
    attach: "extend_object",
    notify: "extended",
};

impl ObjectSpace {
    /// Check that every argument is a plain module.
    fn validate_mixins<V>(&self, modules: &[V]) -> StrataResult<SmallVec<[ModuleRef; 4]>>
    where
        V: Clone + Into<Value>,
    {
        modules
            .iter()
            .cloned()
            .map(Into::into)
            .map(|value| match value {
                Value::Module(module) if !module.is_class() => Ok(module),
                other => Err(StrataError::wrong_argument_type(other.type_name(), "Module")),
            })
            .collect()
    }

    fn send_hooks(&self, module: &ModuleRef, hooks: &Hooks, target: &Value) -> StrataResult<()> {
        let receiver = Value::Module(module.clone());
        let args = [target.clone()];
        self.call(&receiver, hooks.attach, &args)?;
        self.call(&receiver, hooks.notify, &args)?;
        Ok(())
    }

    /// Mix `modules` into `host`.
    ///
    /// Every argument is type- and cycle-checked under the mutation lock
    /// before any of them is linked: non-modules and classes fail with
    /// `TypeMismatch`, the host itself (or a module that already has the host
    /// among its ancestors) with `CyclicComposition`. Hooks then run argument
    /// by argument, so an error raised by a hook leaves the arguments
    /// processed before it linked.
    #[tracing::instrument(level = "debug", skip_all, fields(host = %host))]
    pub fn include<V>(&self, host: &ModuleRef, modules: &[V]) -> StrataResult<()>
    where
        V: Clone + Into<Value>,
    {
        let mixins = self.validate_mixins(modules)?;

        let _guard = self.lock();
        for module in &mixins {
            if module == host || ancestors(module).contains(host) {
                return Err(StrataError::cyclic(host.to_string()));
            }
        }

        let host_value = Value::Module(host.clone());
        for module in &mixins {
            if ancestors(host).contains(module) {
                self.refresh_inclusion(host, module)?;
            } else {
                self.send_hooks(module, &INCLUDE_HOOKS, &host_value)?;
                tracing::debug!(host = %host, module = %module, "module included");
            }
        }
        Ok(())
    }

    fn refresh_inclusion(&self, host: &ModuleRef, module: &ModuleRef) -> StrataResult<()> {
        let existing = walk(host).into_iter().find(|entry| {
            matches!(entry, AncestorEntry::Included { .. }) && entry.module() == module
        });
        let Some(entry) = existing else {
            return Ok(());
        };

        let entry_host = Value::Module(entry.host().clone());
        for nested in module.chain().modules() {
            self.send_hooks(&nested, &INCLUDE_HOOKS, &entry_host)?;
        }
        tracing::debug!(
            host = %host,
            module = %module,
            entry_host = %entry.host(),
            "inclusion hooks refreshed"
        );
        Ok(())
    }

    /// The built-in `append_features`: link `module`, and the modules it
    /// includes, into `host`'s chain.
    ///
    /// Modules already on `host`'s lookup path are skipped, so the chain
    /// never holds two entries for one module. Classes cannot be linked.
    pub fn append_features(&self, module: &ModuleRef, host: &ModuleRef) -> StrataResult<()> {
        if module.is_class() {
            return Err(StrataError::wrong_argument_type(
                Value::Module(module.clone()).type_name(),
                "Module",
            ));
        }

        let _guard = self.lock();
        let hierarchy: FxHashSet<ModuleRef> = ancestors(host).into_iter().collect();

        let mut proxies: SmallVec<[IncludedModule; 4]> = SmallVec::new();
        if !hierarchy.contains(module) {
            proxies.push(IncludedModule::new(module.clone()));
        }
        for nested in module.chain().modules() {
            if !hierarchy.contains(&nested) {
                proxies.push(IncludedModule::new(nested));
            }
        }

        let inserted = host.chain().prepend(&proxies);
        tracing::trace!(host = %host, module = %module, inserted, "append_features");
        Ok(())
    }

    /// Mix `modules` into the singleton class of `target`.
    ///
    /// Each module receives `extend_object(target)` then `extended(target)`.
    #[tracing::instrument(level = "debug", skip_all, fields(target = %target.inspect()))]
    pub fn extend<V>(&self, target: &Value, modules: &[V]) -> StrataResult<()>
    where
        V: Clone + Into<Value>,
    {
        let mixins = self.validate_mixins(modules)?;
        self.singleton_class(target)?;

        let _guard = self.lock();
        for module in &mixins {
            self.send_hooks(module, &EXTEND_HOOKS, target)?;
            tracing::debug!(target = %target.inspect(), module = %module, "object extended");
        }
        Ok(())
    }

    /// The built-in `extend_object`: append `module` to the singleton class
    /// of `target`.
    pub fn extend_object(&self, module: &ModuleRef, target: &Value) -> StrataResult<()> {
        let meta = self.singleton_class(target)?;
        self.append_features(module, &meta)
    }
}

// =============================================================================
// Tests
// =============================================================================
