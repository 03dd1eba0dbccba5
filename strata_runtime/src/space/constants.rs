//! Constant tables.
//!
//! Constants are looked up along the ancestor chain of a module. Plain
//! modules (and singleton classes) fall back to `Object`, so top-level
//! constants are visible inside every module.

use crate::object::{ModuleRef, ancestors};
use crate::space::ObjectSpace;
use crate::value::Value;
use rustc_hash::FxHashSet;
use strata_core::{StrataError, StrataResult, Symbol, intern};

/// Validate a constant name.
pub(crate) fn constant_name(name: &str) -> StrataResult<Symbol> {
    let symbol = intern(name);
    if symbol.is_constant_name() {
        Ok(symbol)
    } else {
        Err(StrataError::name(
            name,
            format!("wrong constant name {}", name),
        ))
    }
}

impl ObjectSpace {
    fn uninitialized_constant(&self, module: &ModuleRef, name: &str) -> StrataError {
        let message = if *module == self.core.object {
            format!("uninitialized constant {}", name)
        } else {
            format!("uninitialized constant {}::{}", module, name)
        };
        StrataError::name(name, message)
    }

    fn lookup_constant(&self, module: &ModuleRef, name: Symbol) -> Option<Value> {
        if let Some(found) = ancestors(module)
            .iter()
            .find_map(|ancestor| ancestor.own_constant(name))
        {
            return Some(found);
        }
        if !module.is_class() || module.is_metaclass() {
            return ancestors(&self.core.object)
                .iter()
                .find_map(|ancestor| ancestor.own_constant(name));
        }
        None
    }

    /// Bind a constant on `module`.
    ///
    /// An anonymous module bound to a constant takes the constant's name.
    pub fn const_set(&self, module: &ModuleRef, name: &str, value: Value) -> StrataResult<Value> {
        let symbol = constant_name(name)?;
        let _guard = self.lock();

        if let Value::Module(bound) = &value {
            if bound.name().is_none() && !bound.is_metaclass() {
                let qualified = if *module == self.core.object {
                    name.to_string()
                } else {
                    format!("{}::{}", module, name)
                };
                bound.assign_name(&qualified);
            }
        }

        if module.set_own_constant(symbol, value.clone()).is_some() {
            tracing::debug!(module = %module, constant = name, "constant redefined");
        }
        Ok(value)
    }

    /// Look a constant up along the ancestors of `module`.
    pub fn const_get(&self, module: &ModuleRef, name: &str) -> StrataResult<Value> {
        let symbol = constant_name(name)?;
        self.lookup_constant(module, symbol)
            .ok_or_else(|| self.uninitialized_constant(module, name))
    }

    pub fn const_defined(&self, module: &ModuleRef, name: &str) -> StrataResult<bool> {
        let symbol = constant_name(name)?;
        Ok(self.lookup_constant(module, symbol).is_some())
    }

    /// Remove a constant from `module`'s own table, returning its value.
    pub fn remove_const(&self, module: &ModuleRef, name: &str) -> StrataResult<Value> {
        let symbol = constant_name(name)?;
        let _guard = self.lock();
        module.remove_own_constant(symbol).ok_or_else(|| {
            StrataError::name(
                name,
                format!("constant {}::{} not defined", module, name),
            )
        })
    }

    /// Constant names visible from `module`, sorted.
    ///
    /// Constants of `Object` and its ancestors are listed only for `Object`
    /// itself.
    pub fn constants(&self, module: &ModuleRef) -> Vec<Symbol> {
        let root: FxHashSet<_> = if *module == self.core.object {
            FxHashSet::default()
        } else {
            ancestors(&self.core.object).into_iter().collect()
        };

        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for ancestor in ancestors(module) {
            if root.contains(&ancestor) {
                continue;
            }
            for name in ancestor.own_constant_names() {
                if seen.insert(name) {
                    names.push(name);
                }
            }
        }
        names.sort_by_key(|sym| sym.as_str());
        names
    }
}

// =============================================================================
// Tests
// =============================================================================
