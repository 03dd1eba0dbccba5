//! Definitions: modules, classes, methods, aliases, accessors, visibility.
//!
//! Every operation here is a structural mutation and runs inside the space's
//! mutation section. Failures are raised before anything is written.

use crate::dispatch::ResolvedMethod;
use crate::method::{AccessorSynthesizer, MethodEntry, MethodHandle, Visibility};
use crate::object::{ModuleKind, ModuleRef, ancestors};
use crate::object::{AllocationPolicy, Module};
use crate::space::ObjectSpace;
use crate::space::constants::constant_name;
use crate::value::Value;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use strata_core::{StrataError, StrataResult, Symbol, intern};

/// Normalize a list of names to selectors.
pub(crate) fn symbols<S>(names: &[S]) -> SmallVec<[Symbol; 4]>
where
    S: Into<Symbol> + Clone,
{
    names.iter().cloned().map(Into::into).collect()
}

/// `NameError` for a selector missing from the whole lookup path.
pub(crate) fn undefined_method(module: &ModuleRef, selector: Symbol) -> StrataError {
    let message = match module.attached_instance() {
        Some(attached) => format!(
            "Unable to find '{}' for object {}",
            selector,
            attached.inspect()
        ),
        None => {
            let thing = if module.is_class() { "class" } else { "module" };
            format!("undefined method `{}' for {} `{}'", selector, thing, module)
        }
    };
    StrataError::name(selector.as_str(), message)
}

// =============================================================================
// Definition Scope
// =============================================================================

/// The visibility in effect at the current point of a module body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefinitionScope {
    #[default]
    Public,
    Private,
    /// Methods become private instance methods and public singleton methods.
    ModuleFunction,
}

// =============================================================================
// Module Body
// =============================================================================

/// Evaluation context of a module or class body.
///
/// Bare `private`, `public` and `module_function` change the scope of later
/// definitions in this body only; nothing about them is stored on the
/// module.
pub struct ModuleBody<'a> {
    space: &'a ObjectSpace,
    module: ModuleRef,
    scope: DefinitionScope,
}

impl<'a> ModuleBody<'a> {
    pub fn new(space: &'a ObjectSpace, module: &ModuleRef) -> Self {
        Self {
            space,
            module: module.clone(),
            scope: DefinitionScope::Public,
        }
    }

    #[inline]
    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    #[inline]
    pub fn space(&self) -> &'a ObjectSpace {
        self.space
    }

    #[inline]
    pub fn scope(&self) -> DefinitionScope {
        self.scope
    }

    /// Define a method under the current scope, then fire `method_added`.
    pub fn def(&self, selector: impl Into<Symbol>, handle: MethodHandle) -> StrataResult<Symbol> {
        let selector = selector.into();
        let space = self.space;

        match self.scope {
            DefinitionScope::Public => {
                space.define_method_with(&self.module, selector, handle, Visibility::Public)?;
            }
            DefinitionScope::Private => {
                space.define_method_with(&self.module, selector, handle, Visibility::Private)?;
            }
            DefinitionScope::ModuleFunction => {
                let _guard = space.lock();
                let singleton = handle.dup();
                space.define_method_with(&self.module, selector, handle, Visibility::Private)?;
                let meta = space.singleton_class(&Value::Module(self.module.clone()))?;
                meta.methods()
                    .define(selector, MethodEntry::public(singleton));
            }
        }

        self.method_added(selector)?;
        Ok(selector)
    }

    fn method_added(&self, selector: Symbol) -> StrataResult<()> {
        let receiver = Value::Module(self.module.clone());
        let hook = intern("method_added");
        if self.space.respond_to(&receiver, hook, true) {
            self.space
                .call(&receiver, hook, &[Value::Symbol(selector)])?;
        }
        Ok(())
    }

    /// Without names: later definitions are public. With names: make them public now.
    pub fn public(&mut self, names: &[&str]) -> StrataResult<()> {
        if names.is_empty() {
            self.scope = DefinitionScope::Public;
            return Ok(());
        }
        self.space.public(&self.module, names)
    }

    /// Without names: later definitions are private. With names: make them private now.
    pub fn private(&mut self, names: &[&str]) -> StrataResult<()> {
        if names.is_empty() {
            self.scope = DefinitionScope::Private;
            return Ok(());
        }
        self.space.private(&self.module, names)
    }

    /// Without names: later definitions become module functions. With names:
    /// publish those methods on the singleton class now.
    pub fn module_function(&mut self, names: &[&str]) -> StrataResult<()> {
        if names.is_empty() {
            self.scope = DefinitionScope::ModuleFunction;
            return Ok(());
        }
        self.space.module_function(&self.module, names).map(|_| ())
    }
}

// =============================================================================
// Object Space: Definitions
// =============================================================================

impl ObjectSpace {
    /// Open a body evaluation context for `module`.
    pub fn module_body(&self, module: &ModuleRef) -> ModuleBody<'_> {
        ModuleBody::new(self, module)
    }

    fn qualified_name(&self, outer: &ModuleRef, name: &str) -> String {
        if *outer == self.core.object {
            name.to_string()
        } else {
            format!("{}::{}", outer, name)
        }
    }

    // =========================================================================
    // Modules and Classes
    // =========================================================================

    /// Define or reopen a top-level module.
    pub fn define_module(&self, name: &str) -> StrataResult<ModuleRef> {
        let object = self.core.object.clone();
        self.define_module_under(&object, name)
    }

    /// Define or reopen module `outer::name`.
    pub fn define_module_under(&self, outer: &ModuleRef, name: &str) -> StrataResult<ModuleRef> {
        let constant = constant_name(name)?;
        let _guard = self.lock();

        if let Some(existing) = outer.own_constant(constant) {
            return match existing {
                Value::Module(module) if !module.is_class() => Ok(module),
                _ => Err(StrataError::type_mismatch(format!("{} is not a module", name))),
            };
        }

        let qualified = self.qualified_name(outer, name);
        let module = Module::new(Some(&qualified), ModuleKind::Module, None, &self.version);
        outer.set_own_constant(constant, Value::Module(module.clone()));
        tracing::debug!(module = %module, "module defined");
        Ok(module)
    }

    /// A new anonymous module.
    pub fn new_module(&self) -> ModuleRef {
        Module::new(None, ModuleKind::Module, None, &self.version)
    }

    /// Define or reopen a top-level class. The superclass defaults to `Object`.
    pub fn define_class(&self, name: &str, superclass: Option<&ModuleRef>) -> StrataResult<ModuleRef> {
        let object = self.core.object.clone();
        self.define_class_under(&object, name, superclass)
    }

    /// Define or reopen class `outer::name`.
    pub fn define_class_under(
        &self,
        outer: &ModuleRef,
        name: &str,
        superclass: Option<&ModuleRef>,
    ) -> StrataResult<ModuleRef> {
        let constant = constant_name(name)?;
        let _guard = self.lock();

        if let Some(existing) = outer.own_constant(constant) {
            return match existing {
                Value::Module(class) if class.is_class() && !class.is_metaclass() => {
                    if let Some(expected) = superclass {
                        if class.superclass() != Some(expected) {
                            return Err(StrataError::type_mismatch(format!(
                                "superclass mismatch for class {}",
                                name
                            )));
                        }
                    }
                    Ok(class)
                }
                _ => Err(StrataError::type_mismatch(format!("{} is not a class", name))),
            };
        }

        let parent = superclass.unwrap_or(&self.core.object).clone();
        let qualified = self.qualified_name(outer, name);
        let class = self.build_class(Some(&qualified), &parent)?;
        outer.set_own_constant(constant, Value::Module(class.clone()));
        tracing::debug!(class = %class, superclass = %parent, "class defined");
        Ok(class)
    }

    /// A new anonymous class. The superclass defaults to `Object`.
    pub fn new_class(&self, superclass: Option<&ModuleRef>) -> StrataResult<ModuleRef> {
        let parent = superclass.unwrap_or(&self.core.object).clone();
        self.build_class(None, &parent)
    }

    fn build_class(&self, name: Option<&str>, superclass: &ModuleRef) -> StrataResult<ModuleRef> {
        if superclass.is_metaclass() {
            return Err(StrataError::type_mismatch(
                "can't make subclass of singleton class",
            ));
        }
        if !superclass.is_class() {
            return Err(StrataError::type_mismatch(
                "superclass must be a Class (Module given)",
            ));
        }
        if *superclass == self.core.class {
            return Err(StrataError::type_mismatch("can't make subclass of Class"));
        }

        let allocation = superclass.allocation_policy().unwrap_or(AllocationPolicy::Instances);
        Ok(Module::new(
            name,
            ModuleKind::Class { allocation },
            Some(superclass.clone()),
            &self.version,
        ))
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Bind a public method. `initialize` is always private.
    pub fn define_method(
        &self,
        module: &ModuleRef,
        selector: impl Into<Symbol>,
        handle: MethodHandle,
    ) -> StrataResult<Symbol> {
        self.define_method_with(module, selector, handle, Visibility::Public)
    }

    /// Bind a method with an explicit visibility. `initialize` is always private.
    pub fn define_method_with(
        &self,
        module: &ModuleRef,
        selector: impl Into<Symbol>,
        handle: MethodHandle,
        visibility: Visibility,
    ) -> StrataResult<Symbol> {
        let selector = selector.into();
        let visibility = if selector == intern("initialize") {
            Visibility::Private
        } else {
            visibility
        };

        let _guard = self.lock();
        module
            .methods()
            .define(selector, MethodEntry::new(handle, visibility));
        tracing::debug!(module = %module, selector = %selector, ?visibility, "method defined");
        Ok(selector)
    }

    /// Unbind a method from `module`'s own table.
    pub fn remove_method(&self, module: &ModuleRef, selector: impl Into<Symbol>) -> StrataResult<()> {
        let selector = selector.into();
        let _guard = self.lock();
        match module.methods().remove(selector) {
            Some(_) => {
                tracing::debug!(module = %module, selector = %selector, "method removed");
                Ok(())
            }
            None => Err(StrataError::name(
                selector.as_str(),
                format!("method `{}' not defined in {}", selector, module),
            )),
        }
    }

    /// Bind `new_name` to the implementation `current_name` resolves to.
    ///
    /// The alias shares the handle found at this moment; redefining
    /// `current_name` later does not retarget it.
    pub fn alias_method(
        &self,
        module: &ModuleRef,
        new_name: impl Into<Symbol>,
        current_name: impl Into<Symbol>,
    ) -> StrataResult<()> {
        let new_name = new_name.into();
        let current_name = current_name.into();
        let _guard = self.lock();

        let found = self
            .resolve(module, current_name)
            .ok_or_else(|| undefined_method(module, current_name))?;
        module.methods().define(new_name, found.entry.clone());

        tracing::debug!(
            module = %module,
            new_name = %new_name,
            current_name = %current_name,
            owner = %found.owner,
            "method aliased"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Bind a reader for each `@name`.
    pub fn attr_reader<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        let _guard = self.lock();
        for name in symbols(names) {
            let (selector, handle) = AccessorSynthesizer::reader(name);
            module.methods().define(selector, MethodEntry::public(handle));
            tracing::debug!(module = %module, selector = %selector, "attr_reader");
        }
        Ok(())
    }

    /// Bind a writer `name=` for each `@name`.
    pub fn attr_writer<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        let _guard = self.lock();
        for name in symbols(names) {
            let (selector, handle) = AccessorSynthesizer::writer(name);
            module.methods().define(selector, MethodEntry::public(handle));
            tracing::debug!(module = %module, selector = %selector, "attr_writer");
        }
        Ok(())
    }

    pub fn attr_accessor<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        let _guard = self.lock();
        for name in symbols(names) {
            self.attr_reader(module, &[name])?;
            self.attr_writer(module, &[name])?;
        }
        Ok(())
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    pub fn public<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        self.set_method_visibility(module, names, Visibility::Public)
    }

    pub fn private<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        self.set_method_visibility(module, names, Visibility::Private)
    }

    /// Change the visibility of named methods as seen from `module`.
    ///
    /// A method in `module`'s own table changes in place. An inherited one is
    /// rebound in `module`'s own table with the new visibility, leaving the
    /// ancestor untouched.
    pub fn set_method_visibility<S>(
        &self,
        module: &ModuleRef,
        names: &[S],
        visibility: Visibility,
    ) -> StrataResult<()>
    where
        S: Into<Symbol> + Clone,
    {
        let _guard = self.lock();

        let mut plan: SmallVec<[(Symbol, Option<MethodHandle>); 4]> = SmallVec::new();
        for selector in symbols(names) {
            if module.methods().contains(selector) {
                plan.push((selector, None));
                continue;
            }
            let found = self
                .resolve(module, selector)
                .ok_or_else(|| undefined_method(module, selector))?;
            plan.push((selector, Some(found.entry.handle)));
        }

        for (selector, inherited) in plan {
            match inherited {
                None => {
                    module.methods().set_visibility(selector, visibility);
                }
                Some(handle) => {
                    module
                        .methods()
                        .define(selector, MethodEntry::new(handle, visibility));
                }
            }
            tracing::debug!(module = %module, selector = %selector, ?visibility, "visibility changed");
        }
        Ok(())
    }

    /// Publish named methods as public singleton methods and make the
    /// originals private. Returns `module`.
    pub fn module_function<S>(&self, module: &ModuleRef, names: &[S]) -> StrataResult<ModuleRef>
    where
        S: Into<Symbol> + Clone,
    {
        let selectors = symbols(names);
        let _guard = self.lock();

        let mut resolved: SmallVec<[ResolvedMethod; 4]> = SmallVec::new();
        for &selector in &selectors {
            let found = self
                .resolve(module, selector)
                .ok_or_else(|| undefined_method(module, selector))?;
            resolved.push(found);
        }

        let meta = self.singleton_class(&Value::Module(module.clone()))?;
        for (&selector, found) in selectors.iter().zip(&resolved) {
            meta.methods()
                .define(selector, MethodEntry::public(found.handle().dup()));
            tracing::debug!(module = %module, selector = %selector, "module_function");
        }
        self.set_method_visibility(module, selectors.as_slice(), Visibility::Private)?;

        Ok(module.clone())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Visibility of the binding `selector` resolves to from `module`.
    pub fn method_visibility(
        &self,
        module: &ModuleRef,
        selector: impl Into<Symbol>,
    ) -> Option<Visibility> {
        self.resolve(module, selector).map(|found| found.visibility())
    }

    /// Public selectors, sorted. With `include_inherited`, the whole lookup
    /// path counts and a nearer private binding hides a farther public one.
    pub fn instance_methods(&self, module: &ModuleRef, include_inherited: bool) -> Vec<Symbol> {
        if !include_inherited {
            return module.methods().selectors_with(Visibility::Public);
        }

        let mut seen = FxHashSet::default();
        let mut selectors = Vec::new();
        for ancestor in ancestors(module) {
            for selector in ancestor.methods().selectors() {
                if !seen.insert(selector) {
                    continue;
                }
                let public = ancestor
                    .methods()
                    .lookup(selector)
                    .is_some_and(|entry| !entry.is_private());
                if public {
                    selectors.push(selector);
                }
            }
        }
        selectors.sort_by_key(|sym| sym.as_str());
        selectors
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Arity, NativeMethod};

    fn constant(n: i64) -> MethodHandle {
        NativeMethod::new("constant", Arity::Exact(0), move |_, _, _| Ok(Value::Int(n))).into_handle()
    }

    #[test]
    fn test_reopen_module_and_class() {
        let space = ObjectSpace::new();
        let m = space.define_module("Tools").unwrap();
        assert_eq!(space.define_module("Tools").unwrap(), m);

        let c = space.define_class("Hammer", None).unwrap();
        assert_eq!(space.define_class("Hammer", None).unwrap(), c);
        assert_eq!(c.superclass(), Some(space.object_class()));
    }

    #[test]
    fn test_kind_conflicts() {
        let space = ObjectSpace::new();
        space.define_module("Thing").unwrap();
        let err = space.define_class("Thing", None).unwrap_err();
        assert_eq!(err.to_string(), "Thing is not a class");

        space.define_class("Other", None).unwrap();
        let err = space.define_module("Other").unwrap_err();
        assert_eq!(err.to_string(), "Other is not a module");
    }

    #[test]
    fn test_superclass_mismatch() {
        let space = ObjectSpace::new();
        let base = space.define_class("Base", None).unwrap();
        space.define_class("Leaf", Some(&base)).unwrap();
        let other = space.define_class("Unrelated", None).unwrap();
        let err = space.define_class("Leaf", Some(&other)).unwrap_err();
        assert_eq!(err.to_string(), "superclass mismatch for class Leaf");
    }

    #[test]
    fn test_nested_names() {
        let space = ObjectSpace::new();
        let outer = space.define_module("Outer").unwrap();
        let inner = space.define_class_under(&outer, "Inner", None).unwrap();
        assert_eq!(inner.to_string(), "Outer::Inner");
    }

    #[test]
    fn test_invalid_superclass() {
        let space = ObjectSpace::new();
        let mixin = space.define_module("Mixin").unwrap();
        assert!(space.new_class(Some(&mixin)).is_err());
        let class_class = space.class_class().clone();
        assert!(space.new_class(Some(&class_class)).is_err());
    }

    #[test]
    fn test_initialize_is_always_private() {
        let space = ObjectSpace::new();
        let class = space.define_class("Init", None).unwrap();
        space.define_method(&class, "initialize", constant(0)).unwrap();
        assert_eq!(
            space.method_visibility(&class, "initialize"),
            Some(Visibility::Private)
        );
    }

    #[test]
    fn test_remove_method() {
        let space = ObjectSpace::new();
        let class = space.define_class("Removable", None).unwrap();
        space.define_method(&class, "gone", constant(1)).unwrap();
        space.remove_method(&class, "gone").unwrap();
        assert!(space.resolve(&class, "gone").is_none());

        let err = space.remove_method(&class, "gone").unwrap_err();
        assert_eq!(err.to_string(), "method `gone' not defined in Removable");
    }

    #[test]
    fn test_alias_missing_method_messages() {
        let space = ObjectSpace::new();
        let class = space.define_class("Named", None).unwrap();
        let err = space.alias_method(&class, "b", "a").unwrap_err();
        assert_eq!(err.to_string(), "undefined method `a' for class `Named'");

        let module = space.define_module("Mod").unwrap();
        let err = space.alias_method(&module, "b", "a").unwrap_err();
        assert_eq!(err.to_string(), "undefined method `a' for module `Mod'");

        let meta = space.singleton_class(&Value::Module(class)).unwrap();
        let err = space.alias_method(&meta, "b", "a").unwrap_err();
        assert_eq!(err.to_string(), "Unable to find 'a' for object Named");
    }

    #[test]
    fn test_private_inherited_method_rebinds_locally() {
        let space = ObjectSpace::new();
        let base = space.define_class("Parent", None).unwrap();
        let child = space.define_class("Child", Some(&base)).unwrap();
        space.define_method(&base, "shared", constant(1)).unwrap();

        space.private(&child, &["shared"]).unwrap();
        assert_eq!(space.method_visibility(&child, "shared"), Some(Visibility::Private));
        assert_eq!(space.method_visibility(&base, "shared"), Some(Visibility::Public));
        assert!(child.methods().contains(intern("shared")));
    }

    #[test]
    fn test_private_unknown_method() {
        let space = ObjectSpace::new();
        let class = space.define_class("Empty", None).unwrap();
        let err = space.private(&class, &["nope"]).unwrap_err();
        assert!(matches!(err, StrataError::UnresolvedName { .. }));
    }

    #[test]
    fn test_module_function_with_names() {
        let space = ObjectSpace::new();
        let math = space.define_module("Maths").unwrap();
        let handle = constant(7);
        space.define_method(&math, "seven", handle.clone()).unwrap();

        let returned = space.module_function(&math, &["seven"]).unwrap();
        assert_eq!(returned, math);
        assert_eq!(space.method_visibility(&math, "seven"), Some(Visibility::Private));

        let receiver = Value::Module(math.clone());
        assert_eq!(space.send(&receiver, "seven", &[]).unwrap(), Value::Int(7));

        let meta = math.metaclass().unwrap();
        let published = meta.methods().lookup(intern("seven")).unwrap();
        assert!(!published.handle.ptr_eq(&handle));
    }

    #[test]
    fn test_module_function_unknown_name_changes_nothing() {
        let space = ObjectSpace::new();
        let m = space.define_module("Partial").unwrap();
        space.define_method(&m, "known", constant(1)).unwrap();
        let err = space.module_function(&m, &["known", "unknown"]).unwrap_err();
        assert!(matches!(err, StrataError::UnresolvedName { .. }));
        assert_eq!(space.method_visibility(&m, "known"), Some(Visibility::Public));
        assert!(m.metaclass().is_none());
    }

    #[test]
    fn test_body_scope_directives() {
        let space = ObjectSpace::new();
        let class = space.define_class("Scoped", None).unwrap();
        let mut body = space.module_body(&class);

        body.def("open", constant(1)).unwrap();
        body.private(&[]).unwrap();
        body.def("hidden", constant(2)).unwrap();
        body.public(&[]).unwrap();
        body.def("visible", constant(3)).unwrap();

        assert_eq!(space.method_visibility(&class, "open"), Some(Visibility::Public));
        assert_eq!(space.method_visibility(&class, "hidden"), Some(Visibility::Private));
        assert_eq!(space.method_visibility(&class, "visible"), Some(Visibility::Public));
        assert_eq!(body.scope(), DefinitionScope::Public);
    }

    #[test]
    fn test_body_module_function_scope() {
        let space = ObjectSpace::new();
        let m = space.define_module("Util").unwrap();
        let mut body = space.module_body(&m);
        body.module_function(&[]).unwrap();
        body.def("helper", constant(9)).unwrap();

        assert_eq!(space.method_visibility(&m, "helper"), Some(Visibility::Private));
        let receiver = Value::Module(m);
        assert_eq!(space.send(&receiver, "helper", &[]).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_scope_is_per_body() {
        let space = ObjectSpace::new();
        let class = space.define_class("TwoBodies", None).unwrap();
        let mut first = space.module_body(&class);
        first.private(&[]).unwrap();

        let second = space.module_body(&class);
        second.def("fresh", constant(1)).unwrap();
        assert_eq!(space.method_visibility(&class, "fresh"), Some(Visibility::Public));
    }

    #[test]
    fn test_instance_methods() {
        let space = ObjectSpace::new();
        let base = space.define_class("Animal", None).unwrap();
        let dog = space.define_class("Dog", Some(&base)).unwrap();
        space.define_method(&base, "breathe", constant(1)).unwrap();
        space.define_method(&dog, "bark", constant(2)).unwrap();
        space
            .define_method_with(&dog, "breathe", constant(3), Visibility::Private)
            .unwrap();

        let own: Vec<&str> = space
            .instance_methods(&dog, false)
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(own, vec!["bark"]);

        let all = space.instance_methods(&dog, true);
        assert!(all.contains(&intern("bark")));
        assert!(!all.contains(&intern("breathe")));
    }
}
