//! Mixin composition tests.
//!
//! Coverage:
//! - Ancestor ordering under `include` with several arguments and flattening
//! - Duplicate suppression and the re-inclusion hook refresh
//! - Hook order and user overrides of `append_features` / `included`
//! - Cyclic composition
//! - `extend` on instances and modules

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use strata_runtime::method::NativeMethod;
use strata_runtime::{Arity, ModuleRef, ObjectSpace, StrataError, Value};

// =============================================================================
// Helpers
// =============================================================================

fn names(modules: &[ModuleRef]) -> Vec<String> {
    modules.iter().map(|m| m.to_string()).collect()
}

fn constant(value: &'static str) -> strata_runtime::MethodHandle {
    NativeMethod::new(value, Arity::Exact(0), move |_, _, _| Ok(Value::string(value))).into_handle()
}

/// Override `hook` on `module` to count its calls.
fn count_hook(space: &ObjectSpace, module: &ModuleRef, hook: &'static str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handle = NativeMethod::new(hook, Arity::Exact(1), move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Nil)
    })
    .into_handle();
    space
        .define_singleton_method(&Value::Module(module.clone()), hook, handle)
        .unwrap();
    calls
}

// =============================================================================
// Ordering
// =============================================================================

mod ordering {
    use super::*;

    #[test]
    fn test_flattened_order() {
        let space = ObjectSpace::new();
        let a = space.define_module("A").unwrap();
        let b = space.define_module("B").unwrap();
        let c = space.define_module("C").unwrap();
        space.include(&a, &[&b, &c]).unwrap();

        let d = space.define_class("D", None).unwrap();
        space.include(&d, &[&a]).unwrap();

        assert_eq!(names(&space.ancestors(&d)), vec!["D", "A", "C", "B", "Object"]);
    }

    #[test]
    fn test_modules_precede_superclass() {
        let space = ObjectSpace::new();
        let mixin = space.define_module("Walks").unwrap();
        let base = space.define_class("Animal", None).unwrap();
        let derived = space.define_class("Dog", Some(&base)).unwrap();
        space.include(&derived, &[&mixin]).unwrap();

        assert_eq!(
            names(&space.ancestors(&derived)),
            vec!["Dog", "Walks", "Animal", "Object"]
        );
    }

    #[test]
    fn test_later_include_is_nearer() {
        let space = ObjectSpace::new();
        let host = space.define_class("Host", None).unwrap();
        let first = space.define_module("First").unwrap();
        let second = space.define_module("Second").unwrap();
        space.include(&host, &[&first]).unwrap();
        space.include(&host, &[&second]).unwrap();

        assert_eq!(names(&host.chain().modules()), vec!["Second", "First"]);
    }

    #[test]
    fn test_included_modules() {
        let space = ObjectSpace::new();
        let a = space.define_module("Readable").unwrap();
        let b = space.define_module("Writable").unwrap();
        let class = space.define_class("Stream", None).unwrap();
        space.include(&class, &[&a, &b]).unwrap();

        assert_eq!(names(&space.included_modules(&class)), vec!["Writable", "Readable"]);
    }
}

// =============================================================================
// Deduplication
// =============================================================================

mod dedup {
    use super::*;

    #[test]
    fn test_repeat_include_keeps_chain_length() {
        let space = ObjectSpace::new();
        let host = space.define_class("Host", None).unwrap();
        let a = space.define_module("A").unwrap();

        space.include(&host, &[&a]).unwrap();
        let before = space.ancestors(&host).len();
        space.include(&host, &[&a]).unwrap();
        space.include(&host, &[&a, &a]).unwrap();

        assert_eq!(space.ancestors(&host).len(), before);
        assert_eq!(host.chain().len(), 1);
    }

    #[test]
    fn test_module_included_by_superclass_is_not_repeated() {
        let space = ObjectSpace::new();
        let shared = space.define_module("Shared").unwrap();
        let base = space.define_class("Base", None).unwrap();
        space.include(&base, &[&shared]).unwrap();
        let derived = space.define_class("Derived", Some(&base)).unwrap();
        space.include(&derived, &[&shared]).unwrap();

        assert!(derived.chain().is_empty());
        let ancestors = space.ancestors(&derived);
        assert_eq!(ancestors.iter().filter(|m| **m == shared).count(), 1);
    }

    #[test]
    fn test_reinclusion_refreshes_nested_hooks() {
        let space = ObjectSpace::new();
        let a = space.define_module("A").unwrap();
        let b = space.define_module("B").unwrap();
        let c = space.define_module("C").unwrap();
        space.include(&a, &[&b, &c]).unwrap();

        let b_included = count_hook(&space, &b, "included");
        let c_included = count_hook(&space, &c, "included");
        let a_included = count_hook(&space, &a, "included");

        let d = space.define_class("D", None).unwrap();
        space.include(&d, &[&a]).unwrap();
        assert_eq!(a_included.load(Ordering::SeqCst), 1);
        assert_eq!(b_included.load(Ordering::SeqCst), 0);

        let before = names(&space.ancestors(&d));
        space.include(&d, &[&a]).unwrap();

        assert_eq!(names(&space.ancestors(&d)), before);
        assert_eq!(a_included.load(Ordering::SeqCst), 1);
        assert_eq!(b_included.load(Ordering::SeqCst), 1);
        assert_eq!(c_included.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_targets_the_existing_entry_host() {
        let space = ObjectSpace::new();
        let outer = space.define_module("Outer").unwrap();
        let inner = space.define_module("Inner").unwrap();
        space.include(&outer, &[&inner]).unwrap();

        let base = space.define_class("Base", None).unwrap();
        space.include(&base, &[&outer]).unwrap();
        let derived = space.define_class("Derived", Some(&base)).unwrap();

        let hosts = Arc::new(Mutex::new(Vec::new()));
        let seen = hosts.clone();
        let handle = NativeMethod::new("included", Arity::Exact(1), move |_, _, args| {
            seen.lock().push(args[0].inspect());
            Ok(Value::Nil)
        })
        .into_handle();
        space
            .define_singleton_method(&Value::Module(inner.clone()), "included", handle)
            .unwrap();

        space.include(&derived, &[&outer]).unwrap();

        assert_eq!(*hosts.lock(), vec!["Base".to_string()]);
        assert!(derived.chain().is_empty());
    }
}

// =============================================================================
// Hooks
// =============================================================================

mod hooks {
    use super::*;

    #[test]
    fn test_append_features_runs_before_included() {
        let space = ObjectSpace::new();
        let host = space.define_class("Host", None).unwrap();
        let mixin = space.define_module("Traced").unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        for hook in ["append_features", "included"] {
            let log = log.clone();
            let handle = NativeMethod::new(hook, Arity::Exact(1), move |space, receiver, args| {
                log.lock().push(hook);
                if hook == "append_features" {
                    let module = receiver.as_module().unwrap();
                    let host = args[0].as_module().unwrap();
                    space.append_features(module, host)?;
                }
                Ok(Value::Nil)
            })
            .into_handle();
            space
                .define_singleton_method(&Value::Module(mixin.clone()), hook, handle)
                .unwrap();
        }

        space.include(&host, &[&mixin]).unwrap();

        assert_eq!(*log.lock(), vec!["append_features", "included"]);
        assert_eq!(names(&host.chain().modules()), vec!["Traced"]);
    }

    #[test]
    fn test_included_receives_host() {
        let space = ObjectSpace::new();
        let host = space.define_class("Receiver", None).unwrap();
        let mixin = space.define_module("Notifier").unwrap();

        let received = Arc::new(Mutex::new(None));
        let slot = received.clone();
        let handle = NativeMethod::new("included", Arity::Exact(1), move |_, _, args| {
            *slot.lock() = Some(args[0].clone());
            Ok(Value::Nil)
        })
        .into_handle();
        space
            .define_singleton_method(&Value::Module(mixin.clone()), "included", handle)
            .unwrap();

        space.include(&host, &[&mixin]).unwrap();
        assert_eq!(*received.lock(), Some(Value::Module(host)));
    }

    #[test]
    fn test_hook_error_propagates() {
        let space = ObjectSpace::new();
        let host = space.define_class("Host", None).unwrap();
        let picky = space.define_module("Picky").unwrap();
        let handle = NativeMethod::new("included", Arity::Exact(1), |_, _, _| {
            Err(StrataError::type_mismatch("not welcome"))
        })
        .into_handle();
        space
            .define_singleton_method(&Value::Module(picky.clone()), "included", handle)
            .unwrap();

        let err = space.include(&host, &[&picky]).unwrap_err();
        assert_eq!(err.to_string(), "not welcome");
    }
}

// =============================================================================
// Cyclic Composition
// =============================================================================

mod cycles {
    use super::*;

    #[test]
    fn test_self_include_rejected() {
        let space = ObjectSpace::new();
        let m = space.define_module("Loop").unwrap();
        let before = space.ancestors(&m);

        let err = space.include(&m, &[&m]).unwrap_err();
        assert!(matches!(err, StrataError::CyclicComposition { .. }));
        assert_eq!(space.ancestors(&m), before);
        assert!(m.chain().is_empty());
    }

    #[test]
    fn test_cycle_rejected_before_other_arguments_apply() {
        let space = ObjectSpace::new();
        let m = space.define_module("Loop").unwrap();
        let other = space.define_module("Other").unwrap();

        assert!(space.include(&m, &[&other, &m]).is_err());
        assert!(m.chain().is_empty());
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let space = ObjectSpace::new();
        let a = space.define_module("A").unwrap();
        let b = space.define_module("B").unwrap();
        let c = space.define_module("C").unwrap();
        space.include(&b, &[&a]).unwrap();
        space.include(&c, &[&b]).unwrap();

        let err = space.include(&a, &[&c]).unwrap_err();
        assert_eq!(err.kind(), strata_runtime::ErrorKind::ArgumentError);
        assert!(a.chain().is_empty());
    }
}

// =============================================================================
// Extend
// =============================================================================

mod extend {
    use super::*;

    #[test]
    fn test_extend_module_adds_singleton_methods() {
        let space = ObjectSpace::new();
        let helpers = space.define_module("Helpers").unwrap();
        space.define_method(&helpers, "version", constant("1.0")).unwrap();
        let app = space.define_module("App").unwrap();
        let receiver = Value::Module(app.clone());

        space.extend(&receiver, &[&helpers]).unwrap();

        assert_eq!(space.send(&receiver, "version", &[]).unwrap(), Value::string("1.0"));
        assert!(space.resolve(&app, "version").is_none());
    }

    #[test]
    fn test_extend_hooks_receive_target() {
        let space = ObjectSpace::new();
        let class = space.define_class("Thing", None).unwrap();
        let mixin = space.define_module("Tagged").unwrap();
        let extended = count_hook(&space, &mixin, "extended");

        let thing = space.new_instance(&class, &[]).unwrap();
        space.extend(&thing, &[&mixin]).unwrap();

        assert_eq!(extended.load(Ordering::SeqCst), 1);
        let singleton = space.singleton_class(&thing).unwrap();
        assert_eq!(names(&singleton.chain().modules()), vec!["Tagged"]);
    }

    #[test]
    fn test_extend_rejects_classes() {
        let space = ObjectSpace::new();
        let class = space.define_class("Plain", None).unwrap();
        let target = space.new_instance(&class, &[]).unwrap();

        let err = space.extend(&target, &[&class]).unwrap_err();
        assert_eq!(err.to_string(), "wrong argument type Class (expected Module)");
    }
}
