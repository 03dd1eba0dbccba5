//! Built-in methods of `Object`, `Module` and `Class`.
//!
//! Installed once at bootstrap. The composition hooks (`append_features`,
//! `included`, `extend_object`, `extended`) live here as ordinary private
//! methods, so a module can override them with a singleton method and the
//! override is found first.

use crate::method::{Arity, NativeMethod, Visibility};
use crate::object::ModuleRef;
use crate::space::ObjectSpace;
use crate::value::{Value, normalize_name};
use smallvec::SmallVec;
use strata_core::{StrataError, StrataResult, Symbol};

/// Install every built-in method into `space`.
pub fn install(space: &ObjectSpace) {
    install_object(space);
    install_module(space);
    install_class(space);
}

fn native<F>(
    space: &ObjectSpace,
    owner: &ModuleRef,
    name: &'static str,
    arity: Arity,
    visibility: Visibility,
    func: F,
) where
    F: Fn(&ObjectSpace, &Value, &[Value]) -> StrataResult<Value> + Send + Sync + 'static,
{
    let handle = NativeMethod::new(name, arity, func).into_handle();
    // Defining into a bootstrap class cannot fail.
    let _ = space.define_method_with(owner, name, handle, visibility);
}

fn receiver_module(receiver: &Value) -> StrataResult<&ModuleRef> {
    receiver
        .as_module()
        .ok_or_else(|| StrataError::wrong_argument_type(receiver.type_name(), "Module"))
}

fn argument_module(value: &Value) -> StrataResult<&ModuleRef> {
    value
        .as_module()
        .ok_or_else(|| StrataError::wrong_argument_type(value.type_name(), "Module"))
}

fn names(args: &[Value]) -> StrataResult<SmallVec<[Symbol; 4]>> {
    args.iter().map(normalize_name).collect()
}

// =============================================================================
// Object
// =============================================================================

fn install_object(space: &ObjectSpace) {
    use Visibility::{Private, Public};
    let object = space.object_class().clone();

    native(space, &object, "class", Arity::Exact(0), Public, |space, recv, _| {
        Ok(Value::Module(space.class_of(recv)))
    });

    native(space, &object, "singleton_class", Arity::Exact(0), Public, |space, recv, _| {
        space.singleton_class(recv).map(Value::Module)
    });

    native(space, &object, "inspect", Arity::Exact(0), Public, |_, recv, _| {
        Ok(Value::string(recv.inspect()))
    });

    native(space, &object, "respond_to?", Arity::AtLeast(1), Public, |space, recv, args| {
        let selector = normalize_name(&args[0])?;
        let include_private = args.get(1).is_some_and(Value::truthy);
        Ok(Value::Bool(space.respond_to(recv, selector, include_private)))
    });

    native(space, &object, "send", Arity::AtLeast(1), Public, |space, recv, args| {
        let selector = normalize_name(&args[0])?;
        space.call(recv, selector, &args[1..])
    });

    native(space, &object, "extend", Arity::AtLeast(1), Public, |space, recv, args| {
        space.extend(recv, args)?;
        Ok(recv.clone())
    });

    native(space, &object, "instance_variable_get", Arity::Exact(1), Public, |space, recv, args| {
        space.instance_variable_get(recv, normalize_name(&args[0])?)
    });

    native(space, &object, "instance_variable_set", Arity::Exact(2), Public, |space, recv, args| {
        space.instance_variable_set(recv, normalize_name(&args[0])?, args[1].clone())
    });

    native(space, &object, "initialize", Arity::Exact(0), Private, |_, _, _| Ok(Value::Nil));
}

// =============================================================================
// Module
// =============================================================================

fn install_module(space: &ObjectSpace) {
    use Visibility::{Private, Public};
    let module = space.module_class().clone();

    // Composition hooks.
    native(space, &module, "append_features", Arity::Exact(1), Private, |space, recv, args| {
        space.append_features(receiver_module(recv)?, argument_module(&args[0])?)?;
        Ok(recv.clone())
    });
    native(space, &module, "included", Arity::Exact(1), Private, |_, _, _| Ok(Value::Nil));
    native(space, &module, "extend_object", Arity::Exact(1), Private, |space, recv, args| {
        space.extend_object(receiver_module(recv)?, &args[0])?;
        Ok(args[0].clone())
    });
    native(space, &module, "extended", Arity::Exact(1), Private, |_, _, _| Ok(Value::Nil));

    native(space, &module, "include", Arity::AtLeast(1), Public, |space, recv, args| {
        space.include(receiver_module(recv)?, args)?;
        Ok(recv.clone())
    });

    // Accessors.
    native(space, &module, "attr_reader", Arity::Any, Public, |space, recv, args| {
        space.attr_reader(receiver_module(recv)?, names(args)?.as_slice())?;
        Ok(Value::Nil)
    });
    native(space, &module, "attr_writer", Arity::Any, Public, |space, recv, args| {
        space.attr_writer(receiver_module(recv)?, names(args)?.as_slice())?;
        Ok(Value::Nil)
    });
    native(space, &module, "attr_accessor", Arity::Any, Public, |space, recv, args| {
        space.attr_accessor(receiver_module(recv)?, names(args)?.as_slice())?;
        Ok(Value::Nil)
    });

    // Method table.
    native(space, &module, "alias_method", Arity::Exact(2), Private, |space, recv, args| {
        let new_name = normalize_name(&args[0])?;
        let current_name = normalize_name(&args[1])?;
        space.alias_method(receiver_module(recv)?, new_name, current_name)?;
        Ok(recv.clone())
    });
    native(space, &module, "remove_method", Arity::AtLeast(1), Private, |space, recv, args| {
        let module = receiver_module(recv)?;
        for selector in names(args)? {
            space.remove_method(module, selector)?;
        }
        Ok(recv.clone())
    });
    native(space, &module, "method_defined?", Arity::Exact(1), Public, |space, recv, args| {
        let selector = normalize_name(&args[0])?;
        let visible = space
            .method_visibility(receiver_module(recv)?, selector)
            .is_some_and(|v| v == Visibility::Public);
        Ok(Value::Bool(visible))
    });

    // Visibility. Bare forms need a module body and are not available here.
    native(space, &module, "public", Arity::AtLeast(1), Private, |space, recv, args| {
        space.public(receiver_module(recv)?, names(args)?.as_slice())?;
        Ok(recv.clone())
    });
    native(space, &module, "private", Arity::AtLeast(1), Private, |space, recv, args| {
        space.private(receiver_module(recv)?, names(args)?.as_slice())?;
        Ok(recv.clone())
    });
    native(space, &module, "module_function", Arity::AtLeast(1), Private, |space, recv, args| {
        space
            .module_function(receiver_module(recv)?, names(args)?.as_slice())
            .map(Value::Module)
    });

    // Constants.
    native(space, &module, "const_get", Arity::Exact(1), Public, |space, recv, args| {
        let name = normalize_name(&args[0])?;
        space.const_get(receiver_module(recv)?, name.as_str())
    });
    native(space, &module, "const_set", Arity::Exact(2), Public, |space, recv, args| {
        let name = normalize_name(&args[0])?;
        space.const_set(receiver_module(recv)?, name.as_str(), args[1].clone())
    });
    native(space, &module, "const_defined?", Arity::Exact(1), Public, |space, recv, args| {
        let name = normalize_name(&args[0])?;
        space
            .const_defined(receiver_module(recv)?, name.as_str())
            .map(Value::Bool)
    });
    native(space, &module, "remove_const", Arity::Exact(1), Private, |space, recv, args| {
        let name = normalize_name(&args[0])?;
        space.remove_const(receiver_module(recv)?, name.as_str())
    });

    native(space, &module, "name", Arity::Exact(0), Public, |_, recv, _| {
        Ok(receiver_module(recv)?
            .name()
            .map(|name| Value::string(&*name))
            .unwrap_or_default())
    });

    native(space, &module, "ffi_lib", Arity::Exact(1), Private, |space, recv, args| {
        let library = args[0]
            .as_str()
            .ok_or_else(|| StrataError::wrong_argument_type(args[0].type_name(), "String"))?;
        space.ffi_lib(receiver_module(recv)?, library);
        Ok(args[0].clone())
    });
}

// =============================================================================
// Class
// =============================================================================

fn install_class(space: &ObjectSpace) {
    use Visibility::Public;
    let class = space.class_class().clone();

    native(space, &class, "new", Arity::Any, Public, |space, recv, args| {
        space.new_instance(receiver_module(recv)?, args)
    });

    native(space, &class, "allocate", Arity::Exact(0), Public, |space, recv, _| {
        space.allocate(receiver_module(recv)?)
    });

    native(space, &class, "superclass", Arity::Exact(0), Public, |_, recv, _| {
        Ok(receiver_module(recv)?
            .superclass()
            .cloned()
            .map(Value::Module)
            .unwrap_or_default())
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::intern;

    #[test]
    fn test_attr_accessor_via_send() {
        let space = ObjectSpace::new();
        let class = space.define_class("Pair", None).unwrap();
        let receiver = Value::Module(class.clone());
        space
            .send(&receiver, "attr_accessor", &[Value::Symbol(intern("left"))])
            .unwrap();

        let pair = space.send(&receiver, "new", &[]).unwrap();
        space.send(&pair, "left=", &[Value::Int(1)]).unwrap();
        assert_eq!(space.send(&pair, "left", &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_attr_rejects_non_names() {
        let space = ObjectSpace::new();
        let class = space.define_class("Strict", None).unwrap();
        let err = space
            .send(&Value::Module(class), "attr_reader", &[Value::Int(1)])
            .unwrap_err();
        assert_eq!(err.to_string(), "1 is not a symbol");
    }

    #[test]
    fn test_hooks_are_private() {
        let space = ObjectSpace::new();
        let m = space.define_module("Hooked").unwrap();
        let host = space.define_class("Target", None).unwrap();
        let err = space
            .send(&Value::Module(m), "append_features", &[Value::Module(host)])
            .unwrap_err();
        assert!(matches!(err, StrataError::PrivateCall { .. }));
    }

    #[test]
    fn test_include_via_send() {
        let space = ObjectSpace::new();
        let m = space.define_module("Sent").unwrap();
        let host = space.define_class("Receiver", None).unwrap();
        space
            .send(&Value::Module(host.clone()), "include", &[Value::Module(m.clone())])
            .unwrap();
        assert!(host.chain().contains(&m));
    }

    #[test]
    fn test_class_and_superclass() {
        let space = ObjectSpace::new();
        let base = space.define_class("Shape", None).unwrap();
        let square = space.define_class("Square", Some(&base)).unwrap();
        let sq = space.new_instance(&square, &[]).unwrap();

        assert_eq!(space.send(&sq, "class", &[]).unwrap(), Value::Module(square.clone()));
        assert_eq!(
            space.send(&Value::Module(square), "superclass", &[]).unwrap(),
            Value::Module(base)
        );
        assert_eq!(
            space
                .send(&Value::Module(space.object_class().clone()), "superclass", &[])
                .unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_respond_to_builtin() {
        let space = ObjectSpace::new();
        let args = [Value::string("inspect")];
        assert_eq!(
            space.send(&Value::Int(1), "respond_to?", &args).unwrap(),
            Value::Bool(true)
        );
        let args = [Value::string("initialize")];
        assert_eq!(
            space.send(&Value::Int(1), "respond_to?", &args).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_send_bypasses_visibility() {
        let space = ObjectSpace::new();
        let class = space.define_class("Locked", None).unwrap();
        let obj = space.new_instance(&class, &[]).unwrap();
        let args = [Value::string("initialize")];
        assert_eq!(space.send(&obj, "send", &args).unwrap(), Value::Nil);
    }

    #[test]
    fn test_module_name() {
        let space = ObjectSpace::new();
        let m = space.define_module("Labelled").unwrap();
        assert_eq!(
            space.send(&Value::Module(m), "name", &[]).unwrap(),
            Value::string("Labelled")
        );
        let anon = space.new_module();
        assert_eq!(space.send(&Value::Module(anon), "name", &[]).unwrap(), Value::Nil);
    }
}
