//! Runtime values.
//!
//! Immediates (nil, booleans, integers, symbols) and strings are compared by
//! value. Objects and modules are references and compare by identity.

use crate::object::{ModuleRef, ObjectRef};
use std::fmt;
use std::sync::Arc;
use strata_core::{StrataError, StrataResult, Symbol};

/// A runtime value.
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Symbol(Symbol),
    /// An instance allocated by a class.
    Object(ObjectRef),
    /// A module, class or metaclass.
    Module(ModuleRef),
}

impl Value {
    #[inline]
    pub fn nil() -> Self {
        Value::Nil
    }

    /// Build a string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `nil` and `false` is truthy.
    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the built-in class of an immediate, or the class of a reference.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "NilClass".to_string(),
            Value::Bool(true) => "TrueClass".to_string(),
            Value::Bool(false) => "FalseClass".to_string(),
            Value::Int(_) => "Integer".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Symbol(_) => "Symbol".to_string(),
            Value::Object(o) => o.class().to_string(),
            Value::Module(m) if m.is_class() => "Class".to_string(),
            Value::Module(_) => "Module".to_string(),
        }
    }

    /// Short human-readable form.
    pub fn inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => format!("{:?}", s),
            Value::Symbol(s) => format!(":{}", s),
            Value::Object(o) => format!("#<{}>", o.class()),
            Value::Module(m) => m.to_string(),
        }
    }

    /// Receiver description used by dispatch errors, e.g. `nil:NilClass`.
    pub fn describe(&self) -> String {
        match self {
            Value::Object(_) | Value::Module(_) => self.inspect(),
            _ => format!("{}:{}", self.inspect(), self.type_name()),
        }
    }
}

/// Convert a selector argument (symbol or string) to a symbol.
pub fn normalize_name(value: &Value) -> StrataResult<Symbol> {
    match value {
        Value::Symbol(sym) => Ok(*sym),
        Value::Str(s) => Ok(strata_core::intern(s)),
        other => Err(StrataError::type_mismatch(format!(
            "{} is not a symbol",
            other.inspect()
        ))),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl From<ModuleRef> for Value {
    fn from(module: ModuleRef) -> Self {
        Value::Module(module)
    }
}

impl From<&ModuleRef> for Value {
    fn from(module: &ModuleRef) -> Self {
        Value::Module(module.clone())
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl From<&ObjectRef> for Value {
    fn from(object: &ObjectRef) -> Self {
        Value::Object(object.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
