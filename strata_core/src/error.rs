//! Error taxonomy of the object model.
//!
//! Every failure raised by a structural mutation or a dispatch is a
//! `StrataError`. Nothing is retried or recovered internally: errors surface
//! to the caller of the operation that failed, before any mutation applied.

use thiserror::Error;

/// Result alias used throughout Strata.
pub type StrataResult<T> = Result<T, StrataError>;

// =============================================================================
// Error Kind
// =============================================================================

/// Language-level exception class an error is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeError,
    ArgumentError,
    NameError,
    NoMethodError,
    NotFoundError,
}

impl ErrorKind {
    /// Exception class name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ArgumentError => "ArgumentError",
            ErrorKind::NameError => "NameError",
            ErrorKind::NoMethodError => "NoMethodError",
            ErrorKind::NotFoundError => "FFI::NotFoundError",
        }
    }
}

// =============================================================================
// Strata Error
// =============================================================================

/// An object-model failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrataError {
    /// An argument had the wrong kind, e.g. `include` given a class.
    #[error("{message}")]
    TypeMismatch { message: String },

    /// A module was included into itself.
    #[error("cyclic include detected ({module})")]
    CyclicComposition { module: String },

    /// A method or constant could not be found anywhere in the ancestor chain.
    #[error("{message}")]
    UnresolvedName { name: String, message: String },

    /// A host primitive is missing from its library.
    #[error("Function '{name}' not found in [{library}]")]
    PrimitiveUnavailable { name: String, library: String },

    /// A send found no method and no `method_missing`.
    #[error("undefined method `{selector}' for {receiver}")]
    NoMethod { selector: String, receiver: String },

    /// A private method was sent with an explicit receiver.
    #[error("private method `{selector}' called for {receiver}")]
    PrivateCall { selector: String, receiver: String },

    /// Wrong number of arguments for a fixed-arity method.
    #[error("wrong number of arguments ({given} for {expected}) in `{selector}'")]
    Arity {
        selector: String,
        expected: String,
        given: usize,
    },

    /// An instance could not be allocated.
    #[error("{message}")]
    Allocation { message: String },
}

impl StrataError {
    /// Generic type mismatch with a preformatted message.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    /// `wrong argument type X (expected Y)`.
    pub fn wrong_argument_type(found: impl AsRef<str>, expected: &str) -> Self {
        Self::type_mismatch(format!(
            "wrong argument type {} (expected {})",
            found.as_ref(),
            expected
        ))
    }

    pub fn cyclic(module: impl Into<String>) -> Self {
        Self::CyclicComposition {
            module: module.into(),
        }
    }

    /// A name resolution failure with a diagnostic message.
    pub fn name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedName {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn primitive_unavailable(name: impl Into<String>, library: impl Into<String>) -> Self {
        Self::PrimitiveUnavailable {
            name: name.into(),
            library: library.into(),
        }
    }

    pub fn no_method(selector: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::NoMethod {
            selector: selector.into(),
            receiver: receiver.into(),
        }
    }

    pub fn private_call(selector: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::PrivateCall {
            selector: selector.into(),
            receiver: receiver.into(),
        }
    }

    pub fn arity(selector: impl Into<String>, expected: impl Into<String>, given: usize) -> Self {
        Self::Arity {
            selector: selector.into(),
            expected: expected.into(),
            given,
        }
    }

    pub fn allocation(message: impl Into<String>) -> Self {
        Self::Allocation {
            message: message.into(),
        }
    }

    /// The exception class this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StrataError::TypeMismatch { .. } | StrataError::Allocation { .. } => {
                ErrorKind::TypeError
            }
            StrataError::CyclicComposition { .. } | StrataError::Arity { .. } => {
                ErrorKind::ArgumentError
            }
            StrataError::UnresolvedName { .. } => ErrorKind::NameError,
            StrataError::NoMethod { .. } | StrataError::PrivateCall { .. } => {
                ErrorKind::NoMethodError
            }
            StrataError::PrimitiveUnavailable { .. } => ErrorKind::NotFoundError,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
