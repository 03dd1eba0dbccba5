//! Sending a selector to a receiver.
//!
//! # Visibility
//!
//! An explicit-receiver send (`obj.foo`) may not invoke a private method.
//! A functional send (`foo` with an implicit `self`) may. Hooks such as
//! `append_features` and `included` are invoked functionally.
//!
//! # Method Missing
//!
//! When nothing binds the selector, `method_missing` is resolved on the same
//! dispatch class and invoked with the selector symbol prepended to the
//! arguments. If that is absent too, the send fails with `NoMethod`.

use crate::space::ObjectSpace;
use crate::value::Value;
use smallvec::SmallVec;
use strata_core::{StrataError, StrataResult, Symbol, intern};
use tracing::trace;

/// How a send was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `receiver.selector(args)`: private methods are rejected.
    Explicit,
    /// `selector(args)` on an implicit receiver: private methods allowed.
    Functional,
}

/// Resolve and invoke `selector` on `receiver`.
pub fn call_method(
    space: &ObjectSpace,
    receiver: &Value,
    selector: Symbol,
    args: &[Value],
    kind: CallKind,
) -> StrataResult<Value> {
    let class = space.dispatch_class(receiver);

    match space.resolve(&class, selector) {
        Some(found) => {
            if found.is_private() && kind == CallKind::Explicit {
                return Err(StrataError::private_call(
                    selector.as_str(),
                    receiver.describe(),
                ));
            }
            found.handle().call(space, selector, receiver, args)
        }
        None => method_missing(space, receiver, selector, args),
    }
}

fn method_missing(
    space: &ObjectSpace,
    receiver: &Value,
    selector: Symbol,
    args: &[Value],
) -> StrataResult<Value> {
    let missing = intern("method_missing");
    let class = space.dispatch_class(receiver);

    let handler = if selector == missing {
        None
    } else {
        space.resolve(&class, missing)
    };

    let Some(handler) = handler else {
        return Err(StrataError::no_method(
            selector.as_str(),
            receiver.describe(),
        ));
    };

    trace!(receiver = %receiver.describe(), selector = %selector, "method_missing");
    let mut forwarded: SmallVec<[Value; 8]> = SmallVec::with_capacity(args.len() + 1);
    forwarded.push(Value::Symbol(selector));
    forwarded.extend(args.iter().cloned());
    handler
        .handle()
        .call(space, missing, receiver, &forwarded)
}

/// Whether `receiver` has a binding for `selector`.
///
/// Private bindings count only when `include_private` is set. A
/// `method_missing` handler does not make a receiver respond.
pub fn respond_to(
    space: &ObjectSpace,
    receiver: &Value,
    selector: Symbol,
    include_private: bool,
) -> bool {
    let class = space.dispatch_class(receiver);
    match space.resolve(&class, selector) {
        Some(found) => include_private || !found.is_private(),
        None => false,
    }
}

// =============================================================================
// Tests
// =============================================================================
