//! Core definitions shared by every Strata crate.
//!
//! This crate provides:
//! - The global symbol table (`Symbol`, `intern`)
//! - The error taxonomy of the object model (`StrataError`, `ErrorKind`)
//! - Version constants

pub mod error;
pub mod intern;

pub use error::{ErrorKind, StrataError, StrataResult};
pub use intern::{Symbol, intern};

/// Crate version, shared by all workspace members.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
