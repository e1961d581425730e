//! # gala-core
//!
//! The gdb scripting object model (`Type`, `Value`, session lookups)
//! emulated on top of a native debugger engine.
//!
//! This crate provides:
//! - [`host`]: the traits a native engine implements to host the adapters
//! - [`context`]: the per-thread "current target" guard
//! - [`types`]: the Type Adapter (classification, fields, derived types)
//! - [`value`]: the Value Adapter (numbers, arithmetic, indexing, casts, strings)
//! - [`session`]: `lookup_type`, `parse_and_eval`, `lookup_global`, inferior memory
//! - [`scripts`]: the autoload section codec
//!
//! ## Multiple targets
//!
//! The engine may debug several processes at once. Nothing in this crate
//! reads an ambient global target: values carry their own target, and
//! lookups that have no value to consult read the context entered with
//! [`context::TargetContext::enter`].

pub mod address;
pub mod context;
pub mod error;
pub mod host;
pub mod prelude;
pub mod scripts;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod value;

pub use error::{GalaError, GalaResult};
pub use types::Type;
pub use value::Value;
