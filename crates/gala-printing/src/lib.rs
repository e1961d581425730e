//! # gala-printing
//!
//! gdb-style pretty printers on top of a native debugger's formatter
//! registry.
//!
//! - [`printer`]: the printer protocol (`to_string`, `children`, `display_hint`)
//! - [`collection`]: printer collections, subprinters and their matchers
//! - [`registry`]: the session's registered collections
//! - [`bridge`]: installs collections as engine formatter categories
//! - [`synthetic`]: the per-value children provider

pub mod bridge;
pub mod collection;
pub mod printer;
pub mod registry;
pub mod synthetic;

pub use bridge::FormatterBridge;
pub use collection::{MatchStrategy, PrinterCollection, Subprinter};
pub use printer::{Child, ChildValue, Children, DisplayHint, Printer};
pub use registry::Registry;
