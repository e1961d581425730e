//! # gala utilities
//!
//! Logging setup shared by the gala crates and the `gala` CLI, built on
//! `tracing`.

pub mod logging;

pub use logging::{init_logging, init_logging_for_host, init_logging_with_level, LogFormat, LogGuard, LogLevel, LoggingConfig, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
