//! # Logging Utilities
//!
//! Logging setup for gala on top of `tracing`.
//!
//! Two deployments are covered:
//! - the `gala` CLI, which logs to the console and optionally to a file
//! - gala loaded inside a debugger, which must not write to the debugger's
//!   terminal and logs to a dated file instead
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=gala_printing=debug`)
//! - `GALA_LOG_FORMAT`: `pretty` (default) or `json`
//! - `GALA_LOG_FILE`: optional log file, in addition to the console
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gala_utils::init_logging;
//!
//! let _logging = init_logging()?;
//! tracing::info!("gala started");
//! # Ok::<(), gala_utils::LoggingError>(())
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Local;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel
{
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Logging settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfig
{
    pub format: LogFormat,
    /// Filter directive, e.g. `info` or `gala_core=debug`
    pub filter: Option<String>,
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read `GALA_LOG_FORMAT`, `RUST_LOG` and `GALA_LOG_FILE`.
    ///
    /// ## Errors
    ///
    /// - `InvalidFormat`: `GALA_LOG_FORMAT` is set to an unknown format
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LoggingConfig::from_env`], reading variables through `lookup`.
    ///
    /// ## Errors
    ///
    /// - `InvalidFormat`: the format variable holds an unknown format
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError>
    {
        let format = match lookup("GALA_LOG_FORMAT") {
            Some(format) => format.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self {
            format,
            filter: lookup("RUST_LOG").filter(|filter| !filter.trim().is_empty()),
            file: lookup("GALA_LOG_FILE").filter(|path| !path.is_empty()).map(PathBuf::from),
        })
    }

    /// The filter directive, or `fallback` when none is set or it does not parse.
    fn directive(&self, fallback: Level) -> String
    {
        self.filter
            .clone()
            .filter(|filter| EnvFilter::try_new(filter).is_ok())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Keeps file logging alive
///
/// File output goes through a background writer that stops when this guard
/// is dropped. Hold it for as long as logging is needed.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard
{
    file: Option<PathBuf>,
    _worker: Option<WorkerGuard>,
}

impl LogGuard
{
    /// The log file being written, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

/// Initialise console logging (plus `GALA_LOG_FILE`) from the environment.
///
/// ## Errors
///
/// - `InvalidFormat`: bad `GALA_LOG_FORMAT`
/// - `FileError`: the log file's directory cannot be created
/// - `InitializationFailed`: a global subscriber is already installed
pub fn init_logging() -> Result<LogGuard, LoggingError>
{
    let config = LoggingConfig::from_env()?;
    init(&config, &config.directive(Level::INFO), true)
}

/// Initialise console logging at `level`, ignoring `RUST_LOG`.
///
/// ## Example
///
/// ```rust,no_run
/// use gala_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _logging = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)?;
/// # Ok::<(), gala_utils::LoggingError>(())
/// ```
///
/// ## Errors
///
/// - `FileError`: the `GALA_LOG_FILE` directory cannot be created
/// - `InitializationFailed`: a global subscriber is already installed
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LogGuard, LoggingError>
{
    let config = LoggingConfig {
        format,
        filter: None,
        file: env::var("GALA_LOG_FILE").ok().filter(|path| !path.is_empty()).map(PathBuf::from),
    };
    init(&config, &Level::from(level).to_string(), true)
}

/// Initialise file-only logging for gala running inside a debugger.
///
/// Logs go to `~/.gala/YYYY-MM-DD-gala.log` (or the temp directory when there
/// is no home directory). `level` overrides `RUST_LOG` when given.
///
/// ## Errors
///
/// - `FileError`: the log directory cannot be created
/// - `InitializationFailed`: a global subscriber is already installed
pub fn init_logging_for_host(level: Option<LogLevel>) -> Result<LogGuard, LoggingError>
{
    let directory = env::var_os("HOME").map_or_else(env::temp_dir, |home| PathBuf::from(home).join(".gala"));
    let file = directory.join(format!("{}-gala.log", Local::now().format("%Y-%m-%d")));

    let mut config = LoggingConfig::from_env().unwrap_or_default();
    config.file = Some(file);
    let directive = match level {
        Some(level) => Level::from(level).to_string(),
        None => config.directive(Level::INFO),
    };
    init(&config, &directive, false)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(ansi);
    match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn init(config: &LoggingConfig, directive: &str, console: bool) -> Result<LogGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = LogGuard::default();

    if let Some(path) = &config.file {
        let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(directory)?;
        let file_name = path.file_name().unwrap_or_default();
        // The date is already part of host log names.
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(layer(config.format, writer, false, EnvFilter::new(directive)));
        guard = LogGuard {
            file: Some(path.clone()),
            _worker: Some(worker),
        };
    }
    if console {
        layers.push(layer(config.format, io::stderr, true, EnvFilter::new(directive)));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(Level::from(LogLevel::from_str("dbg").unwrap()), Level::DEBUG);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_config_from_lookup()
    {
        let vars: HashMap<&str, &str> = [
            ("GALA_LOG_FORMAT", "json"),
            ("RUST_LOG", "gala_printing=debug"),
            ("GALA_LOG_FILE", "/tmp/gala.log"),
        ]
        .into_iter()
        .collect();
        let config = LoggingConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter.as_deref(), Some("gala_printing=debug"));
        assert_eq!(config.file, Some(PathBuf::from("/tmp/gala.log")));

        let empty = LoggingConfig::from_lookup(|_| None).unwrap();
        assert_eq!(empty, LoggingConfig::default());

        assert!(LoggingConfig::from_lookup(|key| (key == "GALA_LOG_FORMAT").then(|| "yaml".to_string())).is_err());
    }
}
