//! Logging setup
//!
//! Installs the global `tracing` subscriber for the binary.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Map `-v` occurrences to a level
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Filter directive for `level`, unless `override_filter` (ZNODES_LOG) is set
pub fn filter_directive(level: LogLevel, override_filter: Option<&str>) -> String {
    match override_filter {
        Some(filter) if !filter.trim().is_empty() => filter.to_string(),
        _ => format!("znodes={}", level.to_tracing_level()),
    }
}

/// Initialize the logger
pub fn init_logger(level: LogLevel, override_filter: Option<&str>) {
    let filter = EnvFilter::new(filter_directive(level, override_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
