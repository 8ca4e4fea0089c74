//! Logging infrastructure for ado-mobile.
//!
//! Logging is off unless a level is requested. When enabled it writes to
//! stderr or to a file, as text or JSON, and only records events from this
//! crate so HTTP and TLS internals stay quiet.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable for the log level.
pub const LOG_LEVEL_ENV: &str = "ADO_MOBILE_LOG_LEVEL";
/// Environment variable for the log file path.
pub const LOG_FILE_ENV: &str = "ADO_MOBILE_LOG_FILE";
/// Environment variable for the log format.
pub const LOG_FORMAT_ENV: &str = "ADO_MOBILE_LOG_FORMAT";

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to a filter string for tracing-subscriber.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse a log format from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level (None means logging is disabled).
    pub level: Option<LogLevel>,
    /// Output file path (None means stderr).
    pub file: Option<PathBuf>,
    /// Output format.
    pub format: LogFormat,
}

/// Guard that must be held to ensure logs are flushed.
///
/// When this guard is dropped, all pending log messages are flushed.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Builds the target filter for a level. Only this crate's events pass.
fn crate_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!("ado_mobile={}", level.as_filter_str()))
}

/// Initialize the logging system.
///
/// Returns `None` when logging is disabled or the log file cannot be opened.
///
/// # Example
///
/// ```rust,no_run
/// use ado_mobile::logging::{LogConfig, LogLevel, LogFormat, init_logging};
/// use std::path::PathBuf;
///
/// let config = LogConfig {
///     level: Some(LogLevel::Debug),
///     file: Some(PathBuf::from("/tmp/ado-mobile.log")),
///     format: LogFormat::Json,
/// };
///
/// let _guard = init_logging(config);
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;
    let filter = crate_filter(level);

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let to_file = config.file.is_some();

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(to_file)
                .with_line_number(to_file);

            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .ok()?;
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_ansi(!to_file)
                .with_file(to_file)
                .with_line_number(to_file);

            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .ok()?;
        }
    }

    Some(LogGuard { _worker: guard })
}

/// Parse logging configuration from command-line arguments and environment.
///
/// Runs before clap so that argument parsing itself can be traced.
/// Precedence: CLI args > environment variables.
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    let level_str =
        extract_arg_value(args, "--log-level").or_else(|| std::env::var(LOG_LEVEL_ENV).ok());
    let file_str =
        extract_arg_value(args, "--log-file").or_else(|| std::env::var(LOG_FILE_ENV).ok());
    let format_str =
        extract_arg_value(args, "--log-format").or_else(|| std::env::var(LOG_FORMAT_ENV).ok());

    LogConfig {
        level: level_str.and_then(|s| LogLevel::parse(&s)),
        file: file_str.filter(|s| !s.is_empty()).map(PathBuf::from),
        format: format_str
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default(),
    }
}

/// Extract a value following a flag, accepting both `--flag value` and `--flag=value`.
fn extract_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == flag {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix(&prefix).map(str::to_string)
        }
    })
}
