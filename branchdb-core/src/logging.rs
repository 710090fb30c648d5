use serde::{Deserialize, Serialize};
use std::io;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::BranchDbError;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (text, json, compact)
    pub format: LogFormat,
    /// Whether to include file and line numbers
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread_id: bool,
    /// Whether to emit span open/close events
    pub include_spans: bool,
}

/// Log output formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact text format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = BranchDbError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(BranchDbError::config_invalid(format!(
                "Invalid log format: {s}. Valid formats are: text, json, compact"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            include_location: false,
            include_thread_id: false,
            include_spans: false,
        }
    }
}

/// Initialize logging with the given configuration.
///
/// Output goes to stderr so command results on stdout stay machine-readable.
pub fn init_logging(config: &LogConfig) -> crate::Result<()> {
    parse_log_level(&config.level)?;

    let directive = format!("branchdb={}", config.level)
        .parse::<Directive>()
        .map_err(|e| BranchDbError::config_invalid(format!("Invalid log directive: {e}")))?;
    // RUST_LOG, when set, replaces the configured level entirely.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn").add_directive(directive),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let init_result = match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(config.include_thread_id)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(config.include_thread_id)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.include_location)
                    .with_thread_ids(config.include_thread_id)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };
    init_result.map_err(|e| {
        BranchDbError::config_invalid(format!("Failed to initialize logging: {e}"))
    })?;

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );

    Ok(())
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> crate::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(BranchDbError::config_invalid(format!(
            "Invalid log level: {level}. Valid levels are: trace, debug, info, warn, error"
        ))),
    }
}

/// Correlation ID tying together the log lines of one command
#[derive(Debug, Clone)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the correlation ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured logging context for one command invocation
pub struct LogContext {
    correlation_id: CorrelationId,
    operation: String,
    component: String,
}

impl LogContext {
    /// Create a new log context
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            operation: operation.into(),
            component: component.into(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Create a tracing span for this context
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "command",
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            component = %self.component
        )
    }

    /// Log an info message with this context
    pub fn info(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::info!("{}", message);
    }

    /// Log an error message with this context
    pub fn error(&self, message: &str) {
        let _guard = self.span().entered();
        tracing::error!("{}", message);
    }
}

/// Configure logging for the CLI.
///
/// `RUST_LOG` overrides the level; `BRANCHDB_LOG_FORMAT` selects the format.
pub fn init_cli_logging(verbose: bool) -> crate::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let format = match std::env::var("BRANCHDB_LOG_FORMAT") {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::Text,
    };
    let config = LogConfig {
        level: default_level.to_string(),
        format,
        include_location: verbose,
        ..Default::default()
    };
    init_logging(&config)
}
