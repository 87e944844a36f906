//! Logging infrastructure - structured tracing for the harness
//!
//! Design: uses `tracing` for structured, contextual logging with:
//! - Configurable level, format and destination
//! - Non-blocking writers via `tracing-appender`
//! - Zero-cost on the allocation hot path when `trace` is filtered out

use crate::errors::{AllocError, ConfigError, HeapFault};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with timestamps
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for machine consumption
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// File with daily rotation
    File { directory: String, prefix: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Emit span open/close events
    pub span_events: bool,
    /// Extra filter directives (e.g. "tlab_bench=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build config from a variable lookup, rejecting an unknown level.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // TLAB_LOG_LEVEL: trace, debug, info, warn, error
        if let Some(level) = lookup("TLAB_LOG_LEVEL") {
            config.level = parse_level(&level).ok_or(ConfigError::UnknownLogLevel(level))?;
        }

        // TLAB_LOG_FILE: directory for rolling log files
        if let Some(directory) = lookup("TLAB_LOG_FILE") {
            config.output = LogOutput::File {
                directory,
                prefix: "tlab-bench".to_string(),
            };
        }

        if lookup("TLAB_LOG_JSON").is_some() {
            config.format = LogFormat::Json;
        }

        Ok(config)
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Parse a level name as accepted by `TLAB_LOG_LEVEL` and `--log-level`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize the global subscriber.
///
/// Returns the writer guard, which must stay alive until the program exits
/// so buffered lines get flushed. Later calls are no-ops and return `None`.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    if LOGGER_INITIALIZED.set(()).is_err() {
        return None;
    }

    let filter = build_filter(&config);
    let spans = span_events_config(config.span_events);

    let (writer, guard) = match config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
    };

    // Another subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::registry().with(layer).try_init();
    Some(guard)
}

/// Whether [`init_logging`] has run.
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    match &config.filter {
        Some(directives) => directives
            .split(',')
            .map(str::trim)
            .filter_map(|directive| match directive.parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    tracing::warn!("Invalid filter directive: {}", directive);
                    None
                }
            })
            .fold(base, |filter, directive| filter.add_directive(directive)),
        None => base,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

// ============================================================================
// Harness events
// ============================================================================

/// Log a fresh arena buffer reservation
#[inline]
pub fn log_arena_reserved(capacity: usize, reservations: u64) {
    tracing::trace!(
        event = "arena_reserved",
        capacity_bytes = capacity,
        reservations,
        "Arena buffer reserved"
    );
}

/// Log the start of a reclamation cycle
#[inline]
pub fn log_reclaim_start(strategy: &str, outstanding: usize) {
    tracing::trace!(
        event = "reclaim_start",
        strategy,
        outstanding,
        "Reclamation starting"
    );
}

/// Log a completed reclamation cycle
#[inline]
pub fn log_reclaim_complete(strategy: &str, reclaimed: usize, cycle: u64) {
    tracing::trace!(
        event = "reclaim_complete",
        strategy,
        reclaimed,
        cycle,
        "Reclamation complete"
    );
}

/// Log a reclamation that left the context faulted
pub fn log_reclaim_failed(strategy: &str, error: &AllocError) {
    tracing::error!(
        event = "reclaim_failed",
        strategy,
        kind = error.kind(),
        error = %error,
        "Reclamation failed"
    );
}

/// Log a heap refusing to release a block
pub fn log_release_fault(address: usize, fault: &HeapFault) {
    tracing::warn!(
        event = "release_fault",
        address,
        error = %fault,
        "Heap release failed"
    );
}

/// Log an allocation failure surfaced to the driver
pub fn log_alloc_failed(strategy: &str, request: u64, error: &AllocError) {
    tracing::error!(
        event = "alloc_failed",
        strategy,
        request,
        kind = error.kind(),
        error = %error,
        "Object request failed"
    );
}

/// Log a finished benchmark run
pub fn log_run_complete(strategy: &str, iterations: u64, reclamations: u64, elapsed: Duration) {
    tracing::info!(
        event = "run_complete",
        strategy,
        iterations,
        reclamations,
        elapsed_ms = elapsed.as_millis() as u64,
        "Benchmark run complete"
    );
}
