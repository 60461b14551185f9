//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Update-worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Full,
    /// Abbreviated output for dense terminals.
    Compact,
    /// Newline-delimited JSON (requires the `json-log` feature).
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives (e.g. `"info"` or `"courier=debug,info"`).
    ///
    /// The `RUST_LOG` environment variable, when set, takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include the event's target module in the output.
    #[serde(default = "default_true")]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            with_target: default_true(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Update-worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Capacity of the inbound update queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Drain queued updates before completing shutdown.
    #[serde(default = "default_true")]
    pub drain_on_shutdown: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            drain_on_shutdown: default_true(),
        }
    }
}

fn default_queue_size() -> usize {
    128
}
