//! Logging setup for the Courier runtime.
//!
//! A thin, configuration-driven wrapper over `tracing-subscriber`.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use courier_runtime::config::load_config;
//! use courier_runtime::logging;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use courier_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new().directives("courier=debug,info").init();
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging from a [`LoggingConfig`].
///
/// Tolerant of double initialization: a second call is a no-op.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builder for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    directives: String,
    format: LogFormat,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder with `info`-level defaults.
    pub fn new() -> Self {
        Self {
            directives: "info".to_owned(),
            format: LogFormat::Full,
            with_target: true,
        }
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            directives: config.level.clone(),
            format: config.format,
            with_target: config.with_target,
        }
    }

    /// Sets the filter directives (overridden by `RUST_LOG` when set).
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Includes or omits the event target.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn filter(&self) -> EnvFilter {
        // RUST_LOG wins over the configured directives.
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.directives))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Installs the subscriber, panicking when one is already set.
    pub fn init(self) {
        self.try_init().expect("logging already initialized");
    }

    /// Installs the subscriber, reporting failure instead of panicking.
    pub fn try_init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let filter = self.filter();
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.with_target);

        match self.format {
            LogFormat::Full => builder.try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => builder.json().try_init(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => {
                tracing::warn!("json-log feature disabled, falling back to full format");
                builder.try_init()
            }
        }
    }
}
