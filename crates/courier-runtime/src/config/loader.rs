//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML config file (`courier.toml`, with the `toml-config` feature)
//! 3. Environment variables (`COURIER_*`, `__` as the nesting separator)
//!
//! # Environment Variable Mapping
//!
//! - `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `COURIER_WORKER__QUEUE_SIZE=64` → `worker.queue_size = 64`
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! // or from a specific file:
//! let config = ConfigLoader::new().file("./config/courier.toml").load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::debug;

use super::error::ConfigResult;
use super::schema::CourierConfig;

/// Default config file name searched in the working directory.
#[cfg(feature = "toml-config")]
const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Environment variable prefix.
const ENV_PREFIX: &str = "COURIER_";

/// Layered configuration loader.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    use_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with the default source set (default file locations
    /// plus environment variables).
    pub fn new() -> Self {
        Self {
            file: None,
            use_env: true,
        }
    }

    /// Loads from a specific file instead of the default locations.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables the environment variable source.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        #[cfg(feature = "toml-config")]
        {
            let path = self
                .file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() {
                debug!(path = %path.display(), "loading config file");
                figment = figment.merge(Toml::file(path));
            }
        }

        if self.use_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: CourierConfig = figment.extract()?;
        Ok(config)
    }
}

/// Loads the configuration from the default sources.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}
