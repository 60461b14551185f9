//! Configuration loading for the Courier runtime.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config};
pub use schema::{CourierConfig, LogFormat, LoggingConfig, WorkerConfig};
