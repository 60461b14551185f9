//! # Courier Runtime
//!
//! Runtime orchestration for the Courier bot framework:
//!
//! - **Configuration**: layered loading (defaults → `courier.toml` →
//!   `COURIER_*` environment variables) via figment
//! - **Logging**: configuration-driven `tracing-subscriber` setup
//! - **Update worker**: a dedicated task that owns a
//!   [`Dispatcher`](courier_core::Dispatcher) and dispatches queued updates
//!   strictly sequentially, with graceful drain-on-shutdown
//!
//! ```rust,ignore
//! use courier_runtime::{config::load_config, logging, worker::UpdateWorker};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let handle = UpdateWorker::spawn(dispatcher, &config.worker);
//! handle.enqueue(update).await?;
//! handle.shutdown().await;
//! ```

pub mod config;
pub mod logging;
pub mod worker;

pub use config::{ConfigError, ConfigLoader, CourierConfig, load_config};
pub use logging::{LoggingBuilder, init_from_config};
pub use worker::{UpdateWorker, WorkerError, WorkerHandle};
