//! # Courier
//!
//! An update-dispatch and outbound-messaging framework for chat bots.
//!
//! ## Overview
//!
//! Courier routes incoming chat-platform events ("updates") through an
//! ordered chain of filters to registered handler functions, and converts
//! handler return values into platform API calls — with rate-limit retry,
//! text chunking and content-aware photo/document routing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌────────────┐    ┌──────────┐
//! │ Transport │──▶│ UpdateWorker │──▶│ Dispatcher │──▶│ Filters  │
//! │ (yours)   │   │  (runtime)   │    │   (core)   │    │ Handlers │
//! └──────────┘    └──────────────┘    └─────┬──────┘    └──────────┘
//!                                           │ sendables
//!                 ┌──────────────┐    ┌─────▼──────────┐
//!                 │    BotApi    │◀───│ Outbound       │
//!                 │ (your client)│    │ pipeline       │
//!                 └──────────────┘    └────────────────┘
//! ```
//!
//! - **Filters**: predicate + handler pairs, evaluated in registration order
//! - **Dispatcher**: per-filter failure isolation, abort short-circuiting
//! - **Outbound pipeline**: sendable message descriptors, retry/backoff
//! - **Runtime**: config, logging, and the sequential update worker
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut dispatcher = Dispatcher::new(Arc::new(my_bot_client));
//!
//!     dispatcher.register(CommandFilter::new("start", None, |_update, _args| async {
//!         Ok(HandlerOutcome::text("Welcome!"))
//!     }));
//!
//!     let config = courier::runtime::load_config()?;
//!     courier::runtime::logging::init_from_config(&config.logging);
//!
//!     let worker = courier::runtime::UpdateWorker::spawn(dispatcher, &config.worker);
//!     // feed worker.sender() from your transport …
//!     worker.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `fetch` *(default)*: fetch URL file sources for content classification
//! - `toml-config` *(default)*: TOML configuration files
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use courier_core::prelude::*;
    pub use courier_runtime::worker::{UpdateWorker, WorkerHandle};
}
