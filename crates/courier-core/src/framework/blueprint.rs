//! Deferred-registration blueprints.
//!
//! A [`Blueprint`] lets a module declare its filters and startup hooks before
//! any concrete [`Dispatcher`] exists. Registrations are recorded as a
//! one-directional action list and replayed, in order, when the blueprint is
//! attached — the only moment a dispatcher reference is needed.
//!
//! ```rust,ignore
//! use courier_core::{Blueprint, CommandFilter, HandlerOutcome};
//!
//! let mut features = Blueprint::new("features");
//! features.register(CommandFilter::new("version", None, |_, _| async {
//!     Ok(HandlerOutcome::text("courier 0.1"))
//! }));
//!
//! // later, once the dispatcher exists:
//! features.attach(&mut dispatcher).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

use crate::framework::dispatcher::{Dispatcher, StartupHook};
use crate::framework::filter::Filter;

/// Errors raised when attaching a blueprint.
#[derive(Debug, Clone, Error)]
pub enum BlueprintError {
    /// Two distinct blueprints with the same name were attached to one
    /// dispatcher.
    #[error("blueprint name collision: {name:?} is already attached")]
    NameCollision {
        /// The colliding name.
        name: String,
    },
}

enum DeferredAction {
    Filter(Arc<dyn Filter>),
    Startup(StartupHook),
}

static NEXT_BLUEPRINT_ID: AtomicU64 = AtomicU64::new(1);

/// A named group of deferred registrations.
///
/// Blueprints can be attached to several dispatchers, or to the same one more
/// than once (actions recorded between attachments are replayed on the next
/// one). Names must be unique per dispatcher across distinct blueprints.
pub struct Blueprint {
    name: String,
    id: u64,
    deferred: Vec<DeferredAction>,
}

impl Blueprint {
    /// Creates an empty blueprint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: NEXT_BLUEPRINT_ID.fetch_add(1, Ordering::Relaxed),
            deferred: Vec::new(),
        }
    }

    /// The blueprint's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a filter registration.
    ///
    /// Returns the shared handle, usable with
    /// [`Dispatcher::remove`](crate::Dispatcher::remove) after attachment.
    pub fn register<F: Filter + 'static>(&mut self, filter: F) -> Arc<dyn Filter> {
        let filter: Arc<dyn Filter> = Arc::new(filter);
        self.deferred
            .push(DeferredAction::Filter(Arc::clone(&filter)));
        filter
    }

    /// Records a startup hook.
    pub fn on_startup<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.deferred
            .push(DeferredAction::Startup(Arc::new(move || {
                Box::pin(hook())
            })));
    }

    /// Number of recorded actions.
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Replays the recorded registrations against a dispatcher.
    ///
    /// # Errors
    ///
    /// [`BlueprintError::NameCollision`] when a different blueprint with the
    /// same name is already attached to this dispatcher.
    pub async fn attach(&self, dispatcher: &mut Dispatcher) -> Result<(), BlueprintError> {
        if !dispatcher.note_blueprint(&self.name, self.id) {
            return Err(BlueprintError::NameCollision {
                name: self.name.clone(),
            });
        }
        debug!(
            blueprint = %self.name,
            actions = self.deferred.len(),
            "attaching blueprint"
        );
        for action in &self.deferred {
            match action {
                DeferredAction::Filter(filter) => dispatcher.register_arc(Arc::clone(filter)),
                DeferredAction::Startup(hook) => {
                    // Startup-hook errors only surface from do_startup; at
                    // attach time the hook is merely recorded (or run, when
                    // startup already happened).
                    let _ = dispatcher.add_startup_hook(Arc::clone(hook)).await;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
