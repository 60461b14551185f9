//! The sequential update worker.
//!
//! The dispatch core is strictly sequential per update and blocks on network
//! I/O — under rate limiting, on sleeps of up to ten minutes. Hosts must
//! therefore run dispatch on a dedicated task so a rate-limited update cannot
//! stall the rest of the process. [`UpdateWorker::spawn`] provides that task:
//! it owns the dispatcher, receives updates over a bounded channel, and fully
//! dispatches one update (all matching filters, all sends, all retries)
//! before taking the next.
//!
//! ```rust,ignore
//! use courier_runtime::worker::UpdateWorker;
//!
//! let handle = UpdateWorker::spawn(dispatcher, &config.worker);
//! handle.enqueue(update).await?;
//! handle.shutdown().await;
//! ```

use courier_core::{Dispatcher, Update};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::WorkerConfig;

/// Errors surfacing from the worker handle.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The worker has shut down; the update was not enqueued.
    #[error("update worker is no longer running")]
    Closed,
}

/// The dispatch worker task.
pub struct UpdateWorker;

impl UpdateWorker {
    /// Spawns the worker task and returns its handle.
    ///
    /// The task runs [`Dispatcher::do_startup`] first; a failing startup hook
    /// is logged and the worker exits without taking updates.
    pub fn spawn(dispatcher: Dispatcher, config: &WorkerConfig) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        let cancel = CancellationToken::new();
        let join = tokio::spawn(run(dispatcher, rx, cancel.clone(), config.drain_on_shutdown));
        WorkerHandle { tx, cancel, join }
    }
}

async fn run(
    mut dispatcher: Dispatcher,
    mut rx: mpsc::Receiver<Update>,
    cancel: CancellationToken,
    drain_on_shutdown: bool,
) {
    if let Err(err) = dispatcher.do_startup().await {
        tracing::error!(error = %err, "startup failed, worker not accepting updates");
        return;
    }
    info!("update worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = rx.recv() => match maybe {
                Some(update) => dispatcher.process_update(&update).await,
                // All senders dropped.
                None => {
                    debug!("update channel closed, worker exiting");
                    return;
                }
            },
        }
    }

    if drain_on_shutdown {
        rx.close();
        let mut drained = 0usize;
        while let Some(update) = rx.recv().await {
            dispatcher.process_update(&update).await;
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, "drained queued updates during shutdown");
        }
    }
    info!("update worker stopped");
}

/// Handle for feeding and stopping an [`UpdateWorker`].
pub struct WorkerHandle {
    tx: mpsc::Sender<Update>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Enqueues one update, waiting for queue capacity.
    pub async fn enqueue(&self, update: Update) -> Result<(), WorkerError> {
        self.tx.send(update).await.map_err(|_| WorkerError::Closed)
    }

    /// A cloneable sender for the update queue.
    pub fn sender(&self) -> mpsc::Sender<Update> {
        self.tx.clone()
    }

    /// Requests shutdown and waits for the worker to finish.
    ///
    /// With `drain_on_shutdown` enabled, updates already queued are still
    /// dispatched before this returns.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.tx);
        let _ = self.join.await;
    }
}
