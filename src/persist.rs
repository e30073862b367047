//! Debounced persistence.
//!
//! Mutations publish their new snapshot here; a single background task waits
//! until no new snapshot has arrived for `window` and then writes the newest
//! one through the [`DataStore`]. A burst of N mutations costs one write.
//!
//! The channel only holds a [`Weak`] handle, so between flushes the store is
//! the sole owner of its data and `Arc::make_mut` mutates in place.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::AppData;
use crate::storage::DataStore;

/// Default quiet period before a flush
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

pub struct PersistScheduler {
    tx: watch::Sender<Weak<AppData>>,
    task: JoinHandle<()>,
}

impl PersistScheduler {
    /// Start the flush task on the current tokio runtime
    pub fn spawn(backend: Arc<dyn DataStore>, window: Duration) -> Self {
        let (tx, rx) = watch::channel(Weak::new());
        let task = tokio::spawn(run(rx, backend, window));
        Self { tx, task }
    }

    /// Replace the pending snapshot and restart the quiet period
    pub fn schedule(&self, snapshot: &Arc<AppData>) {
        // send_replace never fails, even if the task has stopped
        self.tx.send_replace(Arc::downgrade(snapshot));
    }

    /// Flush any pending snapshot now and stop the task
    pub async fn shutdown(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            log::warn!("Persistence task ended abnormally: {}", e);
        }
    }
}

async fn run(mut rx: watch::Receiver<Weak<AppData>>, backend: Arc<dyn DataStore>, window: Duration) {
    // `changed` still reports a snapshot that arrived before the sender closed
    while rx.changed().await.is_ok() {
        let closed = loop {
            tokio::select! {
                _ = tokio::time::sleep(window) => break false,
                res = rx.changed() => {
                    if res.is_err() {
                        break true;
                    }
                }
            }
        };

        // Always write what is current at fire time, not what triggered the timer.
        // A dead handle means the store moved on or was dropped; a newer
        // snapshot, if any, is already waiting in the channel.
        let snapshot = rx.borrow_and_update().upgrade();
        if let Some(snapshot) = snapshot {
            flush(&backend, snapshot).await;
        }

        if closed {
            break;
        }
    }
}

async fn flush(backend: &Arc<dyn DataStore>, snapshot: Arc<AppData>) {
    let backend = Arc::clone(backend);
    let target = backend.describe();
    let result = tokio::task::spawn_blocking(move || backend.save(&snapshot)).await;
    match result {
        Ok(true) => log::debug!("Flushed data to {}", target),
        Ok(false) => log::warn!("Saving data to {} failed; keeping in-memory state", target),
        Err(e) => log::warn!("Save task for {} failed: {}", target, e),
    }
}
