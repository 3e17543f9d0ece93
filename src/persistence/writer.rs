use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::persistence::SnapshotGateway;
use crate::scheduler::SwarmStore;

/// Messages understood by the snapshot writer.
#[derive(Debug)]
pub enum PersistMessage {
    /// The store changed; write a fresh snapshot when possible.
    Save,
    /// Write a fresh snapshot and report back once it is on disk.
    Flush { response_tx: oneshot::Sender<bool> },
}

/// Cheap handle the request path uses to ask for snapshot writes.
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::Sender<PersistMessage>,
}

impl PersistHandle {
    /// Ask for a snapshot write without waiting for it.
    ///
    /// The queue holds a single message. When it is full a write that has
    /// not yet taken its snapshot is already queued, and that write will
    /// include the current change.
    pub fn request(&self) {
        match self.tx.try_send(PersistMessage::Save) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Snapshot writer has stopped, change will not be persisted");
            }
        }
    }

    /// Write a snapshot that includes every change made so far and wait for
    /// it. Returns false if the write failed or the writer is gone.
    pub async fn flush(&self) -> bool {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .tx
            .send(PersistMessage::Flush { response_tx })
            .await
            .is_err()
        {
            return false;
        }
        response_rx.await.unwrap_or(false)
    }
}

/// Background task that owns all snapshot writes.
///
/// Writes happen one at a time, in request order. Each write copies the
/// store when it starts, so bursts of requests collapse into one write. A
/// crash loses at most the changes made after the last completed write.
pub struct SnapshotWriter {
    store: Arc<SwarmStore>,
    gateway: Arc<dyn SnapshotGateway>,
    rx: mpsc::Receiver<PersistMessage>,
}

impl SnapshotWriter {
    pub fn new(store: Arc<SwarmStore>, gateway: Arc<dyn SnapshotGateway>) -> (Self, PersistHandle) {
        let (tx, rx) = mpsc::channel(1);
        (Self { store, gateway, rx }, PersistHandle { tx })
    }

    /// Process requests until every [`PersistHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                PersistMessage::Save => {
                    self.write().await;
                }
                PersistMessage::Flush { response_tx } => {
                    let ok = self.write().await;
                    let _ = response_tx.send(ok);
                }
            }
        }
        tracing::debug!("Snapshot writer stopped");
    }

    async fn write(&self) -> bool {
        let snapshot = self.store.snapshot().await;
        let swarms = snapshot.swarms.len();
        let gateway = self.gateway.clone();

        match tokio::task::spawn_blocking(move || gateway.save(&snapshot)).await {
            Ok(Ok(())) => {
                tracing::trace!(swarms, "Snapshot saved");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to write snapshot");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Snapshot write task failed");
                false
            }
        }
    }
}
