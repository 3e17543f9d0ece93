//! Durable snapshots of the swarm store.
//!
//! The in-memory [`SwarmStore`] is authoritative while the process runs.
//! Every change asks the [`SnapshotWriter`] for a full-snapshot write; failed
//! writes are logged and never surface to the request that caused them.

pub mod gateway;
pub mod writer;

pub use gateway::{JsonFileGateway, MemoryGateway, SnapshotGateway};
pub use writer::{PersistHandle, PersistMessage, SnapshotWriter};

use crate::scheduler::{StoreSnapshot, SwarmStore};

/// Build the store from the last saved snapshot.
///
/// A missing or corrupt snapshot starts an empty store, and an empty
/// snapshot is saved right away so the file exists from then on.
pub fn restore_store(gateway: &dyn SnapshotGateway) -> SwarmStore {
    match gateway.load() {
        Ok(Some(snapshot)) => {
            tracing::info!(swarms = snapshot.swarms.len(), "Loaded swarm snapshot");
            SwarmStore::from_snapshot(snapshot)
        }
        Ok(None) => {
            tracing::warn!("Snapshot missing, starting with an empty store");
            save_baseline(gateway);
            SwarmStore::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot corrupt, starting with an empty store");
            save_baseline(gateway);
            SwarmStore::new()
        }
    }
}

fn save_baseline(gateway: &dyn SnapshotGateway) {
    if let Err(e) = gateway.save(&StoreSnapshot::default()) {
        tracing::warn!(error = %e, "Failed to write empty snapshot");
    }
}
