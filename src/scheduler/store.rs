use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SwarmError};
use crate::scheduler::shaft::Shaft;
use crate::scheduler::swarm::{ClaimOutcome, Swarm, SwarmInfo};

/// Full copy of every swarm, as written to and read from durable storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot {
    pub swarms: BTreeMap<String, Swarm>,
}

impl StoreSnapshot {
    /// Check every swarm in the snapshot, naming the first broken one.
    pub fn validate(&self) -> Result<()> {
        for (id, swarm) in &self.swarms {
            swarm.validate().map_err(|reason| {
                SwarmError::CorruptSnapshot(format!("swarm '{}': {}", id, reason))
            })?;
        }
        Ok(())
    }
}

/// Owns every swarm and serializes mutations per swarm id.
///
/// The outer map lock is held only long enough to find (or insert) a swarm;
/// claim and finish then run under that swarm's own mutex, so operations on
/// different swarms never wait on each other. Nothing acquires the map lock
/// while holding a swarm lock.
#[derive(Debug, Default)]
pub struct SwarmStore {
    swarms: RwLock<BTreeMap<String, Arc<Mutex<Swarm>>>>,
}

impl SwarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let swarms = snapshot
            .swarms
            .into_iter()
            .map(|(id, swarm)| (id, Arc::new(Mutex::new(swarm))))
            .collect();
        Self {
            swarms: RwLock::new(swarms),
        }
    }

    async fn get(&self, id: &str) -> Result<Arc<Mutex<Swarm>>> {
        self.swarms
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SwarmError::SwarmNotFound(id.to_string()))
    }

    /// Create a swarm and return how many shafts it has.
    pub async fn create(&self, id: &str, width: u32, height: u32, owner_ip: &str) -> Result<usize> {
        let mut swarms = self.swarms.write().await;
        if swarms.contains_key(id) {
            return Err(SwarmError::SwarmExists(id.to_string()));
        }

        let swarm = Swarm::new(width, height, owner_ip);
        let shafts = swarm.pending_count();
        swarms.insert(id.to_string(), Arc::new(Mutex::new(swarm)));

        tracing::info!(swarm_id = %id, width, height, owner_ip, shafts, "Swarm created");
        Ok(shafts)
    }

    pub async fn claim(&self, id: &str, worker_id: &str) -> Result<ClaimOutcome> {
        let swarm = self.get(id).await?;
        let mut swarm = swarm.lock().await;

        let outcome = swarm.claim(worker_id)?;
        tracing::debug!(
            swarm_id = %id,
            worker_id,
            x = outcome.shaft.x,
            z = outcome.shaft.z,
            "Shaft claimed"
        );
        if outcome.done {
            tracing::info!(swarm_id = %id, "Last pending shaft claimed");
        }
        Ok(outcome)
    }

    pub async fn finish(&self, id: &str, x: u32, z: u32) -> Result<Shaft> {
        let swarm = self.get(id).await?;
        let mut swarm = swarm.lock().await;

        let shaft = swarm.finish(x, z)?;
        tracing::debug!(
            swarm_id = %id,
            x,
            z,
            worker_id = shaft.claimed_by.as_deref().unwrap_or_default(),
            "Shaft finished"
        );
        if swarm.pending_count() == 0 && swarm.claimed().is_empty() {
            tracing::info!(swarm_id = %id, shafts = swarm.total_shafts(), "Swarm complete");
        }
        Ok(shaft)
    }

    /// All swarm ids, in lexicographic order.
    pub async fn list(&self) -> Vec<String> {
        self.swarms.read().await.keys().cloned().collect()
    }

    pub async fn info(&self, id: &str) -> Result<SwarmInfo> {
        let swarm = self.get(id).await?;
        let swarm = swarm.lock().await;
        Ok(swarm.info(id))
    }

    /// IP of the client that created the swarm. Never changes after creation.
    pub async fn owner_ip(&self, id: &str) -> Result<String> {
        let swarm = self.get(id).await?;
        let owner = swarm.lock().await.owner_ip().to_string();
        Ok(owner)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.swarms.read().await.contains_key(id)
    }

    /// Copy every swarm. Each swarm is copied under its own lock, so no
    /// half-applied claim or finish is ever captured. The map lock is
    /// released before any swarm lock is awaited.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let entries: Vec<(String, Arc<Mutex<Swarm>>)> = self
            .swarms
            .read()
            .await
            .iter()
            .map(|(id, swarm)| (id.clone(), swarm.clone()))
            .collect();

        let mut snapshot = StoreSnapshot::default();
        for (id, swarm) in entries {
            let swarm = swarm.lock().await.clone();
            snapshot.swarms.insert(id, swarm);
        }
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.swarms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.swarms.read().await.is_empty()
    }
}
