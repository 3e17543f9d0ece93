use std::sync::Arc;

use crate::access::AccessPolicy;
use crate::error::{Result, SwarmError};
use crate::persistence::PersistHandle;
use crate::scheduler::{ClaimOutcome, Shaft, SwarmInfo, SwarmStore};

/// Raw parameters of a swarm command, exactly as the client sent them.
///
/// Empty values count as missing.
#[derive(Debug, Clone, Default)]
pub struct CommandParams {
    pub token: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
    /// Worker (turtle) id for a claim.
    pub id: Option<String>,
    pub x: Option<String>,
    pub z: Option<String>,
}

impl CommandParams {
    /// Collect decoded query pairs. A repeated key keeps its first value and
    /// unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "token" => &mut params.token,
                "w" => &mut params.w,
                "h" => &mut params.h,
                "id" => &mut params.id,
                "x" => &mut params.x,
                "z" => &mut params.z,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Only plain non-negative integers are accepted: `1.0`, `-1` and `1e2`
/// count as missing rather than being coerced to a coordinate.
fn parse_u32(value: &Option<String>, name: &'static str) -> Result<u32> {
    present(value)
        .and_then(|v| v.trim().parse().ok())
        .ok_or(SwarmError::MissingParameters(name))
}

/// The swarm operations, behind the access gates.
///
/// Every successful mutation asks for a snapshot write before returning; the
/// write itself finishes in the background.
#[derive(Debug, Clone)]
pub struct QuarryService {
    store: Arc<SwarmStore>,
    access: AccessPolicy,
    persist: PersistHandle,
}

impl QuarryService {
    pub fn new(store: Arc<SwarmStore>, access: AccessPolicy, persist: PersistHandle) -> Self {
        Self {
            store,
            access,
            persist,
        }
    }

    pub fn store(&self) -> &Arc<SwarmStore> {
        &self.store
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    pub fn persist(&self) -> &PersistHandle {
        &self.persist
    }

    pub async fn list(&self) -> Vec<String> {
        self.store.list().await
    }

    pub async fn info(&self, swarm_id: &str) -> Result<SwarmInfo> {
        self.store.info(swarm_id).await
    }

    /// Create a swarm owned by `client_ip` and return its shaft count.
    pub async fn create(
        &self,
        swarm_id: &str,
        params: &CommandParams,
        client_ip: &str,
    ) -> Result<usize> {
        self.access.check_token(present(&params.token))?;
        if self.store.contains(swarm_id).await {
            return Err(SwarmError::SwarmExists(swarm_id.to_string()));
        }
        let width = parse_u32(&params.w, "w")?;
        let height = parse_u32(&params.h, "h")?;

        // Another create may have won the race since the check above.
        let shafts = self.store.create(swarm_id, width, height, client_ip).await?;
        self.persist.request();
        Ok(shafts)
    }

    /// Hand the next shaft of `swarm_id` to the worker named in `params.id`.
    pub async fn claim(
        &self,
        swarm_id: &str,
        params: &CommandParams,
        client_ip: &str,
    ) -> Result<ClaimOutcome> {
        self.access.check_token(present(&params.token))?;
        let owner_ip = self.store.owner_ip(swarm_id).await?;
        self.access.check_owner(client_ip, &owner_ip)?;
        let worker_id = present(&params.id).ok_or(SwarmError::MissingParameters("id"))?;

        let outcome = self.store.claim(swarm_id, worker_id).await?;
        self.persist.request();
        Ok(outcome)
    }

    /// Mark the claimed shaft at `(params.x, params.z)` as dug.
    pub async fn finish(
        &self,
        swarm_id: &str,
        params: &CommandParams,
        client_ip: &str,
    ) -> Result<Shaft> {
        self.access.check_token(present(&params.token))?;
        let owner_ip = self.store.owner_ip(swarm_id).await?;
        self.access.check_owner(client_ip, &owner_ip)?;
        let x = parse_u32(&params.x, "x")?;
        let z = parse_u32(&params.z, "z")?;

        let shaft = self.store.finish(swarm_id, x, z).await?;
        self.persist.request();
        Ok(shaft)
    }
}
