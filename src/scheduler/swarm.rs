use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SwarmError};
use crate::scheduler::grid::generate_shafts;
use crate::scheduler::shaft::{now_millis, Shaft, ShaftStatus};

/// One quarry being dug by a fleet of turtles.
///
/// Every shaft lives in exactly one of `pending`, `claimed` or `done`, and
/// only moves forward through them. `pending` is handed out front to back in
/// generation order. The field names on the wire follow the `data.json`
/// layout older hosts wrote, so existing snapshot files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swarm {
    #[serde(rename = "time_created", with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(rename = "w", deserialize_with = "dimension")]
    width: u32,
    #[serde(rename = "h", deserialize_with = "dimension")]
    height: u32,
    #[serde(rename = "ip")]
    owner_ip: String,
    #[serde(rename = "shafts")]
    pending: VecDeque<Shaft>,
    #[serde(default)]
    claimed: Vec<Shaft>,
    #[serde(default)]
    done: Vec<Shaft>,
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub shaft: Shaft,
    /// True when this claim took the last pending shaft.
    pub done: bool,
}

/// Read-only summary of a swarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwarmInfo {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time_created: DateTime<Utc>,
    pub w: u32,
    pub h: u32,
    pub ip: String,
    pub total: usize,
    pub pending: usize,
    pub claimed: usize,
    pub done: usize,
    /// Every shaft has been dug.
    pub complete: bool,
}

impl Swarm {
    pub fn new(width: u32, height: u32, owner_ip: impl Into<String>) -> Self {
        Self {
            created_at: now_millis(),
            width,
            height,
            owner_ip: owner_ip.into(),
            pending: generate_shafts(width, height).into(),
            claimed: Vec::new(),
            done: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn owner_ip(&self) -> &str {
        &self.owner_ip
    }

    pub fn pending(&self) -> impl Iterator<Item = &Shaft> {
        self.pending.iter()
    }

    pub fn claimed(&self) -> &[Shaft] {
        &self.claimed
    }

    pub fn done(&self) -> &[Shaft] {
        &self.done
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn total_shafts(&self) -> usize {
        self.pending.len() + self.claimed.len() + self.done.len()
    }

    /// Hand the next pending shaft to `worker_id`.
    pub fn claim(&mut self, worker_id: &str) -> Result<ClaimOutcome> {
        let mut shaft = self
            .pending
            .pop_front()
            .ok_or(SwarmError::NoRemainingShafts)?;
        shaft.stamp_claimed(worker_id, now_millis());
        self.claimed.push(shaft.clone());

        Ok(ClaimOutcome {
            shaft,
            done: self.pending.is_empty(),
        })
    }

    /// Mark the claimed shaft at `(x, z)` as dug.
    ///
    /// Only claimed shafts can finish, so finishing the same shaft twice
    /// fails the second time.
    pub fn finish(&mut self, x: u32, z: u32) -> Result<Shaft> {
        let index = self
            .claimed
            .iter()
            .position(|s| s.is_at(x, z))
            .ok_or(SwarmError::ShaftNotFound { x, z })?;

        let mut shaft = self.claimed.remove(index);
        shaft.stamp_completed(now_millis());
        self.done.push(shaft.clone());
        Ok(shaft)
    }

    pub fn info(&self, id: &str) -> SwarmInfo {
        SwarmInfo {
            id: id.to_string(),
            time_created: self.created_at,
            w: self.width,
            h: self.height,
            ip: self.owner_ip.clone(),
            total: self.total_shafts(),
            pending: self.pending.len(),
            claimed: self.claimed.len(),
            done: self.done.len(),
            complete: self.pending.is_empty() && self.claimed.is_empty(),
        }
    }

    /// Check that a deserialized swarm respects the shaft partition.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let sets = [
            (ShaftStatus::Pending, self.pending.iter().collect::<Vec<_>>()),
            (ShaftStatus::Claimed, self.claimed.iter().collect()),
            (ShaftStatus::Done, self.done.iter().collect()),
        ];

        let mut seen = HashSet::new();
        for (expected, shafts) in sets {
            for shaft in shafts {
                if shaft.status() != expected {
                    return Err(format!(
                        "shaft ({}, {}) is {} but stored as {}",
                        shaft.x,
                        shaft.z,
                        shaft.status(),
                        expected
                    ));
                }
                if expected != ShaftStatus::Pending && !shaft.has_claim_stamps() {
                    return Err(format!(
                        "shaft ({}, {}) is missing its claim stamps",
                        shaft.x, shaft.z
                    ));
                }
                if !seen.insert((shaft.x, shaft.z)) {
                    return Err(format!("shaft ({}, {}) appears twice", shaft.x, shaft.z));
                }
            }
        }
        Ok(())
    }
}

/// Older hosts stored `w`/`h` as the raw query strings, so any value can
/// turn up here. Numbers are floored; anything that is not a finite
/// non-negative number reads as 0. The shaft sets are kept either way.
fn dimension<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => match s.trim() {
            "" => 0.0,
            s => s.parse().unwrap_or(f64::NAN),
        },
        Raw::Other(_) => f64::NAN,
    };

    if value.is_finite() && value >= 0.0 {
        Ok(value.floor().min(f64::from(u32::MAX)) as u32)
    } else {
        Ok(0)
    }
}
