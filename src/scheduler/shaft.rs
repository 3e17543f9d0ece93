use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Current time at the millisecond precision snapshots store.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Lifecycle position of a shaft, derived from its stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaftStatus {
    Pending,
    Claimed,
    Done,
}

impl std::fmt::Display for ShaftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaftStatus::Pending => write!(f, "pending"),
            ShaftStatus::Claimed => write!(f, "claimed"),
            ShaftStatus::Done => write!(f, "done"),
        }
    }
}

/// One column of the quarry that a single turtle digs down.
///
/// Stamps are only ever appended: a claim sets `claimed_time`/`claimed_by`,
/// a finish sets `completed_time`. Times serialize as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shaft {
    pub x: u32,
    pub z: u32,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub claimed_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_time: Option<DateTime<Utc>>,
}

impl Shaft {
    pub fn new(x: u32, z: u32) -> Self {
        Self {
            x,
            z,
            claimed_time: None,
            claimed_by: None,
            completed_time: None,
        }
    }

    pub fn status(&self) -> ShaftStatus {
        if self.completed_time.is_some() {
            ShaftStatus::Done
        } else if self.claimed_time.is_some() {
            ShaftStatus::Claimed
        } else {
            ShaftStatus::Pending
        }
    }

    pub fn is_at(&self, x: u32, z: u32) -> bool {
        self.x == x && self.z == z
    }

    pub(crate) fn stamp_claimed(&mut self, worker_id: &str, at: DateTime<Utc>) {
        self.claimed_time = Some(at);
        self.claimed_by = Some(worker_id.to_string());
    }

    pub(crate) fn stamp_completed(&mut self, at: DateTime<Utc>) {
        self.completed_time = Some(at);
    }

    /// Whether the claim stamps are both present.
    pub fn has_claim_stamps(&self) -> bool {
        self.claimed_time.is_some() && self.claimed_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_follows_stamps() {
        let now = Utc::now();
        let mut shaft = Shaft::new(2, 1);
        assert_eq!(shaft.status(), ShaftStatus::Pending);

        shaft.stamp_claimed("7", now);
        assert_eq!(shaft.status(), ShaftStatus::Claimed);
        assert!(shaft.has_claim_stamps());

        shaft.stamp_completed(now);
        assert_eq!(shaft.status(), ShaftStatus::Done);
        assert_eq!(shaft.status().to_string(), "done");
    }

    #[test]
    fn pending_shaft_serializes_only_coordinates() {
        let json = serde_json::to_string(&Shaft::new(4, 2)).unwrap();
        assert_eq!(json, r#"{"x":4,"z":2}"#);
    }

    #[test]
    fn stamps_serialize_as_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_450_000_000_123).unwrap();
        let mut shaft = Shaft::new(0, 5);
        shaft.stamp_claimed("turtle-3", at);

        let value = serde_json::to_value(&shaft).unwrap();
        assert_eq!(value["claimed_time"], 1_450_000_000_123_i64);
        assert_eq!(value["claimed_by"], "turtle-3");
        assert!(value.get("completed_time").is_none());

        let back: Shaft = serde_json::from_value(value).unwrap();
        assert_eq!(back, shaft);
    }
}
