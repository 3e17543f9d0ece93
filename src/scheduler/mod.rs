//! Shaft bookkeeping for every swarm.
//!
//! - [`grid`]: which cells of a quarry get a shaft, in dig order
//! - [`Shaft`]: one column of work and its claim/finish stamps
//! - [`Swarm`]: one quarry's pending, claimed and done shafts
//! - [`SwarmStore`]: every swarm, keyed by id, with per-swarm locking

pub mod grid;
pub mod shaft;
pub mod store;
pub mod swarm;

pub use shaft::{Shaft, ShaftStatus};
pub use store::{StoreSnapshot, SwarmStore};
pub use swarm::{ClaimOutcome, Swarm, SwarmInfo};
