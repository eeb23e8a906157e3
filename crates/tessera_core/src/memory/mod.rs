//! # Memory Management
//!
//! Fixed capacity slot pools, one per entity kind.
//!
//! All slots are allocated when a pool is configured. During a match:
//! - No pool grows or shrinks
//! - Exhaustion is an ordinary error, not a crash
//! - Slot addresses stay put until the pool is reconfigured

mod occupancy;
mod pool;

pub use occupancy::Occupancy;
pub use pool::{ActiveSlots, SlotPool};
