//! # TESSERA Core
//!
//! Entity storage for the simulation:
//! - Fixed capacity slot pools, one per entity kind
//! - 32-bit handles packing a kind tag and a slot index
//! - An explicit registry resolving handles against a set of pools
//!
//! ## Architecture Rules
//!
//! 1. **No resizing** - Pool capacity is fixed at configuration time
//! 2. **Handles across boundaries** - Raw addresses never leave the process
//! 3. **No ambient state** - Resolution always goes through a registry value
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Kind, PoolRegistry, SlotPool};
//!
//! let mut units: SlotPool<Unit> = SlotPool::new(Kind::Unit, 500)?;
//! let slot = units.allocate()?;
//!
//! let mut registry = PoolRegistry::new();
//! registry.register(&units)?;
//! let handle = registry.handle_of(units.address_of(slot).unwrap())?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod handle;
pub mod memory;
pub mod registry;

pub use error::{HandleError, HandleResult, PoolError, PoolResult};
pub use handle::{Handle, Kind, INDEX_BITS, MAX_INDEX};
pub use memory::{ActiveSlots, Occupancy, SlotPool};
pub use registry::{Address, PoolRegistry, SlotTable};
