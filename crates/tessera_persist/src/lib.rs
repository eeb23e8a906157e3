//! # TESSERA Persist
//!
//! Save and load of a whole simulation world.
//!
//! ## Architecture
//!
//! ```text
//! World ─▶ SwizzleMap ─▶ pre_serialize (addresses → handles)
//!       ─▶ Record encode ─▶ stage chain ─▶ save file
//!
//! save file ─▶ stage chain ─▶ Record decode into fresh pools
//!           ─▶ post_deserialize (handles → addresses) ─▶ swap into World
//! ```
//!
//! ## Rules
//!
//! 1. **Handles on disk** - A link is written as a handle, never an address
//! 2. **All or nothing** - Loading decodes and checks everything before the
//!    world is touched
//! 3. **No dangling links** - Links to missing entities are cleared on load

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod archive;
pub mod config;
pub mod error;
pub mod link;
pub mod record;
pub mod save;
pub mod swizzle;
pub mod world;

pub use archive::{Entity, PersistPool};
pub use config::{PersistConfig, PoolCapacities, SaveConfig};
pub use error::{PersistError, PersistResult};
pub use link::Link;
pub use record::{Record, RecordReader, RecordWriter};
pub use save::{LoadReport, SaveOptions};
pub use swizzle::{Swizzle, SwizzleMap};
pub use world::World;
