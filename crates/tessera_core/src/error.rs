//! # Core Error Types
//!
//! Errors raised by slot pools and handle resolution. Both are returned to
//! the immediate caller (the entity management layer), never panicked.

use thiserror::Error;

use crate::handle::{Handle, Kind};
use crate::registry::Address;

/// Errors that can occur while configuring or mutating a slot pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A pool must hold at least one slot.
    #[error("pool capacity must be greater than zero")]
    ZeroCapacity,

    /// The capacity does not fit the handle's index field.
    #[error("pool capacity {requested} exceeds the handle limit of {limit}")]
    CapacityTooLarge {
        /// Capacity that was asked for.
        requested: usize,
        /// Largest capacity a handle can address.
        limit: usize,
    },

    /// Slots of a zero-sized type have no distinct addresses.
    #[error("slot type has zero size")]
    ZeroSizedSlot,

    /// A caller supplied backing buffer does not match the requested capacity.
    #[error("backing storage holds {actual} slots, expected {expected}")]
    BackingMismatch {
        /// Slot count implied by the configuration.
        expected: usize,
        /// Slot count of the supplied buffer.
        actual: usize,
    },

    /// Every slot is occupied. Recoverable: reject the spawn.
    #[error("pool exhausted: all {capacity} slots are occupied")]
    Exhausted {
        /// Capacity of the exhausted pool.
        capacity: usize,
    },

    /// Slot index lies outside the pool.
    #[error("slot {slot} is out of range for capacity {capacity}")]
    OutOfRange {
        /// Offending slot index.
        slot: usize,
        /// Pool capacity.
        capacity: usize,
    },

    /// Freeing or accessing a slot that holds no entity.
    #[error("slot {0} is not occupied")]
    NotOccupied(usize),

    /// Restoring a slot that is already in use.
    #[error("slot {0} is already occupied")]
    AlreadyOccupied(usize),
}

/// Errors that can occur while packing or resolving handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Slot index does not fit the handle's index field.
    #[error("slot index {0} does not fit in a handle")]
    IndexOverflow(usize),

    /// The kind bits name no known entity kind.
    #[error("unknown entity kind tag {0}")]
    UnknownKind(u8),

    /// The null handle references nothing.
    #[error("null handle")]
    Null,

    /// The referenced slot is not occupied.
    #[error("stale handle {0}")]
    Stale(Handle),

    /// The registry has no pool for this kind.
    #[error("no pool registered for kind {0:?}")]
    NoPool(Kind),

    /// A pool for this kind is already registered.
    #[error("pool for kind {0:?} registered twice")]
    DuplicatePool(Kind),

    /// The pool for this kind stores a different entity type.
    #[error("pool for kind {0:?} holds a different entity type")]
    TypeMismatch(Kind),

    /// The address lies inside no registered pool.
    #[error("address {0} is not inside any registered pool")]
    ForeignAddress(Address),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Result type for handle operations.
pub type HandleResult<T> = Result<T, HandleError>;
