//! # Persistence Error Types
//!
//! Everything that can abort a save or a load. A failed load never touches
//! the world it was loading into.

use thiserror::Error;

use tessera_core::{HandleError, Kind, PoolError};
use tessera_stream::StreamError;

/// Errors that can occur while saving, loading or configuring persistence.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Slot pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Handle packing or resolution failure.
    #[error(transparent)]
    Handle(#[from] HandleError),

    /// A stream stage rejected the bytes.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The data does not start with the save file magic.
    #[error("not a save file")]
    BadMagic,

    /// The save file was written by an incompatible format version.
    #[error("unsupported save format version {0}")]
    UnsupportedVersion(u16),

    /// The saved pool layout does not fit the world's pools.
    #[error("pool layout mismatch for {kind:?}: {reason}")]
    PoolLayoutMismatch {
        /// Affected kind.
        kind: Kind,
        /// What differs.
        reason: String,
    },

    /// The data ends early.
    #[error("data truncated: needed {needed} more bytes, {remaining} left")]
    Truncated {
        /// Bytes the reader wanted.
        needed: usize,
        /// Bytes actually left.
        remaining: usize,
    },

    /// An entity wrote more than its fixed record size.
    #[error("record overflow: entity wrote past its {size}-byte record")]
    RecordOverflow {
        /// Declared record size.
        size: usize,
    },

    /// A link still holding an address reached the encoder.
    #[error("link was not swizzled before encoding")]
    UnswizzledLink,

    /// Record contents are invalid.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// The payload digest does not match the trailer.
    #[error("payload digest mismatch")]
    DigestMismatch,

    /// The stored body checksum does not match the trailer.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Value in the trailer.
        stored: u32,
        /// Value computed over the body.
        computed: u32,
    },

    /// The file is encrypted and no key was supplied.
    #[error("save file is encrypted but no key was given")]
    KeyRequired,

    /// No pool is registered for the entity kind.
    #[error("entity kind {0:?} is not registered")]
    TypeNotRegistered(Kind),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
