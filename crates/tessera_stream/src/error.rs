//! # Stream Error Types
//!
//! A stage only knows about bytes. Errors describe what is wrong with the
//! bytes, never why the caller produced them.

use thiserror::Error;

/// Errors raised while pushing bytes into or pulling bytes out of a chain.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A base64 stream holds a byte outside the alphabet.
    #[error("invalid base64 symbol {symbol:#04x} at offset {offset}")]
    InvalidSymbol {
        /// The offending byte.
        symbol: u8,
        /// Position in the encoded stream.
        offset: usize,
    },

    /// A base64 stream ends inside a 4-symbol group.
    #[error("base64 stream ends with {0} dangling symbols")]
    TruncatedQuantum(usize),

    /// A cipher stream ends inside a block and the policy rejects it.
    #[error("final block holds {len} of {block} bytes")]
    PartialBlock {
        /// Bytes left over.
        len: usize,
        /// Cipher block size.
        block: usize,
    },

    /// The cipher key length is outside the accepted range.
    #[error("cipher key must be 4..=56 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// A framed block could not be decoded.
    #[error("corrupt block: {0}")]
    CorruptBlock(String),

    /// The stage was already flushed.
    #[error("stage already flushed")]
    AlreadyFlushed,

    /// The terminal reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
