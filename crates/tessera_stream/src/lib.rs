//! # TESSERA Stream
//!
//! Composable byte stages for save files and network payloads.
//!
//! ## Architecture
//!
//! ```text
//! push:  caller ─put─▶ [Sha1] ─▶ [Lz4Compress] ─▶ [Cipher] ─▶ Vec<u8>
//! pull:  caller ◀─get─ [Lz4Decompress] ◀─ [Cipher] ◀─ BufferSource
//! ```
//!
//! Every stage is a [`Transform`]. [`TransformSink`] and [`TransformSource`]
//! run it in either direction, so any stage can follow any other.
//!
//! ## Rules
//!
//! 1. **Buffers only** - Stages never touch files or sockets themselves
//! 2. **One transfer per chain** - Flush exactly once, then drop the chain
//! 3. **Policies are fixed** - Malformed input handling is chosen at construction

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod base64;
pub mod checksum;
pub mod cipher;
pub mod compress;
pub mod digest;
pub mod error;
pub mod random;
pub mod sink;
pub mod source;
pub mod transform;

pub use crate::base64::{Base64Decode, Base64Encode, DecodePolicy};
pub use checksum::Crc32;
pub use cipher::{BlockPolicy, Cipher, Direction};
pub use compress::{Lz4Compress, Lz4Decompress};
pub use digest::Sha1;
pub use error::{StreamError, StreamResult};
pub use random::RandomSource;
pub use sink::{IoSink, Sink};
pub use source::{BufferSource, IoSource, Source};
pub use transform::{Transform, TransformSink, TransformSource};
