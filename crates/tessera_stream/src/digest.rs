//! # SHA-1 Stage
//!
//! Forwards bytes unchanged while hashing them with SHA-1 (64-byte blocks,
//! length-padded finalization).

use sha1::{Digest, Sha1 as Sha1Hasher};

use crate::error::StreamResult;
use crate::transform::Transform;

/// SHA-1 digest length in bytes.
pub const DIGEST_LEN: usize = 20;

/// Running SHA-1 accumulator.
#[derive(Clone, Debug, Default)]
pub struct Sha1 {
    hasher: Sha1Hasher,
}

impl Sha1 {
    /// Creates an accumulator over the empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest as if the stream stopped now. Hashing continues.
    #[must_use]
    pub fn digest(&self) -> [u8; DIGEST_LEN] {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&self.hasher.clone().finalize());
        digest
    }
}

impl Transform for Sha1 {
    fn block_size(&self) -> usize {
        64
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.hasher.update(input);
        out.extend_from_slice(input);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> StreamResult<()> {
        Ok(())
    }
}
