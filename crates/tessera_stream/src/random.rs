//! # Random Source
//!
//! Endless, deterministic byte source. Two sources with the same seed produce
//! the same bytes on every machine.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::StreamResult;
use crate::source::Source;

/// ChaCha20 keystream as a [`Source`]. Never ends.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: ChaCha20Rng,
}

impl RandomSource {
    /// Creates a source from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Draws `len` bytes, e.g. a cipher key.
    #[must_use]
    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.rng.fill_bytes(&mut out);
        out
    }
}

impl Source for RandomSource {
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        self.rng.fill_bytes(buf);
        Ok(buf.len())
    }
}
