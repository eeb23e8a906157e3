//! # CRC-32 Stage
//!
//! Forwards bytes unchanged while accumulating the IEEE CRC-32 of everything
//! that passed through.

use crate::error::StreamResult;
use crate::transform::Transform;

/// Running CRC-32 accumulator.
#[derive(Clone, Debug, Default)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
    length: u64,
}

impl Crc32 {
    /// Creates an accumulator over the empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checksum of all bytes seen so far. Accumulation continues.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Bytes seen so far.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }
}

impl Transform for Crc32 {
    fn block_size(&self) -> usize {
        1
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.hasher.update(input);
        self.length += input.len() as u64;
        out.extend_from_slice(input);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> StreamResult<()> {
        Ok(())
    }
}
