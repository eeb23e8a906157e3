//! # LZ4 Block Stages
//!
//! The stream is cut into blocks of at most [`MAX_BLOCK`] bytes. Each block is
//! written as:
//!
//! ```text
//! comp_len: u16 LE | raw_len: u16 LE | payload (comp_len bytes)
//! ```
//!
//! A block that does not shrink is stored as-is with `comp_len == raw_len`.

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Block header size in bytes.
pub const HEADER_LEN: usize = 4;

/// Largest raw block.
pub const MAX_BLOCK: usize = 32 * 1024;

/// Default raw block size.
pub const DEFAULT_BLOCK: usize = 8 * 1024;

/// Compresses the stream block by block.
#[derive(Debug)]
pub struct Lz4Compress {
    block: usize,
    residual: Vec<u8>,
}

impl Lz4Compress {
    /// Creates a compressor with [`DEFAULT_BLOCK`] sized blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK)
    }

    /// Creates a compressor; `block` is clamped to `1..=MAX_BLOCK`.
    #[must_use]
    pub fn with_block_size(block: usize) -> Self {
        let block = block.clamp(1, MAX_BLOCK);
        Self {
            block,
            residual: Vec::with_capacity(block),
        }
    }

    fn emit(raw: &[u8], out: &mut Vec<u8>) {
        let packed = lz4_flex::block::compress(raw);
        let payload = if packed.len() < raw.len() { &packed[..] } else { raw };
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&(raw.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
    }
}

impl Default for Lz4Compress {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Lz4Compress {
    fn block_size(&self) -> usize {
        self.block
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let mut input = input;
        while !input.is_empty() {
            let take = (self.block - self.residual.len()).min(input.len());
            if self.residual.is_empty() && take == self.block {
                Self::emit(&input[..take], out);
            } else {
                self.residual.extend_from_slice(&input[..take]);
                if self.residual.len() == self.block {
                    Self::emit(&self.residual, out);
                    self.residual.clear();
                }
            }
            input = &input[take..];
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        if !self.residual.is_empty() {
            Self::emit(&self.residual, out);
            self.residual.clear();
        }
        Ok(())
    }
}

/// Restores a stream written by [`Lz4Compress`].
#[derive(Debug, Default)]
pub struct Lz4Decompress {
    residual: Vec<u8>,
}

impl Lz4Decompress {
    /// Creates a decompressor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transform for Lz4Decompress {
    fn block_size(&self) -> usize {
        HEADER_LEN + MAX_BLOCK
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        self.residual.extend_from_slice(input);

        let mut consumed = 0;
        while let Some(header) = self.residual.get(consumed..consumed + HEADER_LEN) {
            let comp_len = usize::from(u16::from_le_bytes([header[0], header[1]]));
            let raw_len = usize::from(u16::from_le_bytes([header[2], header[3]]));
            if raw_len == 0 || raw_len > MAX_BLOCK || comp_len == 0 || comp_len > raw_len {
                return Err(StreamError::CorruptBlock(format!(
                    "bad block header: comp {comp_len}, raw {raw_len}"
                )));
            }

            let start = consumed + HEADER_LEN;
            let Some(payload) = self.residual.get(start..start + comp_len) else {
                break;
            };
            if comp_len == raw_len {
                out.extend_from_slice(payload);
            } else {
                let raw = lz4_flex::block::decompress(payload, raw_len)
                    .map_err(|e| StreamError::CorruptBlock(e.to_string()))?;
                if raw.len() != raw_len {
                    return Err(StreamError::CorruptBlock(format!(
                        "block inflated to {} bytes, header says {raw_len}",
                        raw.len()
                    )));
                }
                out.extend_from_slice(&raw);
            }
            consumed = start + comp_len;
        }

        self.residual.drain(..consumed);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> StreamResult<()> {
        if self.residual.is_empty() {
            return Ok(());
        }
        Err(StreamError::CorruptBlock(format!(
            "stream ends inside a block ({} bytes left)",
            self.residual.len()
        )))
    }
}
