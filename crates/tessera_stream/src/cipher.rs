//! # Blowfish Stage
//!
//! Symmetric 64-bit block cipher in ECB mode. Only whole 8-byte blocks are
//! transformed. What happens to a short final block is set by a
//! [`BlockPolicy`].

use std::fmt;

use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use blowfish::Blowfish;
use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 8;

/// Shortest accepted key.
pub const MIN_KEY_LEN: usize = 4;

/// Longest accepted key.
pub const MAX_KEY_LEN: usize = 56;

/// Whether the stage encrypts or decrypts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Plain text in, cipher text out.
    Encrypt,
    /// Cipher text in, plain text out.
    Decrypt,
}

/// Treatment of a final block shorter than [`BLOCK_SIZE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockPolicy {
    /// Forward it unmodified.
    #[default]
    PassThrough,
    /// Fail the transfer with [`StreamError::PartialBlock`].
    Reject,
}

/// Blowfish ECB stage.
pub struct Cipher {
    engine: Blowfish,
    direction: Direction,
    policy: BlockPolicy,
    residual: Vec<u8>,
}

impl Cipher {
    /// Creates a stage keyed with `key`.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidKeyLength`] unless the key is 4 to 56 bytes long.
    pub fn new(key: &[u8], direction: Direction, policy: BlockPolicy) -> StreamResult<Self> {
        if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
            return Err(StreamError::InvalidKeyLength(key.len()));
        }
        let engine =
            <Blowfish>::new_from_slice(key).map_err(|_| StreamError::InvalidKeyLength(key.len()))?;
        Ok(Self {
            engine,
            direction,
            policy,
            residual: Vec::with_capacity(BLOCK_SIZE),
        })
    }

    /// Encrypting stage.
    ///
    /// # Errors
    ///
    /// See [`Cipher::new`].
    pub fn encrypt(key: &[u8], policy: BlockPolicy) -> StreamResult<Self> {
        Self::new(key, Direction::Encrypt, policy)
    }

    /// Decrypting stage.
    ///
    /// # Errors
    ///
    /// See [`Cipher::new`].
    pub fn decrypt(key: &[u8], policy: BlockPolicy) -> StreamResult<Self> {
        Self::new(key, Direction::Decrypt, policy)
    }

    /// The stage direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Transforms whole blocks in place. `data.len()` is a multiple of 8.
    fn apply(&self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(block);
            match self.direction {
                Direction::Encrypt => self.engine.encrypt_block(block),
                Direction::Decrypt => self.engine.decrypt_block(block),
            }
        }
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("direction", &self.direction)
            .field("policy", &self.policy)
            .field("residual", &self.residual.len())
            .finish_non_exhaustive()
    }
}

impl Transform for Cipher {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let start = out.len();
        out.extend_from_slice(&self.residual);
        out.extend_from_slice(input);
        self.residual.clear();

        let whole = (out.len() - start) / BLOCK_SIZE * BLOCK_SIZE;
        self.residual.extend_from_slice(&out[start + whole..]);
        out.truncate(start + whole);
        self.apply(&mut out[start..]);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        if self.residual.is_empty() {
            return Ok(());
        }
        match self.policy {
            BlockPolicy::PassThrough => {
                tracing::debug!(len = self.residual.len(), "cipher passed a partial block through");
                out.append(&mut self.residual);
                Ok(())
            }
            BlockPolicy::Reject => Err(StreamError::PartialBlock {
                len: self.residual.len(),
                block: BLOCK_SIZE,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"TESSERA secret";

    fn run(mut stage: Cipher, chunks: &[&[u8]]) -> StreamResult<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in chunks {
            stage.process(chunk, &mut out)?;
        }
        stage.finish(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_known_vector() {
        // Eric Young's reference vector
        let key = [0xFFu8; 8];
        let plain = [0xFFu8; 8];
        let out = run(
            Cipher::encrypt(&key, BlockPolicy::Reject).unwrap(),
            &[&plain],
        )
        .unwrap();
        assert_eq!(out, [0x51, 0x86, 0x6F, 0xD5, 0xB8, 0x5E, 0xCB, 0x8A]);
    }

    #[test]
    fn test_roundtrip_aligned() {
        let plain: Vec<u8> = (0..64u8).collect();
        let sealed = run(Cipher::encrypt(KEY, BlockPolicy::Reject).unwrap(), &[&plain]).unwrap();
        assert_ne!(sealed, plain);
        let opened = run(
            Cipher::decrypt(KEY, BlockPolicy::Reject).unwrap(),
            &[&sealed[..5], &sealed[5..21], &sealed[21..]],
        )
        .unwrap();
        assert_eq!(opened, plain);
    }

    #[test]
    fn test_partial_block_passes_through() {
        let plain = b"sixteen bytes!!!tail";
        let sealed = run(Cipher::encrypt(KEY, BlockPolicy::PassThrough).unwrap(), &[plain]).unwrap();
        assert_eq!(sealed.len(), plain.len());
        assert_eq!(&sealed[16..], b"tail");
        let opened = run(Cipher::decrypt(KEY, BlockPolicy::PassThrough).unwrap(), &[&sealed]).unwrap();
        assert_eq!(opened, plain);
    }

    #[test]
    fn test_partial_block_rejected() {
        let result = run(Cipher::encrypt(KEY, BlockPolicy::Reject).unwrap(), &[b"0123456789"]);
        assert!(matches!(result, Err(StreamError::PartialBlock { len: 2, block: 8 })));
    }

    #[test]
    fn test_key_length_bounds() {
        assert!(matches!(
            Cipher::encrypt(b"abc", BlockPolicy::PassThrough),
            Err(StreamError::InvalidKeyLength(3))
        ));
        assert!(matches!(
            Cipher::encrypt(&[7u8; 57], BlockPolicy::PassThrough),
            Err(StreamError::InvalidKeyLength(57))
        ));
        assert!(Cipher::encrypt(&[7u8; 56], BlockPolicy::PassThrough).is_ok());
    }
}
