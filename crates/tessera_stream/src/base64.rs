//! # Base64 Stages
//!
//! 3 raw bytes become 4 symbols of the standard alphabet. The final group of
//! 1 or 2 bytes is padded with `=`.
//!
//! Decoding follows a [`DecodePolicy`] fixed at construction.

use ::base64::alphabet;
use ::base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use ::base64::engine::DecodePaddingMode;
use ::base64::{DecodeError, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};
use crate::transform::Transform;

/// Padding symbol.
const PAD: u8 = b'=';

/// Accepts unpadded groups and stray low bits in the final symbol.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Accepts unpadded groups only. Padding is checked before decoding.
const STRICT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How the decoder treats input that is not well-formed base64.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Skip bytes outside the alphabet, stop at the first `=`, drop a single
    /// dangling symbol.
    #[default]
    Lenient,
    /// Reject foreign bytes, misplaced padding and truncated groups.
    Strict,
}

/// Encodes raw bytes to base64 text.
#[derive(Debug, Default)]
pub struct Base64Encode {
    residual: Vec<u8>,
}

impl Base64Encode {
    /// Creates an encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Appends the encoding of `data` to `out`.
fn encode_into(data: &[u8], out: &mut Vec<u8>) {
    if data.is_empty() {
        return;
    }
    let mut text = String::new();
    STANDARD.encode_string(data, &mut text);
    out.extend_from_slice(text.as_bytes());
}

impl Transform for Base64Encode {
    fn block_size(&self) -> usize {
        3
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        let mut input = input;
        if !self.residual.is_empty() {
            let take = (3 - self.residual.len()).min(input.len());
            self.residual.extend_from_slice(&input[..take]);
            input = &input[take..];
            if self.residual.len() < 3 {
                return Ok(());
            }
            encode_into(&self.residual, out);
            self.residual.clear();
        }

        let whole = input.len() / 3 * 3;
        encode_into(&input[..whole], out);
        self.residual.extend_from_slice(&input[whole..]);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        encode_into(&self.residual, out);
        self.residual.clear();
        Ok(())
    }
}

/// Decodes base64 text to raw bytes.
#[derive(Debug)]
pub struct Base64Decode {
    policy: DecodePolicy,
    /// Alphabet symbols not yet decoded.
    symbols: Vec<u8>,
    /// Symbols decoded so far, for grouping.
    decoded: usize,
    /// Position in the encoded stream.
    offset: usize,
    /// Padding symbols seen.
    padding: usize,
    /// Foreign bytes skipped under the lenient policy.
    skipped: usize,
}

impl Base64Decode {
    /// Creates a decoder.
    #[must_use]
    pub const fn new(policy: DecodePolicy) -> Self {
        Self {
            policy,
            symbols: Vec::new(),
            decoded: 0,
            offset: 0,
            padding: 0,
            skipped: 0,
        }
    }

    /// The decoding policy.
    #[must_use]
    pub const fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Decodes every complete 4-symbol group held.
    fn drain_groups(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        let whole = self.symbols.len() / 4 * 4;
        if whole == 0 {
            return Ok(());
        }
        self.decode(whole, out)?;
        self.symbols.drain(..whole);
        Ok(())
    }

    fn decode(&mut self, count: usize, out: &mut Vec<u8>) -> StreamResult<()> {
        let engine = match self.policy {
            DecodePolicy::Lenient => &LENIENT,
            DecodePolicy::Strict => &STRICT,
        };
        let base = self.decoded;
        engine
            .decode_vec(&self.symbols[..count], out)
            .map_err(|e| decode_error(e, base))?;
        self.decoded += count;
        Ok(())
    }

    fn accept_lenient(&mut self, input: &[u8]) {
        for &byte in input {
            if self.padding > 0 {
                return;
            }
            if byte == PAD {
                self.padding = 1;
            } else if is_symbol(byte) {
                self.symbols.push(byte);
            } else {
                self.skipped += 1;
            }
        }
    }

    fn accept_strict(&mut self, input: &[u8]) -> StreamResult<()> {
        for (i, &byte) in input.iter().enumerate() {
            let offset = self.offset + i;
            if byte == PAD {
                // Two symbols take two pads, three take one
                let position = self.symbols.len() % 4;
                if position < 2 || self.padding >= 4 - position {
                    return Err(StreamError::InvalidSymbol { symbol: byte, offset });
                }
                self.padding += 1;
            } else if self.padding > 0 || !is_symbol(byte) {
                return Err(StreamError::InvalidSymbol { symbol: byte, offset });
            } else {
                self.symbols.push(byte);
            }
        }
        Ok(())
    }
}

impl Transform for Base64Decode {
    fn block_size(&self) -> usize {
        4
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        match self.policy {
            DecodePolicy::Lenient => self.accept_lenient(input),
            DecodePolicy::Strict => self.accept_strict(input)?,
        }
        self.offset += input.len();
        self.drain_groups(out)
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        let tail = self.symbols.len();
        match self.policy {
            DecodePolicy::Lenient => {
                if self.skipped > 0 {
                    tracing::warn!(skipped = self.skipped, "base64 decoder skipped foreign bytes");
                }
                if tail == 1 {
                    tracing::warn!("base64 decoder dropped a dangling symbol");
                    self.symbols.clear();
                    return Ok(());
                }
            }
            DecodePolicy::Strict => {
                let padded = tail + self.padding;
                if tail == 1 || padded % 4 != 0 || (self.padding > 0 && padded != 4) {
                    return Err(StreamError::TruncatedQuantum(tail));
                }
            }
        }
        if tail > 0 {
            self.decode(tail, out)?;
            self.symbols.clear();
        }
        Ok(())
    }
}

const fn is_symbol(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/')
}

fn decode_error(error: DecodeError, base: usize) -> StreamError {
    match error {
        DecodeError::InvalidByte(offset, symbol) | DecodeError::InvalidLastSymbol(offset, symbol) => {
            StreamError::InvalidSymbol {
                symbol,
                offset: base + offset,
            }
        }
        DecodeError::InvalidLength(len) => StreamError::TruncatedQuantum(len % 4),
        DecodeError::InvalidPadding => StreamError::InvalidSymbol {
            symbol: PAD,
            offset: base,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<T: Transform>(mut stage: T, input: &[u8]) -> StreamResult<Vec<u8>> {
        let mut out = Vec::new();
        stage.process(input, &mut out)?;
        stage.finish(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_encode_known_vectors() {
        assert_eq!(run(Base64Encode::new(), b"").unwrap(), b"");
        assert_eq!(run(Base64Encode::new(), b"f").unwrap(), b"Zg==");
        assert_eq!(run(Base64Encode::new(), b"fo").unwrap(), b"Zm8=");
        assert_eq!(run(Base64Encode::new(), b"foobar").unwrap(), b"Zm9vYmFy");
    }

    #[test]
    fn test_encode_split_input() {
        let mut stage = Base64Encode::new();
        let mut out = Vec::new();
        for byte in b"ABCDE" {
            stage.process(std::slice::from_ref(byte), &mut out).unwrap();
        }
        stage.finish(&mut out).unwrap();
        assert_eq!(out, b"QUJDREU=");
    }

    #[test]
    fn test_lenient_skips_noise() {
        let out = run(Base64Decode::new(DecodePolicy::Lenient), b"QUJD\r\nRE*U=garbage").unwrap();
        assert_eq!(out, b"ABCDE");
    }

    #[test]
    fn test_lenient_drops_dangling_symbol() {
        let out = run(Base64Decode::new(DecodePolicy::Lenient), b"QUJDR").unwrap();
        assert_eq!(out, b"ABC");
    }

    #[test]
    fn test_strict_rejects_noise() {
        let result = run(Base64Decode::new(DecodePolicy::Strict), b"QUJD\nREU=");
        assert!(matches!(
            result,
            Err(StreamError::InvalidSymbol { symbol: b'\n', offset: 4 })
        ));
    }

    #[test]
    fn test_strict_rejects_truncation() {
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUJDREU"),
            Err(StreamError::TruncatedQuantum(3))
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUJDR"),
            Err(StreamError::TruncatedQuantum(1))
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUI"),
            Err(StreamError::TruncatedQuantum(3))
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QU="),
            Err(StreamError::TruncatedQuantum(2))
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QU=J"),
            Err(StreamError::InvalidSymbol { symbol: b'J', offset: 3 })
        ));
    }

    #[test]
    fn test_strict_rejects_excess_padding() {
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUI====="),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 4 })
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUJDREU====="),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 8 })
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QU======"),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 4 })
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"QUJDR==="),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 5 })
        ));
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"===="),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 0 })
        ));

        // Padding split across calls is counted the same way
        let mut stage = Base64Decode::new(DecodePolicy::Strict);
        let mut out = Vec::new();
        stage.process(b"QUI=", &mut out).unwrap();
        assert!(matches!(
            stage.process(b"=", &mut out),
            Err(StreamError::InvalidSymbol { symbol: PAD, offset: 4 })
        ));
    }

    #[test]
    fn test_strict_accepts_padded() {
        let out = run(Base64Decode::new(DecodePolicy::Strict), b"QUJDREU=").unwrap();
        assert_eq!(out, b"ABCDE");
        let out = run(Base64Decode::new(DecodePolicy::Strict), b"Zg==").unwrap();
        assert_eq!(out, b"f");
    }

    #[test]
    fn test_strict_rejects_stray_bits() {
        // "Zh==" carries set bits below the single decoded byte
        assert!(matches!(
            run(Base64Decode::new(DecodePolicy::Strict), b"Zh=="),
            Err(StreamError::InvalidSymbol { symbol: b'h', .. })
        ));
        assert_eq!(run(Base64Decode::new(DecodePolicy::Lenient), b"Zh==").unwrap(), b"f");
    }
}
