//! # Transform Stages
//!
//! A [`Transform`] turns input bytes into output bytes, holding back a
//! partial block between calls. It knows nothing about direction:
//! [`TransformSink`] runs it in a push chain, [`TransformSource`] in a pull
//! chain. Every concrete stage in this crate is a `Transform`, so any stage
//! can sit at any position of either kind of chain.

use crate::error::{StreamError, StreamResult};
use crate::sink::Sink;
use crate::source::Source;

/// Smallest upstream read issued by a [`TransformSource`].
const MIN_PULL: usize = 1024;

/// A byte transformation with an internal residual buffer.
pub trait Transform {
    /// Natural block size in input bytes.
    fn block_size(&self) -> usize;

    /// Consumes `input`, appending the output for every complete block to `out`.
    ///
    /// # Errors
    ///
    /// If `input` is malformed for this transform.
    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()>;

    /// Drains the residual at end of stream, appending to `out`.
    ///
    /// # Errors
    ///
    /// If the residual cannot legally end the stream.
    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()>;
}

impl<T: Transform + ?Sized> Transform for &mut T {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
        (**self).process(input, out)
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
        (**self).finish(out)
    }
}

/// Runs a transform in a push chain.
///
/// # Example
///
/// ```rust,ignore
/// let mut out = Vec::new();
/// let mut chain = TransformSink::new(Sha1::new(), TransformSink::new(Base64Encode::new(), &mut out));
/// chain.put(b"payload")?;
/// chain.flush()?;
/// let digest = chain.transform().digest();
/// ```
#[derive(Debug)]
pub struct TransformSink<T, S> {
    transform: T,
    next: S,
    /// Output of the last call, reused between calls.
    staging: Vec<u8>,
    flushed: bool,
}

impl<T: Transform, S: Sink> TransformSink<T, S> {
    /// Binds `transform` to the downstream sink `next`.
    pub fn new(transform: T, next: S) -> Self {
        Self {
            transform,
            next,
            staging: Vec::new(),
            flushed: false,
        }
    }

    /// The transform, for reading accumulators.
    pub const fn transform(&self) -> &T {
        &self.transform
    }

    /// The downstream sink.
    pub const fn get_ref(&self) -> &S {
        &self.next
    }

    /// Unbinds the stage.
    pub fn into_parts(self) -> (T, S) {
        (self.transform, self.next)
    }

    fn forward(&mut self) -> StreamResult<usize> {
        if self.staging.is_empty() {
            return Ok(0);
        }
        self.next.put(&self.staging)
    }
}

impl<T: Transform, S: Sink> Sink for TransformSink<T, S> {
    fn put(&mut self, data: &[u8]) -> StreamResult<usize> {
        if self.flushed {
            return Err(StreamError::AlreadyFlushed);
        }
        self.staging.clear();
        self.transform.process(data, &mut self.staging)?;
        self.forward()
    }

    fn flush(&mut self) -> StreamResult<usize> {
        if self.flushed {
            return Err(StreamError::AlreadyFlushed);
        }
        self.flushed = true;
        self.staging.clear();
        self.transform.finish(&mut self.staging)?;
        let tail = self.staging.len();
        let forwarded = self.forward()? + self.next.flush()?;
        tracing::debug!(tail, forwarded, "stage flushed");
        Ok(forwarded)
    }
}

/// Runs a transform in a pull chain.
///
/// # Example
///
/// ```rust,ignore
/// let mut chain = TransformSource::new(Base64Decode::new(DecodePolicy::Strict), BufferSource::new(&text));
/// let mut raw = Vec::new();
/// chain.read_to_end(&mut raw)?;
/// ```
#[derive(Debug)]
pub struct TransformSource<T, S> {
    transform: T,
    upstream: S,
    /// Transformed bytes not yet handed out.
    pending: Vec<u8>,
    offset: usize,
    /// Scratch buffer for upstream reads.
    chunk: Vec<u8>,
    exhausted: bool,
}

impl<T: Transform, S: Source> TransformSource<T, S> {
    /// Binds `transform` to the upstream source.
    pub fn new(transform: T, upstream: S) -> Self {
        let pull = transform.block_size().max(MIN_PULL);
        Self {
            transform,
            upstream,
            pending: Vec::new(),
            offset: 0,
            chunk: vec![0; pull],
            exhausted: false,
        }
    }

    /// The transform, for reading accumulators.
    pub const fn transform(&self) -> &T {
        &self.transform
    }

    /// Unbinds the stage.
    pub fn into_parts(self) -> (T, S) {
        (self.transform, self.upstream)
    }

    /// Pulls one upstream chunk through the transform into `pending`.
    fn refill(&mut self) -> StreamResult<()> {
        self.pending.clear();
        self.offset = 0;
        let read = self.upstream.get(&mut self.chunk)?;
        self.transform.process(&self.chunk[..read], &mut self.pending)?;
        if read < self.chunk.len() {
            self.exhausted = true;
            self.transform.finish(&mut self.pending)?;
        }
        Ok(())
    }
}

impl<T: Transform, S: Source> Source for TransformSource<T, S> {
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let mut produced = 0;
        while produced < buf.len() {
            let available = self.pending.len() - self.offset;
            if available > 0 {
                let count = available.min(buf.len() - produced);
                buf[produced..produced + count]
                    .copy_from_slice(&self.pending[self.offset..self.offset + count]);
                self.offset += count;
                produced += count;
                continue;
            }
            if self.exhausted {
                break;
            }
            self.refill()?;
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;

    /// Uppercases ASCII in blocks of 4, passing a short tail through.
    #[derive(Default)]
    struct Upper4 {
        residual: Vec<u8>,
    }

    impl Transform for Upper4 {
        fn block_size(&self) -> usize {
            4
        }

        fn process(&mut self, input: &[u8], out: &mut Vec<u8>) -> StreamResult<()> {
            self.residual.extend_from_slice(input);
            let whole = self.residual.len() / 4 * 4;
            out.extend(self.residual.drain(..whole).map(|b| b.to_ascii_uppercase()));
            Ok(())
        }

        fn finish(&mut self, out: &mut Vec<u8>) -> StreamResult<()> {
            out.append(&mut self.residual);
            Ok(())
        }
    }

    #[test]
    fn test_sink_holds_back_partial_block() {
        let mut out = Vec::new();
        let mut stage = TransformSink::new(Upper4::default(), &mut out);
        assert_eq!(stage.put(b"abcdef").unwrap(), 4);
        assert_eq!(stage.put(b"g").unwrap(), 0);
        assert_eq!(stage.flush().unwrap(), 3);
        assert_eq!(out, b"ABCDefg");
    }

    #[test]
    fn test_double_flush_rejected() {
        let mut stage = TransformSink::new(Upper4::default(), Vec::new());
        stage.flush().unwrap();
        assert!(matches!(stage.flush(), Err(StreamError::AlreadyFlushed)));
        assert!(matches!(stage.put(b"x"), Err(StreamError::AlreadyFlushed)));
    }

    #[test]
    fn test_source_any_request_size() {
        let data = b"abcdefghijklmnopqrstuvwxyz";
        for request in [1, 3, 4, 7, 64] {
            let mut stage = TransformSource::new(Upper4::default(), BufferSource::new(data));
            let mut out = Vec::new();
            let mut buf = vec![0u8; request];
            loop {
                let read = stage.get(&mut buf).unwrap();
                out.extend_from_slice(&buf[..read]);
                if read < request {
                    break;
                }
            }
            assert_eq!(out, b"ABCDEFGHIJKLMNOPQRSTUVWXyz");
        }
    }
}
