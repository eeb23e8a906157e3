//! # Sources
//!
//! Pull side of a chain. The caller asks the last stage for bytes, each stage
//! pulls from the one before it, and the first reads stored bytes.

use std::io::{ErrorKind, Read};

use crate::error::StreamResult;

/// Chunk size used when draining a source.
const DRAIN_CHUNK: usize = 4096;

/// Produces bytes on request.
pub trait Source {
    /// Fills `buf` as far as possible, returning the byte count.
    ///
    /// A count below `buf.len()` means the stream has ended. It is not an
    /// error and later calls return 0.
    ///
    /// # Errors
    ///
    /// Whatever the stage or an upstream stage rejects.
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize>;

    /// Pulls every remaining byte into `out`.
    ///
    /// # Errors
    ///
    /// Same as [`Source::get`].
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> StreamResult<usize> {
        let mut chunk = [0u8; DRAIN_CHUNK];
        let mut total = 0;
        loop {
            let read = self.get(&mut chunk)?;
            out.extend_from_slice(&chunk[..read]);
            total += read;
            if read < chunk.len() {
                return Ok(total);
            }
        }
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    #[inline]
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        (**self).get(buf)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    #[inline]
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        (**self).get(buf)
    }
}

/// Terminal source reading a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct BufferSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BufferSource<'a> {
    /// Reads from the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl Source for BufferSource<'_> {
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

/// Terminal source reading from any [`std::io::Read`].
///
/// Short reads from the reader are retried so that a short `get` still means
/// end of stream.
#[derive(Debug)]
pub struct IoSource<R> {
    reader: R,
}

impl<R: Read> IoSource<R> {
    /// Wraps a reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Gives the reader back.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Source for IoSource<R> {
    fn get(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader returning at most 3 bytes per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let count = buf.len().min(self.0.len()).min(3);
            buf[..count].copy_from_slice(&self.0[..count]);
            self.0 = &self.0[count..];
            Ok(count)
        }
    }

    #[test]
    fn test_buffer_source_short_read_ends() {
        let mut source = BufferSource::new(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(source.get(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(source.get(&mut buf).unwrap(), 2);
        assert_eq!(source.get(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_io_source_fills_buffer() {
        let mut source = IoSource::new(Trickle(b"0123456789"));
        let mut buf = [0u8; 8];
        assert_eq!(source.get(&mut buf).unwrap(), 8);
        assert_eq!(source.get(&mut buf).unwrap(), 2);
    }

    #[test]
    fn test_read_to_end() {
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let mut source = BufferSource::new(&data);
        let mut out = Vec::new();
        assert_eq!(source.read_to_end(&mut out).unwrap(), data.len());
        assert_eq!(out, data);
    }
}
