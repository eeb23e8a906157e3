//! # Sinks
//!
//! Push side of a chain. The caller hands bytes to the first stage, each stage
//! forwards what it produced to the next, and the last one stores them.

use std::io::Write;

use crate::error::StreamResult;

/// Receives bytes pushed by the caller or by an upstream stage.
pub trait Sink {
    /// Accepts `data`, returning the number of bytes forwarded to the end of
    /// the chain as a result.
    ///
    /// A stage may hold part of `data` back until it has a full block.
    ///
    /// # Errors
    ///
    /// Whatever the stage or a downstream stage rejects.
    fn put(&mut self, data: &[u8]) -> StreamResult<usize>;

    /// Drains held-back bytes and flushes the rest of the chain.
    ///
    /// Call exactly once when the transfer is complete.
    ///
    /// # Errors
    ///
    /// Whatever the stage or a downstream stage rejects.
    fn flush(&mut self) -> StreamResult<usize> {
        Ok(0)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    #[inline]
    fn put(&mut self, data: &[u8]) -> StreamResult<usize> {
        (**self).put(data)
    }

    #[inline]
    fn flush(&mut self) -> StreamResult<usize> {
        (**self).flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    #[inline]
    fn put(&mut self, data: &[u8]) -> StreamResult<usize> {
        (**self).put(data)
    }

    #[inline]
    fn flush(&mut self) -> StreamResult<usize> {
        (**self).flush()
    }
}

impl Sink for Vec<u8> {
    #[inline]
    fn put(&mut self, data: &[u8]) -> StreamResult<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Terminal sink writing to any [`std::io::Write`].
#[derive(Debug)]
pub struct IoSink<W> {
    writer: W,
}

impl<W: Write> IoSink<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Gives the writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for IoSink<W> {
    fn put(&mut self, data: &[u8]) -> StreamResult<usize> {
        self.writer.write_all(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> StreamResult<usize> {
        self.writer.flush()?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_appends() {
        let mut out = Vec::new();
        assert_eq!(out.put(b"abc").unwrap(), 3);
        assert_eq!(out.put(b"").unwrap(), 0);
        assert_eq!(out.put(b"de").unwrap(), 2);
        assert_eq!(Sink::flush(&mut out).unwrap(), 0);
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn test_io_sink() {
        let mut sink = IoSink::new(std::io::Cursor::new(Vec::new()));
        sink.put(b"hello").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.into_inner().into_inner(), b"hello");
    }

    #[test]
    fn test_boxed_sink() {
        let mut out = Vec::new();
        {
            let mut boxed: Box<dyn Sink + '_> = Box::new(&mut out);
            boxed.put(b"xy").unwrap();
            boxed.flush().unwrap();
        }
        assert_eq!(out, b"xy");
    }
}
