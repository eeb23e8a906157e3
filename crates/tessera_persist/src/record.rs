//! # Records
//!
//! Entities are stored as fixed size little-endian records. The layout is
//! written out field by field, never copied from memory, so it does not
//! depend on struct layout or host byte order.

use bytemuck::{bytes_of, Pod};
use tessera_core::Handle;

use crate::error::{PersistError, PersistResult};
use crate::link::Link;

/// Fixed size binary form of an entity.
///
/// # Example
///
/// ```rust,ignore
/// impl Record for Tank {
///     const RECORD_SIZE: usize = 16;
///
///     fn encode(&self, w: &mut RecordWriter) -> PersistResult<()> {
///         w.write_i32(self.x)?;
///         w.write_i32(self.y)?;
///         w.write_u16(self.health)?;
///         w.write_link(self.target)
///     }
///
///     fn decode(r: &mut RecordReader<'_>) -> PersistResult<Self> {
///         Ok(Self { x: r.read_i32()?, y: r.read_i32()?, health: r.read_u16()?, target: r.read_link()? })
///     }
/// }
/// ```
pub trait Record: Sized {
    /// Bytes per record. Unused tail bytes are zero.
    const RECORD_SIZE: usize;

    /// Writes the fields.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] when writing past `RECORD_SIZE`,
    /// [`PersistError::UnswizzledLink`] for a link in address form.
    fn encode(&self, writer: &mut RecordWriter) -> PersistResult<()>;

    /// Reads the fields back.
    ///
    /// # Errors
    ///
    /// If the record is short or holds invalid values.
    fn decode(reader: &mut RecordReader<'_>) -> PersistResult<Self>;
}

/// Bounded little-endian writer.
#[derive(Debug)]
pub struct RecordWriter {
    buffer: Vec<u8>,
    limit: usize,
}

impl RecordWriter {
    /// Creates a writer that accepts at most `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Creates a writer without a size limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            buffer: Vec::new(),
            limit: usize::MAX,
        }
    }

    /// Clears the written bytes for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Written bytes zero-padded up to the limit.
    ///
    /// Unbounded writers are returned as written.
    #[must_use]
    pub fn padded(&mut self) -> &[u8] {
        if self.limit != usize::MAX {
            self.buffer.resize(self.limit, 0);
        }
        &self.buffer
    }

    /// Gives the written bytes back.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes raw bytes.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> PersistResult<()> {
        if self.buffer.len() + bytes.len() > self.limit {
            return Err(PersistError::RecordOverflow { size: self.limit });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a single byte.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> PersistResult<()> {
        self.write_bytes(&[value])
    }

    /// Writes a bool as one byte.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_bool(&mut self, value: bool) -> PersistResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Writes a u16 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> PersistResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a u32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> PersistResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an i32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> PersistResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a u64 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> PersistResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a f32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> PersistResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a Pod type byte for byte.
    ///
    /// Only for types whose fields are single bytes or already fixed
    /// little-endian, such as `[u8; N]` name buffers.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> PersistResult<()> {
        self.write_bytes(bytes_of(value))
    }

    /// Writes a handle as its raw 32-bit form.
    ///
    /// # Errors
    ///
    /// [`PersistError::RecordOverflow`] past the limit.
    #[inline]
    pub fn write_handle(&mut self, handle: Handle) -> PersistResult<()> {
        self.write_u32(handle.raw())
    }

    /// Writes a link in stable form.
    ///
    /// # Errors
    ///
    /// [`PersistError::UnswizzledLink`] for a link still holding an address.
    pub fn write_link(&mut self, link: Link) -> PersistResult<()> {
        match link {
            Link::Empty => self.write_handle(Handle::NONE),
            Link::Handle(handle) => self.write_handle(handle),
            Link::Address(_) => Err(PersistError::UnswizzledLink),
        }
    }
}

/// Little-endian reader over a byte slice.
#[derive(Clone, Debug)]
pub struct RecordReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> RecordReader<'a> {
    /// Reads from the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns remaining bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    pub fn read_bytes(&mut self, len: usize) -> PersistResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(PersistError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Reads `N` raw bytes.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    pub fn read_array<const N: usize>(&mut self) -> PersistResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_u8(&mut self) -> PersistResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a bool written by [`RecordWriter::write_bool`].
    ///
    /// # Errors
    ///
    /// [`PersistError::CorruptRecord`] for bytes other than 0 and 1.
    pub fn read_bool(&mut self) -> PersistResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(PersistError::CorruptRecord(format!("bool byte {other}"))),
        }
    }

    /// Reads a u16 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_u16(&mut self) -> PersistResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a u32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_u32(&mut self) -> PersistResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads an i32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_i32(&mut self) -> PersistResult<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads a u64 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_u64(&mut self) -> PersistResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a f32 in little-endian format.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    #[inline]
    pub fn read_f32(&mut self) -> PersistResult<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Reads a Pod type byte for byte.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end.
    pub fn read_pod<T: Pod>(&mut self) -> PersistResult<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads a raw handle, checking its kind tag.
    ///
    /// # Errors
    ///
    /// [`PersistError::Truncated`] past the end, or an unknown kind tag.
    pub fn read_handle(&mut self) -> PersistResult<Handle> {
        Ok(Handle::from_raw(self.read_u32()?)?)
    }

    /// Reads a link in stable form.
    ///
    /// # Errors
    ///
    /// Same as [`RecordReader::read_handle`].
    pub fn read_link(&mut self) -> PersistResult<Link> {
        self.read_handle().map(Link::from_handle)
    }
}
