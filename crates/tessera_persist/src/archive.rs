//! # Pool Archiving
//!
//! Type-erased save and load of whole pools.
//!
//! Section layout, one per pool:
//!
//! ```text
//! active_count: u32 LE
//! active_count x ( slot_index: u32 LE | record: RECORD_SIZE bytes )
//! ```
//!
//! Records appear in the pool's active order. The slot index lets a load
//! restore every entity to the slot its handles name.

use std::any::Any;

use tessera_core::{Kind, SlotPool, SlotTable};
use tessera_stream::{Sink, Source};

use crate::error::{PersistError, PersistResult};
use crate::record::{Record, RecordReader, RecordWriter};
use crate::swizzle::{Swizzle, SwizzleMap};

/// A simulation entity that can live in a world and be saved.
pub trait Entity: Record + Swizzle + Default + Clone + 'static {
    /// Kind tag of this entity type. One type per kind.
    const KIND: Kind;
}

/// A pool whose entities can be saved and loaded without knowing their type.
pub trait PersistPool {
    /// Kind stored in the pool.
    fn kind(&self) -> Kind;

    /// Encoded bytes per entity.
    fn record_size(&self) -> usize;

    /// Total slot count.
    fn capacity(&self) -> usize;

    /// Number of live entities.
    fn active_count(&self) -> usize;

    /// Frees a live slot.
    ///
    /// # Errors
    ///
    /// If the slot is out of range or free.
    fn release(&mut self, slot: usize) -> PersistResult<()>;

    /// Writes the pool section to `out`.
    ///
    /// Entities are cloned and swizzled, the live pool is not modified.
    ///
    /// # Errors
    ///
    /// Swizzle, encode or downstream stream failures.
    fn save_records(&self, map: &SwizzleMap, out: &mut dyn Sink) -> PersistResult<usize>;

    /// Reads a pool section from `input` into this (empty) pool.
    ///
    /// Links stay in handle form until [`PersistPool::post_deserialize_all`].
    ///
    /// # Errors
    ///
    /// Truncated input, undecodable records or slots that do not fit.
    fn load_records(&mut self, input: &mut dyn Source) -> PersistResult<usize>;

    /// Unswizzles every entity, returning the number of links cleared.
    fn post_deserialize_all(&mut self, map: &SwizzleMap) -> usize;

    /// An empty pool of the same kind, type and capacity.
    ///
    /// # Errors
    ///
    /// If the pool cannot be configured.
    fn empty_like(&self) -> PersistResult<Box<dyn PersistPool>>;

    /// Layout view for handle resolution.
    fn as_table(&self) -> &dyn SlotTable;

    /// Downcasting hook for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Downcasting hook for typed mutable access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Reads exactly `buf.len()` bytes.
fn read_exact(input: &mut dyn Source, buf: &mut [u8]) -> PersistResult<()> {
    let read = input.get(buf)?;
    if read < buf.len() {
        return Err(PersistError::Truncated {
            needed: buf.len(),
            remaining: read,
        });
    }
    Ok(())
}

fn read_u32(input: &mut dyn Source) -> PersistResult<u32> {
    let mut bytes = [0u8; 4];
    read_exact(input, &mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

impl<T: Entity> PersistPool for SlotPool<T> {
    fn kind(&self) -> Kind {
        SlotPool::kind(self)
    }

    fn record_size(&self) -> usize {
        T::RECORD_SIZE
    }

    fn capacity(&self) -> usize {
        SlotPool::capacity(self)
    }

    fn active_count(&self) -> usize {
        SlotPool::active_count(self)
    }

    fn release(&mut self, slot: usize) -> PersistResult<()> {
        self.free(slot)?;
        Ok(())
    }

    fn save_records(&self, map: &SwizzleMap, out: &mut dyn Sink) -> PersistResult<usize> {
        let mut writer = RecordWriter::new(T::RECORD_SIZE);
        let mut written = out.put(&(self.active_count() as u32).to_le_bytes())?;

        for (slot, entity) in self.iter() {
            let mut entity = entity.clone();
            entity.pre_serialize(map)?;

            writer.reset();
            entity.encode(&mut writer)?;
            written += out.put(&(slot as u32).to_le_bytes())?;
            written += out.put(writer.padded())?;
        }

        tracing::debug!(kind = T::KIND.name(), count = self.active_count(), "pool saved");
        Ok(written)
    }

    fn load_records(&mut self, input: &mut dyn Source) -> PersistResult<usize> {
        let count = read_u32(input)? as usize;
        if count > SlotPool::capacity(self) {
            return Err(PersistError::CorruptRecord(format!(
                "{} entities recorded for a pool of {}",
                count,
                SlotPool::capacity(self)
            )));
        }

        let mut record = vec![0u8; T::RECORD_SIZE];
        for _ in 0..count {
            let slot = read_u32(input)? as usize;
            read_exact(input, &mut record)?;
            let entity = T::decode(&mut RecordReader::new(&record))?;
            self.occupy(slot, entity)?;
        }

        tracing::debug!(kind = T::KIND.name(), count, "pool loaded");
        Ok(count)
    }

    fn post_deserialize_all(&mut self, map: &SwizzleMap) -> usize {
        self.iter_mut()
            .map(|(_, entity)| entity.post_deserialize(map))
            .sum()
    }

    fn empty_like(&self) -> PersistResult<Box<dyn PersistPool>> {
        let pool: SlotPool<T> = SlotPool::new(SlotPool::kind(self), SlotPool::capacity(self))?;
        Ok(Box::new(pool))
    }

    fn as_table(&self) -> &dyn SlotTable {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
