//! # Slot Pool
//!
//! Fixed capacity storage for one entity kind.
//!
//! Every slot is pre-allocated when the pool is configured. Allocation hands
//! out the lowest free slot, freeing returns it. The pool never grows: running
//! out of slots is reported to the caller as [`PoolError::Exhausted`].

use crate::error::{PoolError, PoolResult};
use crate::handle::{Handle, Kind, MAX_INDEX};
use crate::memory::Occupancy;
use crate::registry::Address;

/// Snapshot of a pool's active slots, taken when iteration starts.
///
/// Freeing or allocating while draining the snapshot does not disturb it.
pub type ActiveSlots = std::vec::IntoIter<usize>;

/// A fixed capacity pool of same-sized slots.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It lives on the simulation thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut units: SlotPool<Unit> = SlotPool::new(Kind::Unit, 500)?;
///
/// // Lowest free slot, reset to Unit::default()
/// let slot = units.allocate()?;
/// units.free(slot)?;
/// ```
pub struct SlotPool<T> {
    /// Entity kind stored in this pool.
    kind: Kind,
    /// Slot storage. Never reallocated after configuration.
    storage: Box<[T]>,
    /// Which slots hold a live entity.
    occupancy: Occupancy,
    /// Occupied slots in activation order.
    active: Vec<usize>,
    /// Position of each occupied slot inside `active`.
    positions: Box<[usize]>,
    /// No free slot exists below this index.
    free_hint: usize,
}

impl<T: Default> SlotPool<T> {
    /// Creates a pool with self-owned storage for `capacity` slots.
    ///
    /// # Errors
    ///
    /// See [`SlotPool::configure`].
    pub fn new(kind: Kind, capacity: usize) -> PoolResult<Self> {
        let mut pool = Self::unconfigured(kind);
        pool.configure(capacity, None)?;
        Ok(pool)
    }

    /// Creates a pool on top of caller supplied storage.
    ///
    /// The capacity is the length of `backing`. Its current contents are
    /// treated as free slots.
    ///
    /// # Errors
    ///
    /// See [`SlotPool::configure`].
    pub fn with_backing(kind: Kind, backing: Box<[T]>) -> PoolResult<Self> {
        let mut pool = Self::unconfigured(kind);
        pool.configure(backing.len(), Some(backing))?;
        Ok(pool)
    }

    /// (Re)establishes the slot count, dropping every live entity.
    ///
    /// When `backing` is given it replaces self-owned storage and must hold
    /// exactly `capacity` slots. Addresses handed out before the call are void.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ZeroCapacity`] if `capacity` is zero
    /// - [`PoolError::CapacityTooLarge`] if a handle could not address every slot
    /// - [`PoolError::ZeroSizedSlot`] if `T` has no size
    /// - [`PoolError::BackingMismatch`] if `backing` has the wrong length
    pub fn configure(&mut self, capacity: usize, backing: Option<Box<[T]>>) -> PoolResult<()> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if capacity > MAX_INDEX + 1 {
            return Err(PoolError::CapacityTooLarge {
                requested: capacity,
                limit: MAX_INDEX + 1,
            });
        }
        if std::mem::size_of::<T>() == 0 {
            return Err(PoolError::ZeroSizedSlot);
        }

        let storage = match backing {
            Some(buffer) if buffer.len() != capacity => {
                return Err(PoolError::BackingMismatch {
                    expected: capacity,
                    actual: buffer.len(),
                });
            }
            Some(buffer) => buffer,
            None => (0..capacity).map(|_| T::default()).collect(),
        };

        self.storage = storage;
        self.occupancy = Occupancy::new(capacity);
        self.active = Vec::with_capacity(capacity);
        self.positions = vec![0; capacity].into_boxed_slice();
        self.free_hint = 0;
        Ok(())
    }

    /// Claims the lowest free slot, resetting it to `T::default()`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every slot is occupied.
    pub fn allocate(&mut self) -> PoolResult<usize> {
        let Some(slot) = self.occupancy.first_free(self.free_hint) else {
            tracing::warn!(kind = self.kind.name(), capacity = self.capacity(), "pool exhausted");
            return Err(PoolError::Exhausted {
                capacity: self.capacity(),
            });
        };

        self.storage[slot] = T::default();
        self.activate(slot);
        self.free_hint = slot + 1;
        Ok(slot)
    }

    /// Claims the lowest free slot and moves `value` into it.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every slot is occupied.
    pub fn spawn(&mut self, value: T) -> PoolResult<usize> {
        let slot = self.allocate()?;
        self.storage[slot] = value;
        Ok(slot)
    }

    /// Releases a slot, returning the entity it held.
    ///
    /// The remaining active slots keep their relative order except the one
    /// that moves into the freed position.
    ///
    /// # Errors
    ///
    /// - [`PoolError::OutOfRange`] for a slot past the capacity
    /// - [`PoolError::NotOccupied`] when freeing a free slot
    pub fn free(&mut self, slot: usize) -> PoolResult<T> {
        self.check_range(slot)?;
        if !self.occupancy.remove(slot) {
            return Err(PoolError::NotOccupied(slot));
        }

        let position = self.positions[slot];
        self.active.swap_remove(position);
        if let Some(&moved) = self.active.get(position) {
            self.positions[moved] = position;
        }
        self.free_hint = self.free_hint.min(slot);

        Ok(std::mem::take(&mut self.storage[slot]))
    }

    /// Releases every slot. Storage is kept.
    pub fn clear(&mut self) {
        for &slot in &self.active {
            self.storage[slot] = T::default();
        }
        self.occupancy.clear();
        self.active.clear();
        self.free_hint = 0;
    }

    fn unconfigured(kind: Kind) -> Self {
        Self {
            kind,
            storage: Box::default(),
            occupancy: Occupancy::new(0),
            active: Vec::new(),
            positions: Box::default(),
            free_hint: 0,
        }
    }
}

impl<T> SlotPool<T> {
    /// Entity kind stored in this pool.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Total slot count.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes between consecutive slots in memory.
    #[inline]
    #[must_use]
    pub const fn slot_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.active_count()
    }

    /// Checks if every slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.active_count() == self.capacity()
    }

    /// Checks if a slot holds a live entity.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupancy.contains(slot)
    }

    /// The occupancy bit-set.
    #[inline]
    #[must_use]
    pub const fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    /// Moves `value` into a specific free slot.
    ///
    /// Used when restoring a saved pool, where slot indices must match the
    /// handles that reference them.
    ///
    /// # Errors
    ///
    /// - [`PoolError::OutOfRange`] for a slot past the capacity
    /// - [`PoolError::AlreadyOccupied`] if the slot is in use
    pub fn occupy(&mut self, slot: usize, value: T) -> PoolResult<()> {
        self.check_range(slot)?;
        if self.occupancy.contains(slot) {
            return Err(PoolError::AlreadyOccupied(slot));
        }
        self.storage[slot] = value;
        self.activate(slot);
        Ok(())
    }

    /// Gets a reference to a live entity.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&T> {
        if self.occupancy.contains(slot) {
            self.storage.get(slot)
        } else {
            None
        }
    }

    /// Gets a mutable reference to a live entity.
    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        if self.occupancy.contains(slot) {
            self.storage.get_mut(slot)
        } else {
            None
        }
    }

    /// Snapshot of the active slots, in activation order.
    #[must_use]
    pub fn iterate(&self) -> ActiveSlots {
        self.active.clone().into_iter()
    }

    /// Iterates over live entities in activation order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.active.iter().map(|&slot| (slot, &self.storage[slot]))
    }

    /// Iterates mutably over live entities in ascending slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        let occupancy = &self.occupancy;
        self.storage
            .iter_mut()
            .enumerate()
            .filter(move |(slot, _)| occupancy.contains(*slot))
    }

    /// Position of a live slot within the active sequence.
    ///
    /// This compact numbering differs from the slot index and shifts when
    /// other slots are freed.
    #[inline]
    #[must_use]
    pub fn logical_id(&self, slot: usize) -> Option<usize> {
        self.occupancy
            .contains(slot)
            .then(|| self.positions[slot])
    }

    /// The slot at a position of the active sequence.
    #[inline]
    #[must_use]
    pub fn active_at(&self, position: usize) -> Option<usize> {
        self.active.get(position).copied()
    }

    /// Handle naming a live slot.
    #[must_use]
    pub fn handle(&self, slot: usize) -> Option<Handle> {
        if !self.occupancy.contains(slot) {
            return None;
        }
        Handle::new(self.kind, slot).ok()
    }

    /// Address of the first byte of storage.
    #[inline]
    #[must_use]
    pub fn base_address(&self) -> Address {
        Address::of(self.storage.as_ptr())
    }

    /// Address of a slot, occupied or not.
    #[must_use]
    pub fn address_of(&self, slot: usize) -> Option<Address> {
        self.storage
            .get(slot)
            .map(|value| Address::of(value as *const T))
    }

    /// Slot containing an address, if the address lies inside this pool.
    ///
    /// Addresses pointing into the middle of a slot map to that slot.
    #[must_use]
    pub fn slot_of(&self, address: Address) -> Option<usize> {
        let offset = address.get().checked_sub(self.base_address().get())?;
        let slot = offset / self.slot_size();
        (slot < self.capacity()).then_some(slot)
    }

    /// Live entity at an address.
    #[must_use]
    pub fn at_address(&self, address: Address) -> Option<&T> {
        self.get(self.slot_of(address)?)
    }

    /// Gives the storage back, dropping all bookkeeping.
    #[must_use]
    pub fn into_backing(self) -> Box<[T]> {
        self.storage
    }

    fn activate(&mut self, slot: usize) {
        self.occupancy.insert(slot);
        self.positions[slot] = self.active.len();
        self.active.push(slot);
    }

    fn check_range(&self, slot: usize) -> PoolResult<()> {
        if slot >= self.capacity() {
            return Err(PoolError::OutOfRange {
                slot,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Crate {
        weight: u32,
    }

    #[test]
    fn test_pool_exhaustion_and_reuse() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 4).unwrap();

        let slots: Vec<usize> = (0..4).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        assert_eq!(pool.allocate(), Err(PoolError::Exhausted { capacity: 4 }));

        pool.free(slots[2]).unwrap();
        assert_eq!(pool.allocate().unwrap(), slots[2]);
    }

    #[test]
    fn test_allocate_lowest_free() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 8).unwrap();
        for _ in 0..6 {
            pool.allocate().unwrap();
        }
        pool.free(4).unwrap();
        pool.free(1).unwrap();
        assert_eq!(pool.allocate().unwrap(), 1);
        assert_eq!(pool.allocate().unwrap(), 4);
        assert_eq!(pool.allocate().unwrap(), 6);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: PoolResult<SlotPool<Crate>> = SlotPool::new(Kind::Unit, 0);
        assert_eq!(result.err(), Some(PoolError::ZeroCapacity));
    }

    #[test]
    fn test_double_free_reported() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 2).unwrap();
        let slot = pool.allocate().unwrap();
        pool.free(slot).unwrap();
        assert_eq!(pool.free(slot), Err(PoolError::NotOccupied(slot)));
        assert_eq!(
            pool.free(9),
            Err(PoolError::OutOfRange { slot: 9, capacity: 2 })
        );
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_free_returns_value_and_allocate_resets() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 1).unwrap();
        let slot = pool.spawn(Crate { weight: 40 }).unwrap();
        assert_eq!(pool.free(slot).unwrap(), Crate { weight: 40 });

        let slot = pool.allocate().unwrap();
        assert_eq!(pool.get(slot), Some(&Crate::default()));
    }

    #[test]
    fn test_iterate_is_snapshot() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 5).unwrap();
        for _ in 0..5 {
            pool.allocate().unwrap();
        }

        let mut seen = Vec::new();
        for slot in pool.iterate() {
            seen.push(slot);
            pool.free(slot).unwrap();
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_logical_id_tracks_active_sequence() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 4).unwrap();
        for _ in 0..4 {
            pool.allocate().unwrap();
        }
        assert_eq!(pool.logical_id(2), Some(2));

        pool.free(0).unwrap();
        // Slot 3 moved into position 0
        assert_eq!(pool.logical_id(3), Some(0));
        assert_eq!(pool.active_at(0), Some(3));
        assert_eq!(pool.logical_id(0), None);

        for (position, slot) in pool.iterate().enumerate() {
            assert_eq!(pool.logical_id(slot), Some(position));
        }
    }

    #[test]
    fn test_address_roundtrip() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Unit, 16).unwrap();
        let slot = pool.spawn(Crate { weight: 7 }).unwrap();
        let address = pool.address_of(slot).unwrap();
        assert_eq!(pool.slot_of(address), Some(slot));
        assert_eq!(pool.at_address(address), Some(&Crate { weight: 7 }));

        let past_end = Address::new(pool.base_address().get() + 16 * pool.slot_size());
        assert_eq!(pool.slot_of(past_end), None);
    }

    #[test]
    fn test_backing_storage() {
        let backing: Box<[Crate]> = vec![Crate::default(); 3].into_boxed_slice();
        let mut pool = SlotPool::with_backing(Kind::Effect, backing).unwrap();
        assert_eq!(pool.capacity(), 3);
        pool.spawn(Crate { weight: 1 }).unwrap();

        let storage = pool.into_backing();
        assert_eq!(storage[0].weight, 1);

        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Effect, 2).unwrap();
        assert_eq!(
            pool.configure(2, Some(vec![Crate::default(); 5].into_boxed_slice())),
            Err(PoolError::BackingMismatch { expected: 2, actual: 5 })
        );
    }

    #[test]
    fn test_occupy_specific_slot() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Trigger, 4).unwrap();
        pool.occupy(3, Crate { weight: 3 }).unwrap();
        assert_eq!(pool.occupy(3, Crate::default()), Err(PoolError::AlreadyOccupied(3)));
        // Lowest free slot is still 0
        assert_eq!(pool.allocate().unwrap(), 0);
        assert_eq!(pool.iterate().collect::<Vec<_>>(), vec![3, 0]);
    }

    #[test]
    fn test_clear() {
        let mut pool: SlotPool<Crate> = SlotPool::new(Kind::Team, 3).unwrap();
        pool.spawn(Crate { weight: 9 }).unwrap();
        pool.spawn(Crate { weight: 8 }).unwrap();
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.allocate().unwrap(), 0);
        assert_eq!(pool.get(0), Some(&Crate::default()));
    }
}
