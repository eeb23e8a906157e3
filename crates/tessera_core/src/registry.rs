//! # Pool Registry
//!
//! An explicit table of pools, one per entity kind, used to turn handles into
//! entities and addresses back into handles.
//!
//! There is no global registry. Callers build one from the pools they own and
//! pass it to whatever needs to resolve handles, so two worlds can coexist.

use std::any::Any;
use std::fmt;

use crate::error::{HandleError, HandleResult};
use crate::handle::{Handle, Kind};
use crate::memory::{Occupancy, SlotPool};

/// An in-memory location, kept as a plain number.
///
/// Addresses are only compared and offset, never dereferenced.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(usize);

impl Address {
    /// The empty address.
    pub const NULL: Self = Self(0);

    /// Wraps a raw address value.
    #[inline]
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Address of a pointee.
    #[inline]
    #[must_use]
    pub fn of<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// The raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Checks if this is [`Address::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Type-erased view of a pool's layout and occupancy.
pub trait SlotTable {
    /// Kind of entity stored in the table.
    fn kind(&self) -> Kind;

    /// Address of slot 0.
    fn base_address(&self) -> Address;

    /// Bytes between consecutive slots.
    fn slot_size(&self) -> usize;

    /// Total slot count.
    fn capacity(&self) -> usize;

    /// Occupied slots.
    fn occupancy(&self) -> &Occupancy;

    /// Downcasting hook for typed resolution.
    fn as_any(&self) -> &dyn Any;

    /// Checks if a slot holds a live entity.
    fn is_occupied(&self, slot: usize) -> bool {
        self.occupancy().contains(slot)
    }

    /// Slot containing an address, occupied or not.
    fn slot_of(&self, address: Address) -> Option<usize> {
        let offset = address.get().checked_sub(self.base_address().get())?;
        let slot = offset / self.slot_size();
        (slot < self.capacity()).then_some(slot)
    }

    /// Address of a slot.
    fn address_of(&self, slot: usize) -> Option<Address> {
        (slot < self.capacity())
            .then(|| Address::new(self.base_address().get() + slot * self.slot_size()))
    }
}

impl<T: 'static> SlotTable for SlotPool<T> {
    fn kind(&self) -> Kind {
        SlotPool::kind(self)
    }

    fn base_address(&self) -> Address {
        SlotPool::base_address(self)
    }

    fn slot_size(&self) -> usize {
        SlotPool::slot_size(self)
    }

    fn capacity(&self) -> usize {
        SlotPool::capacity(self)
    }

    fn occupancy(&self) -> &Occupancy {
        SlotPool::occupancy(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Per-kind table of borrowed pools.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = PoolRegistry::new();
/// registry.register(&units)?;
/// registry.register(&teams)?;
///
/// let handle = registry.handle_of(units.address_of(slot).unwrap())?;
/// let unit: &Unit = registry.resolve(handle)?;
/// ```
#[derive(Clone, Copy)]
pub struct PoolRegistry<'a> {
    tables: [Option<&'a dyn SlotTable>; Kind::COUNT],
}

impl<'a> PoolRegistry<'a> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: [None; Kind::COUNT],
        }
    }

    /// Adds a pool under its kind.
    ///
    /// # Errors
    ///
    /// - [`HandleError::DuplicatePool`] if the kind already has a pool
    /// - [`HandleError::NoPool`] for a pool of [`Kind::None`]
    pub fn register(&mut self, table: &'a dyn SlotTable) -> HandleResult<()> {
        let kind = table.kind();
        if kind == Kind::None {
            return Err(HandleError::NoPool(Kind::None));
        }
        let entry = &mut self.tables[kind.index()];
        if entry.is_some() {
            return Err(HandleError::DuplicatePool(kind));
        }
        *entry = Some(table);
        Ok(())
    }

    /// The pool registered for a kind.
    #[inline]
    #[must_use]
    pub fn table(&self, kind: Kind) -> Option<&'a dyn SlotTable> {
        self.tables[kind.index()]
    }

    /// Registered pools in kind order.
    pub fn tables(&self) -> impl Iterator<Item = &'a dyn SlotTable> + '_ {
        self.tables.iter().filter_map(|table| *table)
    }

    /// Handle for the slot an address falls in.
    ///
    /// The null address maps to [`Handle::NONE`].
    ///
    /// # Errors
    ///
    /// [`HandleError::ForeignAddress`] if no registered pool contains the address.
    pub fn handle_of(&self, address: Address) -> HandleResult<Handle> {
        if address.is_null() {
            return Ok(Handle::NONE);
        }
        for table in self.tables() {
            if let Some(slot) = table.slot_of(address) {
                return Handle::new(table.kind(), slot);
            }
        }
        Err(HandleError::ForeignAddress(address))
    }

    /// Address of the live slot a handle names.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Null`] for the null handle
    /// - [`HandleError::NoPool`] if the kind has no registered pool
    /// - [`HandleError::Stale`] if the slot is free or past the capacity
    pub fn resolve_address(&self, handle: Handle) -> HandleResult<Address> {
        let table = self.live_table(handle)?;
        table
            .address_of(handle.index())
            .ok_or(HandleError::Stale(handle))
    }

    /// Reference to the live entity a handle names.
    ///
    /// # Errors
    ///
    /// Same as [`PoolRegistry::resolve_address`], plus
    /// [`HandleError::TypeMismatch`] if the kind's pool does not hold `T`.
    pub fn resolve<T: 'static>(&self, handle: Handle) -> HandleResult<&'a T> {
        let table = self.live_table(handle)?;
        let pool = table
            .as_any()
            .downcast_ref::<SlotPool<T>>()
            .ok_or(HandleError::TypeMismatch(handle.kind()))?;
        pool.get(handle.index()).ok_or(HandleError::Stale(handle))
    }

    fn live_table(&self, handle: Handle) -> HandleResult<&'a dyn SlotTable> {
        if handle.is_none() {
            return Err(HandleError::Null);
        }
        let table = self
            .table(handle.kind())
            .ok_or(HandleError::NoPool(handle.kind()))?;
        if !table.is_occupied(handle.index()) {
            tracing::debug!(%handle, "handle references a free slot");
            return Err(HandleError::Stale(handle));
        }
        Ok(table)
    }
}

impl Default for PoolRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Tank {
        armor: u16,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Squad {
        size: u8,
        morale: u32,
    }

    #[test]
    fn test_handle_address_roundtrip() {
        let mut tanks: SlotPool<Tank> = SlotPool::new(Kind::Unit, 8).unwrap();
        let mut squads: SlotPool<Squad> = SlotPool::new(Kind::Team, 4).unwrap();
        for armor in 0..5 {
            tanks.spawn(Tank { armor }).unwrap();
        }
        squads.spawn(Squad { size: 6, morale: 1 }).unwrap();

        let mut registry = PoolRegistry::new();
        registry.register(&tanks).unwrap();
        registry.register(&squads).unwrap();

        for (slot, tank) in tanks.iter() {
            let address = tanks.address_of(slot).unwrap();
            let handle = registry.handle_of(address).unwrap();
            assert_eq!(handle.kind(), Kind::Unit);
            assert_eq!(handle.index(), slot);
            assert_eq!(registry.resolve_address(handle).unwrap(), address);
            assert_eq!(registry.resolve::<Tank>(handle).unwrap(), tank);
        }

        let squad_handle = registry.handle_of(squads.address_of(0).unwrap()).unwrap();
        assert_eq!(squad_handle.kind(), Kind::Team);
        assert_eq!(registry.resolve::<Squad>(squad_handle).unwrap().size, 6);
    }

    #[test]
    fn test_stale_handle_detected() {
        let mut tanks: SlotPool<Tank> = SlotPool::new(Kind::Unit, 4).unwrap();
        let slot = tanks.spawn(Tank { armor: 3 }).unwrap();
        let handle = tanks.handle(slot).unwrap();
        tanks.free(slot).unwrap();

        let mut registry = PoolRegistry::new();
        registry.register(&tanks).unwrap();
        assert_eq!(registry.resolve::<Tank>(handle), Err(HandleError::Stale(handle)));
        assert_eq!(registry.resolve_address(handle), Err(HandleError::Stale(handle)));
    }

    #[test]
    fn test_reused_slot_after_free() {
        let mut tanks: SlotPool<Tank> = SlotPool::new(Kind::Unit, 4).unwrap();
        for armor in 0..4 {
            tanks.spawn(Tank { armor }).unwrap();
        }
        let second = tanks.handle(1).unwrap();
        let third = tanks.handle(2).unwrap();

        // Lower slot freed too: the reused slot is not the one third named
        tanks.free(2).unwrap();
        tanks.free(0).unwrap();
        assert_eq!(tanks.spawn(Tank { armor: 40 }).unwrap(), 0);
        {
            let mut registry = PoolRegistry::new();
            registry.register(&tanks).unwrap();
            assert_eq!(registry.resolve::<Tank>(third), Err(HandleError::Stale(third)));
            assert_eq!(registry.resolve_address(third), Err(HandleError::Stale(third)));
        }

        // Same slot reused: the old handle names the new occupant
        tanks.free(1).unwrap();
        assert_eq!(tanks.spawn(Tank { armor: 11 }).unwrap(), 1);
        let mut registry = PoolRegistry::new();
        registry.register(&tanks).unwrap();
        assert_eq!(registry.resolve::<Tank>(second), Ok(&Tank { armor: 11 }));
        assert_eq!(registry.resolve_address(second), Ok(tanks.address_of(1).unwrap()));
    }

    #[test]
    fn test_resolution_errors() {
        let tanks: SlotPool<Tank> = SlotPool::new(Kind::Unit, 4).unwrap();
        let other: SlotPool<Tank> = SlotPool::new(Kind::Unit, 4).unwrap();
        let mut registry = PoolRegistry::new();
        registry.register(&tanks).unwrap();

        assert_eq!(registry.register(&other), Err(HandleError::DuplicatePool(Kind::Unit)));
        assert_eq!(registry.resolve::<Tank>(Handle::NONE), Err(HandleError::Null));
        assert_eq!(registry.handle_of(Address::NULL), Ok(Handle::NONE));

        let team = Handle::new(Kind::Team, 0).unwrap();
        assert_eq!(registry.resolve::<Squad>(team), Err(HandleError::NoPool(Kind::Team)));

        let foreign = Address::of(&registry as *const PoolRegistry<'_>);
        assert_eq!(registry.handle_of(foreign), Err(HandleError::ForeignAddress(foreign)));
    }

    #[test]
    fn test_type_mismatch() {
        let mut tanks: SlotPool<Tank> = SlotPool::new(Kind::Unit, 2).unwrap();
        let slot = tanks.allocate().unwrap();
        let mut registry = PoolRegistry::new();
        registry.register(&tanks).unwrap();

        let handle = tanks.handle(slot).unwrap();
        assert_eq!(
            registry.resolve::<Squad>(handle),
            Err(HandleError::TypeMismatch(Kind::Unit))
        );
    }
}
