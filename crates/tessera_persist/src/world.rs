//! # World
//!
//! The explicit context that owns every pool. Nothing here is global: two
//! worlds can live side by side, e.g. a running match and a replay check.

use tessera_core::{Handle, HandleError, Kind, PoolRegistry, SlotPool};

use crate::archive::{Entity, PersistPool};
use crate::config::PersistConfig;
use crate::error::{PersistError, PersistResult};
use crate::link::Link;
use crate::save::{self, LoadReport, SaveOptions};
use crate::swizzle::SwizzleMap;

/// Owner of one pool per registered entity kind.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// world.register::<Unit>(500)?;
/// world.register::<Team>(60)?;
///
/// let team = world.spawn(Team::default())?;
/// let unit = world.spawn(Unit { team: world.link_to(team)?, ..Unit::default() })?;
///
/// let bytes = world.save(&SaveOptions::default())?;
/// ```
pub struct World {
    pools: Vec<Option<Box<dyn PersistPool>>>,
}

impl World {
    /// Creates a world with no pools.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: (0..Kind::COUNT).map(|_| None).collect(),
        }
    }

    /// Adds a pool of `capacity` slots for `T`.
    ///
    /// # Errors
    ///
    /// - [`HandleError::DuplicatePool`] if `T::KIND` already has a pool
    /// - [`HandleError::NoPool`] for entities of [`Kind::None`]
    /// - pool configuration errors
    pub fn register<T: Entity>(&mut self, capacity: usize) -> PersistResult<()> {
        if T::KIND == Kind::None {
            return Err(HandleError::NoPool(Kind::None).into());
        }
        let entry = &mut self.pools[T::KIND.index()];
        if entry.is_some() {
            return Err(HandleError::DuplicatePool(T::KIND).into());
        }
        let pool: SlotPool<T> = SlotPool::new(T::KIND, capacity)?;
        *entry = Some(Box::new(pool));
        tracing::debug!(kind = T::KIND.name(), capacity, "pool registered");
        Ok(())
    }

    /// Adds a pool for `T` sized from the configuration.
    ///
    /// # Errors
    ///
    /// Same as [`World::register`].
    pub fn register_configured<T: Entity>(&mut self, config: &PersistConfig) -> PersistResult<()> {
        self.register::<T>(config.capacity(T::KIND))
    }

    /// The typed pool for `T`.
    ///
    /// # Errors
    ///
    /// [`PersistError::TypeNotRegistered`] or [`HandleError::TypeMismatch`].
    pub fn pool<T: Entity>(&self) -> PersistResult<&SlotPool<T>> {
        self.pools[T::KIND.index()]
            .as_ref()
            .ok_or(PersistError::TypeNotRegistered(T::KIND))?
            .as_any()
            .downcast_ref::<SlotPool<T>>()
            .ok_or_else(|| HandleError::TypeMismatch(T::KIND).into())
    }

    /// The typed pool for `T`, mutably.
    ///
    /// # Errors
    ///
    /// [`PersistError::TypeNotRegistered`] or [`HandleError::TypeMismatch`].
    pub fn pool_mut<T: Entity>(&mut self) -> PersistResult<&mut SlotPool<T>> {
        self.pools[T::KIND.index()]
            .as_mut()
            .ok_or(PersistError::TypeNotRegistered(T::KIND))?
            .as_any_mut()
            .downcast_mut::<SlotPool<T>>()
            .ok_or_else(|| HandleError::TypeMismatch(T::KIND).into())
    }

    /// Places an entity in the lowest free slot of its pool.
    ///
    /// # Errors
    ///
    /// [`tessera_core::PoolError::Exhausted`] when the pool is full.
    pub fn spawn<T: Entity>(&mut self, entity: T) -> PersistResult<Handle> {
        let slot = self.pool_mut::<T>()?.spawn(entity)?;
        Ok(Handle::new(T::KIND, slot)?)
    }

    /// Frees the slot a handle names.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Null`] for the null handle
    /// - [`PersistError::TypeNotRegistered`] if the kind has no pool
    /// - [`tessera_core::PoolError::NotOccupied`] if the slot is already free
    pub fn despawn(&mut self, handle: Handle) -> PersistResult<()> {
        if handle.is_none() {
            return Err(HandleError::Null.into());
        }
        self.pools[handle.kind().index()]
            .as_mut()
            .ok_or(PersistError::TypeNotRegistered(handle.kind()))?
            .release(handle.index())
    }

    /// The live entity a handle names.
    ///
    /// # Errors
    ///
    /// [`HandleError::Stale`] for a free slot, [`HandleError::TypeMismatch`]
    /// for a handle of another kind.
    pub fn get<T: Entity>(&self, handle: Handle) -> PersistResult<&T> {
        check_kind::<T>(handle)?;
        self.pool::<T>()?
            .get(handle.index())
            .ok_or_else(|| HandleError::Stale(handle).into())
    }

    /// The live entity a handle names, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`World::get`].
    pub fn get_mut<T: Entity>(&mut self, handle: Handle) -> PersistResult<&mut T> {
        check_kind::<T>(handle)?;
        self.pool_mut::<T>()?
            .get_mut(handle.index())
            .ok_or_else(|| HandleError::Stale(handle).into())
    }

    /// Live link to the entity a handle names.
    ///
    /// # Errors
    ///
    /// If the handle does not name a live entity.
    pub fn link_to(&self, handle: Handle) -> PersistResult<Link> {
        if handle.is_none() {
            return Ok(Link::Empty);
        }
        Ok(Link::Address(self.registry().resolve_address(handle)?))
    }

    /// Handle of a link's target, if it has one.
    ///
    /// # Errors
    ///
    /// [`HandleError::ForeignAddress`] for an address outside this world.
    pub fn handle_of(&self, link: Link) -> PersistResult<Handle> {
        match link {
            Link::Empty => Ok(Handle::NONE),
            Link::Handle(handle) => Ok(handle),
            Link::Address(address) => Ok(self.registry().handle_of(address)?),
        }
    }

    /// The entity a link points at, if it is alive and of type `T`.
    #[must_use]
    pub fn follow<T: Entity>(&self, link: Link) -> Option<&T> {
        let handle = self.handle_of(link).ok()?;
        self.get(handle).ok()
    }

    /// Registry over every pool.
    #[must_use]
    pub fn registry(&self) -> PoolRegistry<'_> {
        registry_of(self.pools())
    }

    /// Swizzle snapshot of every pool.
    #[must_use]
    pub fn swizzle_map(&self) -> SwizzleMap {
        SwizzleMap::capture(&self.registry())
    }

    /// Live entities across all pools.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.pools().map(|pool| pool.active_count()).sum()
    }

    /// Writes a save file.
    ///
    /// # Errors
    ///
    /// See [`save::save_world`].
    pub fn save(&self, options: &SaveOptions) -> PersistResult<Vec<u8>> {
        save::save_world(self, options)
    }

    /// Replaces every pool with the contents of a save file.
    ///
    /// On error the world is left exactly as it was.
    ///
    /// # Errors
    ///
    /// See [`save::load_world`].
    pub fn load(&mut self, bytes: &[u8], options: &SaveOptions) -> PersistResult<LoadReport> {
        save::load_world(self, bytes, options)
    }

    /// Registered pools in kind order.
    pub(crate) fn pools(&self) -> impl Iterator<Item = &dyn PersistPool> + '_ {
        self.pools.iter().filter_map(|pool| pool.as_deref())
    }

    /// The pool for a kind.
    pub(crate) fn pool_of(&self, kind: Kind) -> Option<&dyn PersistPool> {
        self.pools[kind.index()].as_deref()
    }

    /// Swaps in a complete set of pools.
    pub(crate) fn replace_pools(&mut self, pools: Vec<Box<dyn PersistPool>>) {
        for pool in pools {
            let index = pool.kind().index();
            self.pools[index] = Some(pool);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a registry over a set of pools.
pub(crate) fn registry_of<'a>(pools: impl Iterator<Item = &'a dyn PersistPool>) -> PoolRegistry<'a> {
    let mut registry = PoolRegistry::new();
    for pool in pools {
        // Kinds are unique per world
        if let Err(error) = registry.register(pool.as_table()) {
            tracing::error!(%error, "pool skipped while building registry");
        }
    }
    registry
}

fn check_kind<T: Entity>(handle: Handle) -> PersistResult<()> {
    if handle.is_none() {
        return Err(HandleError::Null.into());
    }
    if handle.kind() != T::KIND {
        return Err(HandleError::TypeMismatch(handle.kind()).into());
    }
    Ok(())
}
