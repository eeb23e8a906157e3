//! # Swizzling
//!
//! Before an entity is encoded every [`Link`] in it is rewritten from address
//! form to handle form. After it is decoded the links go back to address form
//! against the pools they were loaded into.
//!
//! Both directions use a [`SwizzleMap`], an owned snapshot of pool layouts
//! taken from a [`PoolRegistry`]. Owning the snapshot means entities can be
//! rewritten in place while the pools that hold them are borrowed mutably.

use tessera_core::{Address, Handle, HandleError, HandleResult, Kind, Occupancy, PoolRegistry};

use crate::error::PersistResult;
use crate::link::Link;

/// Layout of one pool at capture time.
#[derive(Clone, Debug)]
struct Span {
    kind: Kind,
    base: Address,
    stride: usize,
    capacity: usize,
    occupancy: Occupancy,
}

impl Span {
    fn slot_of(&self, address: Address) -> Option<usize> {
        let offset = address.get().checked_sub(self.base.get())?;
        let slot = offset / self.stride;
        (slot < self.capacity).then_some(slot)
    }
}

/// Address/handle mapping valid for one save or load pass.
#[derive(Clone, Debug, Default)]
pub struct SwizzleMap {
    spans: Vec<Span>,
}

impl SwizzleMap {
    /// Snapshots every pool in `registry`.
    #[must_use]
    pub fn capture(registry: &PoolRegistry<'_>) -> Self {
        let spans = registry
            .tables()
            .map(|table| Span {
                kind: table.kind(),
                base: table.base_address(),
                stride: table.slot_size(),
                capacity: table.capacity(),
                occupancy: table.occupancy().clone(),
            })
            .collect();
        Self { spans }
    }

    /// Number of pools captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Checks if no pool was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Handle for the slot an address falls in. Null maps to [`Handle::NONE`].
    ///
    /// # Errors
    ///
    /// [`HandleError::ForeignAddress`] if no captured pool contains the address.
    pub fn handle_of(&self, address: Address) -> HandleResult<Handle> {
        if address.is_null() {
            return Ok(Handle::NONE);
        }
        self.spans
            .iter()
            .find_map(|span| span.slot_of(address).map(|slot| (span.kind, slot)))
            .map_or(Err(HandleError::ForeignAddress(address)), |(kind, slot)| {
                Handle::new(kind, slot)
            })
    }

    /// Address of the occupied slot a handle names.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Null`] for the null handle
    /// - [`HandleError::NoPool`] if the kind was not captured
    /// - [`HandleError::Stale`] if the slot was free at capture time
    pub fn address_of(&self, handle: Handle) -> HandleResult<Address> {
        if handle.is_none() {
            return Err(HandleError::Null);
        }
        let span = self
            .spans
            .iter()
            .find(|span| span.kind == handle.kind())
            .ok_or(HandleError::NoPool(handle.kind()))?;
        let slot = handle.index();
        if !span.occupancy.contains(slot) {
            return Err(HandleError::Stale(handle));
        }
        Ok(Address::new(span.base.get() + slot * span.stride))
    }
}

/// Entities holding links to other entities.
///
/// Implementors only list their links; the conversions are provided.
///
/// # Example
///
/// ```rust,ignore
/// impl Swizzle for Team {
///     fn visit_links(&mut self, visit: &mut dyn FnMut(&mut Link)) {
///         visit(&mut self.template);
///         self.members.iter_mut().for_each(|member| visit(member));
///     }
/// }
/// ```
pub trait Swizzle {
    /// Calls `visit` once for every link field.
    fn visit_links(&mut self, visit: &mut dyn FnMut(&mut Link));

    /// Rewrites every address link to handle form.
    ///
    /// Must run after all other fields are final and before encoding.
    ///
    /// # Errors
    ///
    /// [`HandleError::ForeignAddress`] for an address outside every pool.
    fn pre_serialize(&mut self, map: &SwizzleMap) -> PersistResult<()> {
        let mut failure = None;
        self.visit_links(&mut |link| {
            let Link::Address(address) = *link else {
                return;
            };
            match map.handle_of(address) {
                Ok(handle) => *link = Link::from_handle(handle),
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        });
        match failure {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Rewrites every handle link to address form.
    ///
    /// Links whose target is missing are logged and cleared. Returns how many
    /// were cleared.
    fn post_deserialize(&mut self, map: &SwizzleMap) -> usize {
        let mut cleared = 0;
        self.visit_links(&mut |link| {
            let Link::Handle(handle) = *link else {
                return;
            };
            match map.address_of(handle) {
                Ok(address) => *link = Link::Address(address),
                Err(error) => {
                    tracing::warn!(
                        kind = handle.kind().name(),
                        slot = handle.index(),
                        %error,
                        "cleared dangling link"
                    );
                    *link = Link::Empty;
                    cleared += 1;
                }
            }
        });
        cleared
    }
}
