//! # Links
//!
//! A link is an entity's reference to another entity. In memory it holds the
//! target's address. Across a save it holds the target's handle. The swizzle
//! pass converts one form into the other.

use tessera_core::{Address, Handle};

/// Reference from one entity to another.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Link {
    /// No target.
    #[default]
    Empty,
    /// Live form: address of the target slot.
    Address(Address),
    /// Stable form: handle of the target slot.
    Handle(Handle),
}

impl Link {
    /// Checks if the link has no target.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Target address, if in live form.
    #[inline]
    #[must_use]
    pub const fn address(self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(address),
            _ => None,
        }
    }

    /// Target handle, if in stable form.
    #[inline]
    #[must_use]
    pub const fn handle(self) -> Option<Handle> {
        match self {
            Self::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    /// Stable form of a handle. The null handle is [`Link::Empty`].
    #[inline]
    #[must_use]
    pub const fn from_handle(handle: Handle) -> Self {
        if handle.is_none() {
            Self::Empty
        } else {
            Self::Handle(handle)
        }
    }
}
