//! # Handles
//!
//! A handle names one slot of one pool in a single 32-bit value:
//! - Upper 8 bits: entity kind tag
//! - Lower 24 bits: slot index inside that kind's pool
//!
//! The kind tag never exceeds 127, so the packed value keeps its meaning when
//! stored in a signed 32-bit field. Kind [`Kind::None`] with index 0 is the raw
//! value 0, which is [`Handle::NONE`].

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{HandleError, HandleResult};

/// Bits reserved for the slot index.
pub const INDEX_BITS: u32 = 24;

/// Largest slot index a handle can carry.
pub const MAX_INDEX: usize = (1 << INDEX_BITS) - 1;

const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Entity category. One pool exists per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Kind {
    /// No entity. Handles of this kind are null.
    None = 0,
    /// Vehicles.
    Unit = 1,
    /// Buildings and other placed structures.
    Structure = 2,
    /// Foot soldiers.
    Infantry = 3,
    /// Bullets, shells and missiles in flight.
    Projectile = 4,
    /// Short lived visual effects.
    Effect = 5,
    /// Trees and other terrain features.
    Terrain = 6,
    /// Scripted triggers.
    Trigger = 7,
    /// Live AI teams.
    Team = 8,
    /// Team templates that teams are built from.
    TeamTemplate = 9,
    /// Map cells.
    Cell = 10,
}

impl Kind {
    /// Number of kind tags, including [`Kind::None`].
    pub const COUNT: usize = 11;

    /// Every kind that owns a pool, in the fixed save order.
    pub const POOLED: [Kind; 10] = [
        Kind::Unit,
        Kind::Structure,
        Kind::Infantry,
        Kind::Projectile,
        Kind::Effect,
        Kind::Terrain,
        Kind::Trigger,
        Kind::Team,
        Kind::TeamTemplate,
        Kind::Cell,
    ];

    /// Converts from the raw tag.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Unit),
            2 => Some(Self::Structure),
            3 => Some(Self::Infantry),
            4 => Some(Self::Projectile),
            5 => Some(Self::Effect),
            6 => Some(Self::Terrain),
            7 => Some(Self::Trigger),
            8 => Some(Self::Team),
            9 => Some(Self::TeamTemplate),
            10 => Some(Self::Cell),
            _ => None,
        }
    }

    /// Position of this kind in per-kind tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short lowercase name used in logs and config files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Unit => "unit",
            Self::Structure => "structure",
            Self::Infantry => "infantry",
            Self::Projectile => "projectile",
            Self::Effect => "effect",
            Self::Terrain => "terrain",
            Self::Trigger => "trigger",
            Self::Team => "team",
            Self::TeamTemplate => "team_template",
            Self::Cell => "cell",
        }
    }
}

/// Packed reference to one slot of one pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The null handle.
    pub const NONE: Self = Self(0);

    /// Packs a kind and slot index.
    ///
    /// Any handle of kind [`Kind::None`] collapses to [`Handle::NONE`].
    ///
    /// # Errors
    ///
    /// [`HandleError::IndexOverflow`] if `slot` does not fit in 24 bits.
    pub const fn new(kind: Kind, slot: usize) -> HandleResult<Self> {
        if matches!(kind, Kind::None) {
            return Ok(Self::NONE);
        }
        if slot > MAX_INDEX {
            return Err(HandleError::IndexOverflow(slot));
        }
        Ok(Self(((kind as u32) << INDEX_BITS) | slot as u32))
    }

    /// Rebuilds a handle from its raw form, checking the kind tag.
    ///
    /// # Errors
    ///
    /// [`HandleError::UnknownKind`] if the tag names no kind.
    pub const fn from_raw(raw: u32) -> HandleResult<Self> {
        let tag = (raw >> INDEX_BITS) as u8;
        match Kind::from_u8(tag) {
            Some(Kind::None) => Ok(Self::NONE),
            Some(_) => Ok(Self(raw)),
            None => Err(HandleError::UnknownKind(tag)),
        }
    }

    /// Rebuilds a handle from a signed field.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::from_raw`].
    pub const fn from_i32(value: i32) -> HandleResult<Self> {
        Self::from_raw(value as u32)
    }

    /// The raw 32-bit form.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The raw form reinterpreted as a signed value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    /// The kind tag.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> Kind {
        match Kind::from_u8((self.0 >> INDEX_BITS) as u8) {
            Some(kind) => kind,
            None => Kind::None,
        }
    }

    /// The slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self.kind(), Kind::None)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({self})")
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            write!(f, "{}#{}", self.kind().name(), self.index())
        }
    }
}
