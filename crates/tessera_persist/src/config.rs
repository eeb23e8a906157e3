//! # Persistence Configuration
//!
//! Pool capacities and save options, read once at startup.
//!
//! ```toml
//! [pools]
//! unit = 500
//! cell = 16384
//!
//! [save]
//! compress = true
//! armor = false
//! key = "allied command key"
//! cipher_policy = "reject"
//! base64_policy = "strict"
//! ```
//!
//! Every field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use tessera_core::Kind;
use tessera_stream::cipher::{MAX_KEY_LEN, MIN_KEY_LEN};
use tessera_stream::compress::{DEFAULT_BLOCK, MAX_BLOCK};
use tessera_stream::{BlockPolicy, DecodePolicy};

use crate::error::{PersistError, PersistResult};
use crate::save::SaveOptions;

/// Complete persistence configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Slot count per entity kind.
    pub pools: PoolCapacities,
    /// Save file options.
    pub save: SaveConfig,
}

/// Slot count per entity kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    /// Vehicle slots.
    pub unit: usize,
    /// Building slots.
    pub structure: usize,
    /// Foot soldier slots.
    pub infantry: usize,
    /// Projectiles in flight at once.
    pub projectile: usize,
    /// Visual effect slots.
    pub effect: usize,
    /// Terrain feature slots.
    pub terrain: usize,
    /// Scripted trigger slots.
    pub trigger: usize,
    /// Live AI team slots.
    pub team: usize,
    /// Team template slots.
    pub team_template: usize,
    /// Map cells, one per cell of the largest map.
    pub cell: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            unit: 500,
            structure: 500,
            infantry: 500,
            projectile: 40,
            effect: 100,
            terrain: 500,
            trigger: 60,
            team: 60,
            team_template: 60,
            cell: 128 * 128,
        }
    }
}

/// Save file options as written in TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Compress the payload.
    pub compress: bool,
    /// Raw bytes per compressed block.
    pub compression_block: usize,
    /// Wrap the file in base64 text.
    pub armor: bool,
    /// Blowfish key, 4 to 56 bytes. Absent means no encryption.
    pub key: Option<String>,
    /// Partial cipher block handling.
    pub cipher_policy: BlockPolicy,
    /// Armored file decoding.
    pub base64_policy: DecodePolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            compress: true,
            compression_block: DEFAULT_BLOCK,
            armor: false,
            key: None,
            cipher_policy: BlockPolicy::default(),
            base64_policy: DecodePolicy::default(),
        }
    }
}

impl SaveConfig {
    /// Validated runtime options.
    ///
    /// # Errors
    ///
    /// [`PersistError::Config`] for a key or block size out of range.
    pub fn options(&self) -> PersistResult<SaveOptions> {
        if let Some(key) = &self.key {
            if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
                return Err(PersistError::Config(format!(
                    "save.key must be {MIN_KEY_LEN} to {MAX_KEY_LEN} bytes, got {}",
                    key.len()
                )));
            }
        }
        if !(1..=MAX_BLOCK).contains(&self.compression_block) {
            return Err(PersistError::Config(format!(
                "save.compression_block must be 1 to {MAX_BLOCK}, got {}",
                self.compression_block
            )));
        }
        Ok(SaveOptions {
            compress: self.compress,
            compression_block: self.compression_block,
            key: self.key.as_ref().map(|key| key.as_bytes().to_vec()),
            cipher_policy: self.cipher_policy,
            armor: self.armor,
            base64_policy: self.base64_policy,
        })
    }
}

impl PersistConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// [`PersistError::Config`] if the document is malformed.
    pub fn from_toml_str(text: &str) -> PersistResult<Self> {
        toml::from_str(text).map_err(|e| PersistError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// [`PersistError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> PersistResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PersistError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "persistence config loaded");
        Ok(config)
    }

    /// Configured slot count for a kind. [`Kind::None`] has no pool.
    #[must_use]
    pub const fn capacity(&self, kind: Kind) -> usize {
        let pools = &self.pools;
        match kind {
            Kind::None => 0,
            Kind::Unit => pools.unit,
            Kind::Structure => pools.structure,
            Kind::Infantry => pools.infantry,
            Kind::Projectile => pools.projectile,
            Kind::Effect => pools.effect,
            Kind::Terrain => pools.terrain,
            Kind::Trigger => pools.trigger,
            Kind::Team => pools.team,
            Kind::TeamTemplate => pools.team_template,
            Kind::Cell => pools.cell,
        }
    }
}
