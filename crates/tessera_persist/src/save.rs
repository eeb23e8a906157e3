//! # Save Files
//!
//! ## Layout
//!
//! ```text
//! header   "TSAV" | version: u16 | flags: u16 | payload_len: u32
//! pools    count: u8 | count x ( kind: u8 | record_size: u32 | capacity: u32 )
//! body     stored payload, payload_len bytes before cipher padding
//! trailer  sha1(plain sections): 20 bytes | crc32(body): u32
//! ```
//!
//! All integers are little-endian. The plain sections are the pool sections
//! of [`crate::archive`] in kind order.
//!
//! ## Chains
//!
//! ```text
//! save:  sections ─▶ Sha1 ─▶ [Lz4Compress] ─▶ payload
//!        payload + zero pad ─▶ [Cipher] ─▶ Crc32 ─▶ body
//! load:  body ─▶ Crc32 ─▶ [Cipher] ─▶ payload
//!        payload ─▶ [Lz4Decompress] ─▶ Sha1 ─▶ sections
//! ```
//!
//! The cipher always sees whole blocks, so encryption covers the entire
//! payload regardless of the partial block policy. With armor enabled the
//! complete file is base64 text.

use tessera_core::{Kind, PoolRegistry};
use tessera_stream::cipher::BLOCK_SIZE;
use tessera_stream::compress::DEFAULT_BLOCK;
use tessera_stream::digest::DIGEST_LEN;
use tessera_stream::{
    Base64Decode, Base64Encode, BlockPolicy, BufferSource, Cipher, Crc32, DecodePolicy,
    Lz4Compress, Lz4Decompress, Sha1, Sink, Source, TransformSink, TransformSource,
};

use crate::archive::PersistPool;
use crate::error::{PersistError, PersistResult};
use crate::record::{RecordReader, RecordWriter};
use crate::swizzle::SwizzleMap;
use crate::world::{registry_of, World};

/// File magic.
pub const MAGIC: [u8; 4] = *b"TSAV";

/// Current format version.
pub const VERSION: u16 = 1;

/// Flag: payload is LZ4 block compressed.
pub const FLAG_COMPRESSED: u16 = 1 << 0;

/// Flag: body is Blowfish encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 1;

const KNOWN_FLAGS: u16 = FLAG_COMPRESSED | FLAG_ENCRYPTED;

const TRAILER_LEN: usize = DIGEST_LEN + 4;

/// How a save file is written and read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOptions {
    /// Compress the payload.
    pub compress: bool,
    /// Raw bytes per compressed block.
    pub compression_block: usize,
    /// Blowfish key. `None` writes a plain body.
    pub key: Option<Vec<u8>>,
    /// Partial block handling of the cipher.
    pub cipher_policy: BlockPolicy,
    /// Wrap the whole file in base64 text.
    pub armor: bool,
    /// Decoding policy for armored files.
    pub base64_policy: DecodePolicy,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compress: true,
            compression_block: DEFAULT_BLOCK,
            key: None,
            cipher_policy: BlockPolicy::default(),
            armor: false,
            base64_policy: DecodePolicy::default(),
        }
    }
}

/// Outcome of a successful load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entities restored.
    pub entities: usize,
    /// Links cleared because their target was missing.
    pub stale_links: usize,
}

/// One entry of the pool table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PoolLayout {
    kind: Kind,
    record_size: usize,
    capacity: usize,
}

/// Serializes every pool of `world`.
///
/// The world is not modified: entities are swizzled on copies.
///
/// # Errors
///
/// - [`tessera_core::HandleError::ForeignAddress`] for a link outside the world
/// - [`PersistError::RecordOverflow`] for an entity larger than its record
/// - [`tessera_stream::StreamError`] from the cipher key or the chain
pub fn save_world(world: &World, options: &SaveOptions) -> PersistResult<Vec<u8>> {
    let map = world.swizzle_map();
    let mut flags = 0;

    // Plain sections, hashed, optionally compressed
    let mut payload = Vec::new();
    let digest = {
        let tail: Box<dyn Sink + '_> = if options.compress {
            flags |= FLAG_COMPRESSED;
            Box::new(TransformSink::new(
                Lz4Compress::with_block_size(options.compression_block),
                &mut payload,
            ))
        } else {
            Box::new(&mut payload)
        };
        let mut chain = TransformSink::new(Sha1::new(), tail);
        for pool in world.pools() {
            pool.save_records(&map, &mut chain)?;
        }
        chain.flush()?;
        chain.transform().digest()
    };
    let payload_len = payload.len();

    // Stored body, encrypted in whole blocks
    let mut body = Vec::with_capacity(payload_len + BLOCK_SIZE);
    let mut crc = TransformSink::new(Crc32::new(), &mut body);
    if let Some(key) = &options.key {
        flags |= FLAG_ENCRYPTED;
        payload.resize(payload_len.next_multiple_of(BLOCK_SIZE), 0);
        let mut cipher = TransformSink::new(Cipher::encrypt(key, options.cipher_policy)?, &mut crc);
        cipher.put(&payload)?;
        cipher.flush()?;
    } else {
        crc.put(&payload)?;
        crc.flush()?;
    }
    let checksum = crc.transform().checksum();

    let mut header = RecordWriter::unbounded();
    header.write_bytes(&MAGIC)?;
    header.write_u16(VERSION)?;
    header.write_u16(flags)?;
    header.write_u32(u32::try_from(payload_len).map_err(|_| {
        PersistError::CorruptRecord(format!("payload of {payload_len} bytes is too large"))
    })?)?;
    let layouts: Vec<PoolLayout> = world.pools().map(layout_of).collect();
    header.write_u8(layouts.len() as u8)?;
    for layout in &layouts {
        header.write_u8(layout.kind as u8)?;
        header.write_u32(layout.record_size as u32)?;
        header.write_u32(layout.capacity as u32)?;
    }

    let mut file = header.into_bytes();
    file.extend_from_slice(&body);
    file.extend_from_slice(&digest);
    file.extend_from_slice(&checksum.to_le_bytes());

    if options.armor {
        let mut text = Vec::with_capacity(file.len().div_ceil(3) * 4);
        let mut armor = TransformSink::new(Base64Encode::new(), &mut text);
        armor.put(&file)?;
        armor.flush()?;
        file = text;
    }

    tracing::info!(
        entities = world.entity_count(),
        bytes = file.len(),
        flags,
        armor = options.armor,
        "world saved"
    );
    Ok(file)
}

/// Replaces every pool of `world` with the contents of `bytes`.
///
/// The file is decoded into fresh pools and checked completely before the
/// world is touched. On error the world is unchanged.
///
/// # Errors
///
/// - [`PersistError::BadMagic`] / [`PersistError::UnsupportedVersion`] for foreign data
/// - [`PersistError::PoolLayoutMismatch`] if the world's pools do not fit the file
/// - [`PersistError::KeyRequired`] for an encrypted file without a key
/// - [`PersistError::ChecksumMismatch`] / [`PersistError::DigestMismatch`] for damaged data
/// - [`PersistError::Truncated`] / [`PersistError::CorruptRecord`] for malformed sections
pub fn load_world(world: &mut World, bytes: &[u8], options: &SaveOptions) -> PersistResult<LoadReport> {
    let unarmored;
    let file = if bytes.starts_with(&MAGIC) {
        bytes
    } else {
        let mut text = TransformSource::new(Base64Decode::new(options.base64_policy), BufferSource::new(bytes));
        let mut raw = Vec::with_capacity(bytes.len() / 4 * 3);
        text.read_to_end(&mut raw)?;
        unarmored = raw;
        &unarmored[..]
    };

    let mut reader = RecordReader::new(file);
    if reader.read_bytes(MAGIC.len())? != MAGIC {
        return Err(PersistError::BadMagic);
    }
    let version = reader.read_u16()?;
    if version != VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }
    let flags = reader.read_u16()?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(PersistError::CorruptRecord(format!("unknown flags {flags:#06x}")));
    }
    let payload_len = reader.read_u32()? as usize;
    let layouts = read_layouts(&mut reader)?;

    let mut fresh = Vec::with_capacity(layouts.len());
    for layout in &layouts {
        fresh.push(fresh_pool(world, layout)?);
    }
    check_unsaved_pools(world, &layouts)?;

    let stored_len = reader
        .remaining()
        .checked_sub(TRAILER_LEN)
        .ok_or(PersistError::Truncated {
            needed: TRAILER_LEN,
            remaining: reader.remaining(),
        })?;
    let body = reader.read_bytes(stored_len)?;
    let expected_digest = reader.read_bytes(DIGEST_LEN)?;
    let expected_checksum = reader.read_u32()?;

    // Stored body back to payload
    let mut payload = Vec::with_capacity(body.len());
    let mut crc = TransformSource::new(Crc32::new(), BufferSource::new(body));
    if flags & FLAG_ENCRYPTED == 0 {
        crc.read_to_end(&mut payload)?;
    } else {
        let key = options.key.as_deref().ok_or(PersistError::KeyRequired)?;
        TransformSource::new(Cipher::decrypt(key, options.cipher_policy)?, &mut crc)
            .read_to_end(&mut payload)?;
    }
    let computed = crc.transform().checksum();
    if computed != expected_checksum {
        return Err(PersistError::ChecksumMismatch {
            stored: expected_checksum,
            computed,
        });
    }
    if payload.len() < payload_len {
        return Err(PersistError::Truncated {
            needed: payload_len,
            remaining: payload.len(),
        });
    }
    payload.truncate(payload_len);

    // Payload back to pool sections
    let plain: Box<dyn Source + '_> = if flags & FLAG_COMPRESSED == 0 {
        Box::new(BufferSource::new(&payload))
    } else {
        Box::new(TransformSource::new(Lz4Decompress::new(), BufferSource::new(&payload)))
    };
    let mut sections = TransformSource::new(Sha1::new(), plain);
    let mut entities = 0;
    for pool in &mut fresh {
        entities += pool.load_records(&mut sections)?;
    }
    if sections.get(&mut [0u8; 1])? != 0 {
        return Err(PersistError::CorruptRecord("trailing bytes after the last pool".into()));
    }
    if sections.transform().digest()[..] != *expected_digest {
        return Err(PersistError::DigestMismatch);
    }

    let map = capture(&fresh);
    let stale_links = fresh
        .iter_mut()
        .map(|pool| pool.post_deserialize_all(&map))
        .sum::<usize>();

    world.replace_pools(fresh);
    tracing::info!(entities, stale_links, flags, "world loaded");
    Ok(LoadReport {
        entities,
        stale_links,
    })
}

fn layout_of(pool: &dyn PersistPool) -> PoolLayout {
    PoolLayout {
        kind: pool.kind(),
        record_size: pool.record_size(),
        capacity: pool.capacity(),
    }
}

fn read_layouts(reader: &mut RecordReader<'_>) -> PersistResult<Vec<PoolLayout>> {
    let count = usize::from(reader.read_u8()?);
    let mut layouts: Vec<PoolLayout> = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = reader.read_u8()?;
        let kind = Kind::from_u8(tag)
            .filter(|kind| *kind != Kind::None)
            .ok_or_else(|| PersistError::CorruptRecord(format!("pool table names kind {tag}")))?;
        if layouts.last().is_some_and(|last| last.kind >= kind) {
            return Err(PersistError::CorruptRecord(format!(
                "pool table out of order at {kind:?}"
            )));
        }
        layouts.push(PoolLayout {
            kind,
            record_size: reader.read_u32()? as usize,
            capacity: reader.read_u32()? as usize,
        });
    }
    Ok(layouts)
}

/// An empty pool of the world's type for a saved layout.
fn fresh_pool(world: &World, saved: &PoolLayout) -> PersistResult<Box<dyn PersistPool>> {
    let pool = world
        .pool_of(saved.kind)
        .ok_or_else(|| PersistError::PoolLayoutMismatch {
            kind: saved.kind,
            reason: "no pool registered".into(),
        })?;
    let live = layout_of(pool);
    if live.record_size != saved.record_size {
        return Err(PersistError::PoolLayoutMismatch {
            kind: saved.kind,
            reason: format!(
                "record size {} on file, {} registered",
                saved.record_size, live.record_size
            ),
        });
    }
    if live.capacity < saved.capacity {
        return Err(PersistError::PoolLayoutMismatch {
            kind: saved.kind,
            reason: format!(
                "capacity {} on file, only {} registered",
                saved.capacity, live.capacity
            ),
        });
    }
    pool.empty_like()
}

/// Every registered pool must appear in the file.
fn check_unsaved_pools(world: &World, layouts: &[PoolLayout]) -> PersistResult<()> {
    match world
        .pools()
        .find(|pool| !layouts.iter().any(|layout| layout.kind == pool.kind()))
    {
        Some(pool) => Err(PersistError::PoolLayoutMismatch {
            kind: pool.kind(),
            reason: "missing from the save file".into(),
        }),
        None => Ok(()),
    }
}

fn capture(pools: &[Box<dyn PersistPool>]) -> SwizzleMap {
    let registry: PoolRegistry<'_> = registry_of(pools.iter().map(|pool| &**pool));
    SwizzleMap::capture(&registry)
}
