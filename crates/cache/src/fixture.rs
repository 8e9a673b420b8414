//! Synthetic cache construction for testing.
//!
//! Writes a complete head/body cache layout (index, fixed-slot store, and
//! overflow body files) into any directory. Intended for unit tests in this
//! crate and its consumers; nothing here touches a real viewer cache.
//!
//! # Examples
//!
//! ```
//! use courier_cache::fixture::CacheFixture;
//! use uuid::Uuid;
//!
//! let dir = tempfile::tempdir().unwrap();
//! CacheFixture::new()
//!     .empty(Uuid::from_u128(1))
//!     .slot_only(Uuid::from_u128(2), &[0xffu8; 500], 1_700_000_000)
//!     .write_to(dir.path())
//!     .unwrap();
//! ```

use crate::codec::{ENTRY_BYTE_COUNT, HEADER_BYTE_COUNT, SLOT_BYTE_COUNT};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Serialise a 44-byte index header.
pub fn header_bytes(version: f32, encoder: &str, entry_count: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_BYTE_COUNT);
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(&32u32.to_le_bytes());
    let mut name = [0u8; 32];
    name[..encoder.len()].copy_from_slice(encoder.as_bytes());
    bytes.extend_from_slice(&name);
    bytes.extend_from_slice(&entry_count.to_le_bytes());
    bytes
}

/// Serialise one 28-byte index record.
pub fn entry_bytes(id: Uuid, image_size: i32, body_size: i32, captured_at: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ENTRY_BYTE_COUNT);
    bytes.extend_from_slice(id.as_bytes());
    bytes.extend_from_slice(&image_size.to_le_bytes());
    bytes.extend_from_slice(&body_size.to_le_bytes());
    bytes.extend_from_slice(&captured_at.to_le_bytes());
    bytes
}

struct FixtureEntry {
    id: Uuid,
    image_size: i32,
    body_size: i32,
    captured_at: u32,
    slot: Vec<u8>,
    body: Option<Vec<u8>>,
}

/// Builder for an on-disk synthetic cache.
#[derive(Default)]
pub struct CacheFixture {
    entries: Vec<FixtureEntry>,
}

impl CacheFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unused slot (`image_size = -1`), the way the viewer marks evicted
    /// textures.
    pub fn empty(mut self, id: Uuid) -> Self {
        self.entries.push(FixtureEntry {
            id,
            image_size: -1,
            body_size: 0,
            captured_at: 0,
            slot: vec![0u8; SLOT_BYTE_COUNT],
            body: None,
        });
        self
    }

    /// A texture that fits entirely inside its 600-byte slot.
    ///
    /// Panics if `data` exceeds the slot size; broken test setup should not
    /// pass silently.
    pub fn slot_only(mut self, id: Uuid, data: &[u8], captured_at: u32) -> Self {
        assert!(data.len() <= SLOT_BYTE_COUNT, "slot-only texture larger than a slot");
        let mut slot = data.to_vec();
        slot.resize(SLOT_BYTE_COUNT, 0);
        self.entries.push(FixtureEntry {
            id,
            image_size: data.len() as i32,
            body_size: 0,
            captured_at,
            slot,
            body: None,
        });
        self
    }

    /// A texture split across its slot and an overflow body file.
    ///
    /// `data` is the full logical codestream; the first 600 bytes land in the
    /// slot and the rest in `<firstHexChar>/<id>.texture`.
    pub fn split(mut self, id: Uuid, data: &[u8], captured_at: u32) -> Self {
        assert!(data.len() > SLOT_BYTE_COUNT, "split texture must exceed a slot");
        let (head, body) = data.split_at(SLOT_BYTE_COUNT);
        self.entries.push(FixtureEntry {
            id,
            image_size: data.len() as i32,
            body_size: body.len() as i32,
            captured_at,
            slot: head.to_vec(),
            body: Some(body.to_vec()),
        });
        self
    }

    /// Record an arbitrary entry with explicit sizes, slot content, and an
    /// optional body file. Escape hatch for corruption scenarios the other
    /// constructors refuse to produce (declared sizes that disagree with the
    /// bytes on disk, missing bodies, short bodies).
    pub fn entry(
        mut self,
        id: Uuid,
        image_size: i32,
        body_size: i32,
        captured_at: u32,
        slot: &[u8],
        body: Option<&[u8]>,
    ) -> Self {
        let mut slot = slot.to_vec();
        slot.resize(SLOT_BYTE_COUNT, 0);
        self.entries.push(FixtureEntry {
            id,
            image_size,
            body_size,
            captured_at,
            slot,
            body: body.map(<[u8]>::to_vec),
        });
        self
    }

    /// Write `texture.entries`, `texture.cache`, and any body files into
    /// `dir`. Overwrites whatever was there, so repeated writes model the
    /// viewer rewriting its cache between refreshes.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        let mut index = header_bytes(1.0, "fixture", self.entries.len() as u32);
        let mut store = Vec::with_capacity(self.entries.len() * SLOT_BYTE_COUNT);
        for entry in &self.entries {
            index.extend(entry_bytes(entry.id, entry.image_size, entry.body_size, entry.captured_at));
            store.extend_from_slice(&entry.slot);
            if let Some(body) = &entry.body {
                let subdir = dir.join(&entry.id.to_string()[..1]);
                fs::create_dir_all(&subdir)?;
                fs::write(subdir.join(format!("{}.texture", entry.id)), body)?;
            }
        }
        fs::write(dir.join("texture.entries"), index)?;
        fs::write(dir.join("texture.cache"), store)?;
        Ok(())
    }
}
