//! Body locator: slot reads from `texture.cache` and overflow file access.
//!
//! Every cached texture owns one fixed 600-byte slot in the secondary store,
//! positionally aligned with its index record. Textures larger than a slot
//! spill the remainder into a per-texture overflow file at
//! `<cacheDir>/<firstHexChar>/<uuid>.texture`.

use crate::codec::SLOT_BYTE_COUNT;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// File extension the viewer gives overflow body files.
pub const BODY_EXTENSION: &str = "texture";

/// Deterministic location of a texture's overflow body file.
///
/// The viewer shards bodies into sixteen subdirectories keyed by the first
/// hex character of the identifier.
pub fn overflow_path(cache_dir: &Path, id: &Uuid) -> PathBuf {
    let canonical = id.to_string();
    cache_dir.join(&canonical[..1]).join(format!("{canonical}.{BODY_EXTENSION}"))
}

/// Shared read access to one generation's cache files.
///
/// The snapshot owns the open handle to the fixed-slot store; items hold an
/// `Arc` of this and only enough data (slot index, identifier) to request a
/// read. The mutex serialises the seek+read pair, which is the only piece of
/// shared mutable state between concurrently extracted items.
#[derive(Debug)]
pub struct StoreReader {
    cache_dir: PathBuf,
    store: Mutex<File>,
}

impl StoreReader {
    pub(crate) fn open(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        let store = File::open(cache_dir.join("texture.cache")).map_err(ErrorKind::Io)?;
        Ok(Self { cache_dir, store: Mutex::new(store) })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Read the fixed slot for entry `index`.
    ///
    /// Seeks to `600 * index` and reads up to 600 bytes. The store is often
    /// shorter than `entry_count * 600` near end-of-file; a short (or empty)
    /// read is the actual on-disk behaviour there and is *not* a failure.
    /// Only a seek or read fault maps to [`ErrorKind::SlotRead`].
    pub fn read_slot(&self, index: usize) -> Result<Vec<u8>> {
        let mut store = self.store.lock().expect("slot store lock poisoned");
        store
            .seek(SeekFrom::Start((SLOT_BYTE_COUNT * index) as u64))
            .or_raise(|| ErrorKind::SlotRead(index))?;
        let mut slot = Vec::with_capacity(SLOT_BYTE_COUNT);
        store
            .by_ref()
            .take(SLOT_BYTE_COUNT as u64)
            .read_to_end(&mut slot)
            .or_raise(|| ErrorKind::SlotRead(index))?;
        Ok(slot)
    }

    /// Location of `id`'s overflow body file under this cache directory.
    pub fn overflow_path(&self, id: &Uuid) -> PathBuf {
        overflow_path(&self.cache_dir, id)
    }

    /// Read `id`'s overflow body file in full.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::BodyMissing`] when the file does not exist. For a split
    /// texture this is a hard failure; the slot alone is not a valid
    /// codestream.
    pub fn read_overflow(&self, id: &Uuid) -> Result<Vec<u8>> {
        let path = self.overflow_path(id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::BodyMissing(path))
            },
            Err(e) => Err(ErrorKind::Io(e).into()),
        }
    }

    /// Size in bytes of whatever overflow file currently exists on disk,
    /// zero when there is none. Used for the completeness check without
    /// reading the file.
    pub fn overflow_len(&self, id: &Uuid) -> u64 {
        std::fs::metadata(self.overflow_path(id)).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::CacheFixture;

    #[test]
    fn test_overflow_path_layout() {
        let id = Uuid::from_u128(0xab00_0000_0000_0000_0000_0000_0000_0001);
        let path = overflow_path(Path::new("/cache"), &id);
        assert_eq!(path, Path::new("/cache/a/ab000000-0000-0000-0000-000000000001.texture"));
    }

    #[test]
    fn test_read_slot_exact() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::from_u128(1);
        CacheFixture::new()
            .slot_only(Uuid::from_u128(2), &[0x11u8; 600], 0)
            .slot_only(id, &[0x22u8; 600], 0)
            .write_to(dir.path())
            .unwrap();
        let reader = StoreReader::open(dir.path()).unwrap();
        let slot = reader.read_slot(1).unwrap();
        assert_eq!(slot, vec![0x22u8; 600]);
    }

    #[test]
    fn test_read_slot_short_store() {
        // The store is shorter than entry_count * 600 near EOF. Whatever
        // bytes exist come back; past the end an empty read is fine too.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("texture.cache"), [0xeeu8; 750]).unwrap();
        std::fs::write(dir.path().join("texture.entries"), []).unwrap();
        let reader = StoreReader::open(dir.path()).unwrap();
        assert_eq!(reader.read_slot(1).unwrap().len(), 150);
        assert_eq!(reader.read_slot(5).unwrap().len(), 0);
    }

    #[test]
    fn test_read_overflow_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("texture.cache"), []).unwrap();
        let reader = StoreReader::open(dir.path()).unwrap();
        let err = reader.read_overflow(&Uuid::from_u128(9)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::BodyMissing(_)));
        assert_eq!(reader.overflow_len(&Uuid::from_u128(9)), 0);
    }
}
