//! A reconstructable cache item: one index entry plus the means to read its
//! bytes back out of the head/body storage layout.

use crate::codec::Entry;
use crate::error::Result;
use crate::store::StoreReader;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Largest declared image size for which the 600-byte slot alone is treated
/// as the whole codestream.
///
/// Historical implementations disagree between 600 and 601 here; this crate
/// follows the looser 601 bound, because a 601-byte declaration with
/// `body_size == 0` has no overflow file to read anyway and codestream
/// formats carry their own end marker.
pub const SLOT_ONLY_MAX_IMAGE_SIZE: i32 = 601;

/// One extractable texture.
///
/// Items are cheap to clone and hold no open file of their own; reads go
/// through the snapshot-owned [`StoreReader`]. An item stays valid (and keeps
/// its generation's store handle alive) even after the snapshot has merged a
/// newer generation over it.
#[derive(Clone)]
pub struct Item {
    entry: Entry,
    index: usize,
    reader: Arc<StoreReader>,
}

impl Item {
    pub(crate) fn new(entry: Entry, index: usize, reader: Arc<StoreReader>) -> Self {
        Self { entry, index, reader }
    }

    pub fn id(&self) -> Uuid {
        self.entry.id
    }

    /// Slot index in the secondary store, counting from zero.
    pub fn slot_index(&self) -> usize {
        self.index
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn image_size(&self) -> i32 {
        self.entry.image_size
    }

    pub fn body_size(&self) -> i32 {
        self.entry.body_size
    }

    pub fn captured_at(&self) -> u32 {
        self.entry.captured_at
    }

    /// Logically empty entries have no recoverable bytes.
    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    /// Where this item's overflow body file would live, whether or not it
    /// currently exists.
    pub fn overflow_path(&self) -> PathBuf {
        self.reader.overflow_path(&self.entry.id)
    }

    /// Whether the bytes currently on disk add up to the declared total:
    /// the fixed-slot contribution (`image_size - body_size`) plus whatever
    /// overflow bytes exist must equal `image_size`.
    ///
    /// This distinguishes partially-downloaded textures from complete ones
    /// without touching codec internals. Slot-only textures are always
    /// complete by this measure.
    pub fn is_complete_on_disk(&self) -> bool {
        let head = i64::from(self.entry.image_size) - i64::from(self.entry.body_size);
        let overflow = self.reader.overflow_len(&self.entry.id) as i64;
        head + overflow == i64::from(self.entry.image_size)
    }

    /// Reconstruct the logical codestream.
    ///
    /// If `image_size <= 601` and `body_size == 0` the slot alone is the
    /// stream; it may contain trailing bytes past the true image end, which
    /// is tolerated because the codestream carries its own end marker.
    /// Otherwise the stream is the slot followed by the overflow file, and a
    /// missing overflow file is a hard failure for this item.
    ///
    /// Deterministic: repeated calls without an underlying file change yield
    /// byte-identical output.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut head = self.reader.read_slot(self.index)?;
        if self.entry.image_size <= SLOT_ONLY_MAX_IMAGE_SIZE && self.entry.body_size == 0 {
            return Ok(head);
        }
        let body = self.reader.read_overflow(&self.entry.id)?;
        head.extend_from_slice(&body);
        Ok(head)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item").field("entry", &self.entry).field("index", &self.index).finish_non_exhaustive()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entry)
    }
}
