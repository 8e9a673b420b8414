//! One decoded generation of the texture cache, with incremental diffing.
//!
//! A [`Snapshot`] owns the decoded index and a live identifier-to-item map.
//! Each [`refresh`](Snapshot::refresh) re-decodes the whole index and merges
//! only changed identifiers into the map, returning exactly the new or
//! changed items. Re-decoding everything is O(entry_count), but records are
//! 28 bytes and caches top out in the tens of thousands of entries, so a full
//! re-scan is simpler and more robust than tracking a byte cursor into a file
//! the viewer rewrites out-of-place.

use crate::codec::{self, Entry, Header};
use crate::error::{ErrorKind, Result};
use crate::item::Item;
use crate::store::StoreReader;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// File name of the index within a cache directory.
pub const INDEX_FILE_NAME: &str = "texture.entries";
/// File name of the fixed-slot store within a cache directory.
pub const STORE_FILE_NAME: &str = "texture.cache";

/// One decoded generation of a viewer texture cache.
pub struct Snapshot {
    cache_dir: PathBuf,
    header: Header,
    entries: Vec<Entry>,
    items: HashMap<Uuid, Item>,
}

impl Snapshot {
    /// Open a cache directory and load the initial generation.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotACache`] when either required file
    /// (`texture.entries`, `texture.cache`) is absent, plus any decode error
    /// from the initial load.
    #[instrument]
    pub fn open(cache_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        if !cache_dir.is_dir()
            || !cache_dir.join(INDEX_FILE_NAME).is_file()
            || !cache_dir.join(STORE_FILE_NAME).is_file()
        {
            exn::bail!(ErrorKind::NotACache(cache_dir));
        }
        let mut snapshot = Self {
            cache_dir,
            header: Header::default(),
            entries: Vec::new(),
            items: HashMap::new(),
        };
        let loaded = snapshot.refresh()?;
        debug!(items = loaded.len(), "initial cache load");
        Ok(snapshot)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Header of the most recently decoded generation.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of entries in the current generation, including empty slots.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Re-decode the index and merge the new generation into the live map.
    ///
    /// Returns exactly the items that are new or whose equality key
    /// `(identifier, captured_at, body_size)` changed. Idempotent per
    /// unchanged identifier: with no underlying file change, a second call
    /// returns an empty set.
    ///
    /// If the entry count shrank the cache was cleared by the viewer; every
    /// previously known item is discarded before the merge, so all surviving
    /// identifiers come back as changed.
    ///
    /// Unchanged identifiers are left alone entirely. Their items keep the
    /// store handle of the generation they were created in, so in-flight
    /// readers never observe a handle swap mid-read.
    #[instrument(skip(self), fields(cache_dir = %self.cache_dir.display()))]
    pub fn refresh(&mut self) -> Result<Vec<Item>> {
        let index = std::fs::read(self.cache_dir.join(INDEX_FILE_NAME)).map_err(ErrorKind::Io)?;
        let header = codec::decode_header(&index)?;
        let entries = codec::decode_entries(&index, header.entry_count)?;
        // A fresh handle per generation: the viewer rewrites texture.cache
        // out-of-place, so new items must not read through an old inode.
        let reader = Arc::new(StoreReader::open(&self.cache_dir)?);

        if entries.len() < self.entries.len() {
            info!(
                before = self.entries.len(),
                after = entries.len(),
                "entry count shrank, treating cache as cleared"
            );
            self.items.clear();
        }

        let mut changed = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let unchanged = self.items.get(&entry.id).is_some_and(|known| known.entry() == entry);
            if unchanged {
                continue;
            }
            let item = Item::new(entry.clone(), index, Arc::clone(&reader));
            self.items.insert(entry.id, item.clone());
            changed.push(item);
        }
        debug!(total = entries.len(), changed = changed.len(), "refreshed snapshot");
        self.header = header;
        self.entries = entries;
        Ok(changed)
    }

    /// Latest item for `id`, if any generation has seen it.
    pub fn get(&self, id: &Uuid) -> Option<Item> {
        self.items.get(id).cloned()
    }

    /// All current items in slot order.
    ///
    /// Finite and restartable: each call walks the map state as of now, not a
    /// live-updating cursor. Duplicated identifiers (a viewer bug, but it
    /// happens) yield once, at their first slot.
    pub fn iter(&self) -> impl Iterator<Item = Item> + '_ {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.iter().filter_map(move |entry| {
            if !seen.insert(entry.id) {
                return None;
            }
            self.items.get(&entry.id).cloned()
        })
    }

    /// Convenience wrapper over [`refresh`](Snapshot::refresh) that maps the
    /// retryable truncated-index race (the viewer mid-rewrite) to an empty
    /// changed set, leaving the previous generation intact.
    pub fn refresh_tolerant(&mut self) -> Result<Vec<Item>> {
        match self.refresh() {
            Ok(changed) => Ok(changed),
            Err(err) if err.is_retryable() => {
                debug!(error = %err, "transient refresh failure, keeping previous generation");
                Ok(Vec::new())
            },
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("cache_dir", &self.cache_dir)
            .field("header", &self.header)
            .field("items", &self.items.len())
            .finish()
    }
}
