//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;
use uuid::Uuid;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// The first three are fatal at open time (there is nothing to extract without
/// a readable index); the rest are fatal only for a single item.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The index header could not be decoded. The file is either not a
    /// texture cache index or is corrupt beyond recovery.
    #[display("malformed texture.entries header")]
    MalformedHeader,
    /// The index declared more entries than the file actually contains.
    #[display("truncated index: expected {expected} entries, read {read}")]
    TruncatedEntries {
        /// Entry count declared by the header.
        expected: u32,
        /// Complete records actually present before end of input.
        read: u32,
    },
    /// The directory does not hold the two required cache files.
    #[display("not a texture cache: {}", _0.display())]
    NotACache(#[error(not(source))] PathBuf),
    /// Seek or read fault on the fixed-slot store for one entry.
    #[display("failed to read slot {_0} from texture.cache")]
    SlotRead(#[error(not(source))] usize),
    /// The overflow body file for a split texture is gone.
    #[display("no texture body at {}", _0.display())]
    BodyMissing(#[error(not(source))] PathBuf),
    /// Duplicate identifier handed to a lookup that requires uniqueness.
    #[display("unknown texture {_0}")]
    UnknownTexture(#[error(not(source))] Uuid),
    /// An I/O operation on one of the cache files failed.
    #[display("I/O error")]
    Io(std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The viewer rewrites the index out-of-place, so a truncated read can
        // resolve itself on the next refresh.
        matches!(self, ErrorKind::TruncatedEntries { .. } | ErrorKind::Io(_))
    }
}
