//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Most extraction faults never surface as a `Result`: per-item problems are
//! folded into a terminal [`Outcome`](crate::Outcome) so one corrupt texture
//! cannot abort a run. The kinds here cover codec calls and the few
//! pipeline-level operations that genuinely have no item to blame.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The external codec rejected a codestream or failed to re-encode it.
    #[display("codec error: {_0}")]
    Codec(#[error(not(source))] String),
    /// The output directory could not be created.
    #[display("cannot create output directory {}", _0.display())]
    OutputDir(#[error(not(source))] PathBuf),
    /// Writing an output file failed.
    #[display("failed to write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// An I/O operation failed.
    #[display("I/O error")]
    Io(std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A rejected codestream stays rejected; disk-level faults may clear.
        !matches!(self, ErrorKind::Codec(_))
    }
}
