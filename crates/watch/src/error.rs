//! Watch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A watch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The OS notification backend refused the subscription.
    #[display("failed to subscribe to filesystem notifications")]
    Subscribe,
    /// The refresh worker thread could not be spawned.
    #[display("failed to spawn watch worker")]
    Spawn(std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Both happen at setup time; if the OS is out of inotify watches or
        // threads, a retry without operator intervention won't help.
        false
    }
}
