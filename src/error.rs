//! Binary-level error types.
//!
//! Everything fatal funnels through these before reaching `main`; per-item
//! extraction problems never do (they are tallied outcomes, not errors).

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("could not find a texture cache; pass a cache directory explicitly")]
    NoCacheFound,
    #[display("failed to open texture cache")]
    Cache,
    #[display("extraction failed")]
    Extract,
    #[display("failed to watch cache directory")]
    Watch,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
