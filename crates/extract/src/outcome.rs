//! Terminal per-item classifications and the shared run tally.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why an item ended up [`Outcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Slot or overflow read fault, including a missing overflow file.
    Read,
    /// The external codec could not decode or re-encode the codestream.
    Codec,
    /// The output file could not be created or finalised.
    Write,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Read => write!(f, "unreadable cache data"),
            Failure::Codec => write!(f, "corrupt codestream"),
            Failure::Write => write!(f, "write error"),
        }
    }
}

/// Terminal state of one item run through the pipeline.
///
/// Every item produces exactly one of these; the first three are expected
/// skips, not errors, and are tallied separately from failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `image_size <= 0`; nothing recoverable, no I/O performed.
    Empty,
    /// The bytes on disk do not add up to the declared size and integrity
    /// checking was not overridden. No output written.
    Incomplete,
    /// Destination already present and overwrite not requested. The existing
    /// file is untouched.
    AlreadyExists,
    /// Output written (re-encoded or raw), timestamps set to the entry's
    /// capture time.
    Written(PathBuf),
    /// Read, codec, or write fault. Never silently dropped; always tallied.
    Failed(Failure),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Empty => write!(f, "empty"),
            Outcome::Incomplete => write!(f, "incomplete"),
            Outcome::AlreadyExists => write!(f, "already exists"),
            Outcome::Written(path) => write!(f, "written to {}", path.display()),
            Outcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Append-only outcome counters, shared across workers.
///
/// This is the only mutable state extraction workers share; plain relaxed
/// atomics suffice because counts are read after the run (or from a display
/// loop that tolerates slight staleness).
#[derive(Debug, Default)]
pub struct Tally {
    empty: AtomicU64,
    incomplete: AtomicU64,
    existing: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Empty => &self.empty,
            Outcome::Incomplete => &self.incomplete,
            Outcome::AlreadyExists => &self.existing,
            Outcome::Written(_) => &self.written,
            Outcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn counts(&self) -> Counts {
        Counts {
            empty: self.empty.load(Ordering::Relaxed),
            incomplete: self.incomplete.load(Ordering::Relaxed),
            existing: self.existing.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of a [`Tally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub empty: u64,
    pub incomplete: u64,
    pub existing: u64,
    pub written: u64,
    pub failed: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.empty + self.incomplete + self.existing + self.written + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_records_each_classification_once() {
        let tally = Tally::new();
        tally.record(&Outcome::Empty);
        tally.record(&Outcome::Written(PathBuf::from("a.png")));
        tally.record(&Outcome::Written(PathBuf::from("b.png")));
        tally.record(&Outcome::Failed(Failure::Codec));
        tally.record(&Outcome::Incomplete);
        tally.record(&Outcome::AlreadyExists);
        let counts = tally.counts();
        assert_eq!(counts.empty, 1);
        assert_eq!(counts.written, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.incomplete, 1);
        assert_eq!(counts.existing, 1);
        assert_eq!(counts.total(), 6);
    }
}
