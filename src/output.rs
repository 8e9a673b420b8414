//! Run-time reporting: per-item output and the final summary.
//!
//! Three modes: `progress` keeps a counter ticking on stderr, `files` prints
//! exactly one absolute path per written texture on stdout (and nothing
//! else), `debug` is progress plus the decoded header up front.

use crate::cli::OutputMode;
use courier_cache::Header;
use courier_extract::{Counts, Outcome};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub struct Reporter {
    mode: OutputMode,
    total: u64,
    done: AtomicU64,
}

impl Reporter {
    pub fn new(mode: OutputMode, total: u64) -> Self {
        Self { mode, total, done: AtomicU64::new(0) }
    }

    /// Print the decoded header, debug mode only.
    pub fn header(&self, header: &Header) {
        if self.mode != OutputMode::Debug {
            return;
        }
        eprintln!("HEADER:");
        eprintln!("version: {}", header.version_string());
        eprintln!("address_size: {}", header.address_size);
        eprintln!("encoder: {}", header.encoder);
        eprintln!("entry_count: {}", header.entry_count);
    }

    /// Record one terminal outcome. Safe to call from any worker thread.
    pub fn outcome(&self, _id: Uuid, outcome: &Outcome) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        match self.mode {
            OutputMode::Files => {
                // Failures and skips suppress only their own path line.
                if let Outcome::Written(path) = outcome {
                    let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
                    println!("{}", absolute.display());
                }
            },
            OutputMode::Progress | OutputMode::Debug => {
                if done % 32 == 0 || done == self.total {
                    eprint!("\r{done}/{} textures", self.total);
                    let _ = std::io::stderr().flush();
                }
            },
        }
    }

    /// Final per-classification summary, suppressed in files mode.
    pub fn summary(&self, counts: &Counts) {
        if self.mode == OutputMode::Files {
            return;
        }
        if self.done.load(Ordering::Relaxed) > 0 {
            eprintln!();
        }
        eprintln!("wrote {} textures", counts.written);
        if counts.existing > 0 {
            eprintln!("skipped {} existing textures", counts.existing);
        }
        if counts.incomplete > 0 {
            eprintln!("skipped {} incomplete textures", counts.incomplete);
        }
        if counts.failed > 0 {
            eprintln!("{} failed to extract", counts.failed);
        }
        if counts.empty > 0 {
            eprintln!("skipped {} empty textures", counts.empty);
        }
    }
}
