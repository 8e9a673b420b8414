//! Two-stage cancellation token.
//!
//! The interrupt contract has two levels: the first request stops submitting
//! new items and lets in-flight work finish; a second request while shutdown
//! is already in progress demands immediate termination. Modelled as explicit
//! token state rather than signal-handler re-entrancy, so any signal source
//! (Ctrl-C, a test, a supervising process) drives the same machinery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// How far shutdown has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownStage {
    /// No request received; keep submitting work.
    Running,
    /// Stop submitting, finish in-flight items, summarise, exit.
    Graceful,
    /// Stop everything now.
    Immediate,
}

/// Cheaply cloneable two-level cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    level: Arc<AtomicU8>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one cancellation request and return the stage it moved the
    /// token into. Requests beyond the second are absorbed at
    /// [`ShutdownStage::Immediate`].
    pub fn request(&self) -> ShutdownStage {
        let previous = self
            .level
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |level| Some(level.saturating_add(1).min(2)))
            .expect("fetch_update closure always returns Some");
        match previous {
            0 => ShutdownStage::Graceful,
            _ => ShutdownStage::Immediate,
        }
    }

    pub fn stage(&self) -> ShutdownStage {
        match self.level.load(Ordering::Acquire) {
            0 => ShutdownStage::Running,
            1 => ShutdownStage::Graceful,
            _ => ShutdownStage::Immediate,
        }
    }

    /// Whether any level of shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.stage() > ShutdownStage::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_stage_progression() {
        let token = ShutdownToken::new();
        assert_eq!(token.stage(), ShutdownStage::Running);
        assert!(!token.is_requested());
        assert_eq!(token.request(), ShutdownStage::Graceful);
        assert!(token.is_requested());
        assert_eq!(token.request(), ShutdownStage::Immediate);
        // Further requests stay pinned at Immediate.
        assert_eq!(token.request(), ShutdownStage::Immediate);
        assert_eq!(token.stage(), ShutdownStage::Immediate);
    }

    #[test]
    fn test_clones_share_state() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        token.request();
        assert_eq!(clone.stage(), ShutdownStage::Graceful);
    }
}
