//! Concurrent, cancellable extraction of textures from a cache snapshot.
//!
//! Two operating modes share one per-item state machine
//! ([`extract_item`]):
//!
//! - **Batch** ([`run_batch`]): a bounded worker pool drains the snapshot in
//!   slot order, each item independent and atomic with respect to its output
//!   file.
//! - **Continuous** ([`run_changed`]): one synchronous pass per changed-item
//!   batch, invoked from a watch callback.
//!
//! Every item ends in exactly one terminal [`Outcome`], tallied in a shared
//! [`Tally`]; per-item faults never abort a run. Cancellation follows a
//! two-stage contract via [`ShutdownToken`]: graceful first, immediate
//! second.

pub mod codec;
pub mod error;
mod outcome;
mod pipeline;
mod shutdown;

pub use crate::codec::TextureCodec;
pub use crate::outcome::{Counts, Failure, Outcome, Tally};
pub use crate::pipeline::{ExtractOptions, OutcomeHook, RAW_EXTENSION, extract_item, run_batch, run_changed};
pub use crate::shutdown::{ShutdownStage, ShutdownToken};
