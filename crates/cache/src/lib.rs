//! Reader for the split head/body texture cache written by Second Life
//! viewers.
//!
//! The cache is three things on disk:
//! - **`texture.entries`** — a 44-byte header plus fixed 28-byte records, one
//!   per cached texture ([`codec`]).
//! - **`texture.cache`** — fixed 600-byte slots holding the first chunk of
//!   each codestream, positionally aligned with the index ([`store`]).
//! - **Overflow files** — `<firstHexChar>/<uuid>.texture`, holding whatever
//!   exceeds the slot ([`store`]).
//!
//! [`Snapshot`] ties them together: it decodes one generation of the index,
//! hands out reconstructable [`Item`]s, and diffs repeated
//! [`refresh`](Snapshot::refresh) calls so watchers only see what changed.
//!
//! Everything here is strictly read-only with respect to the source cache.

pub mod codec;
pub mod error;
pub mod fixture;
mod item;
mod snapshot;
pub mod store;

pub use crate::codec::{Entry, Header};
pub use crate::item::{Item, SLOT_ONLY_MAX_IMAGE_SIZE};
pub use crate::snapshot::{INDEX_FILE_NAME, STORE_FILE_NAME, Snapshot};
