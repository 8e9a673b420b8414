//! Bridges OS file notifications to repeated snapshot refreshes.
//!
//! [`watch`] subscribes to modification events for the index file only.
//! The fixed-slot store and overflow files change without notifications; they
//! are read lazily per item at extraction time, so there is nothing to watch
//! there. Each notification triggers one [`Snapshot::refresh`], and the
//! callback fires only when the diff is non-empty.
//!
//! The adapter performs no debouncing of its own. The notification layer may
//! coalesce rapid rewrites or deliver them one by one; either way is correct
//! because a refresh is idempotent per unchanged identifier — a burst of
//! notifications after one rewrite produces one non-empty diff followed by
//! empty ones, and empty diffs never reach the callback.

pub mod error;

use crate::error::{ErrorKind, Result};
use courier_cache::{INDEX_FILE_NAME, Item, Snapshot};
use exn::ResultExt;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

enum Signal {
    IndexChanged,
    Cancel,
}

/// Watch a snapshot's cache directory, invoking `on_changed` with every
/// non-empty diff until the returned handle is cancelled or dropped.
///
/// The snapshot moves into a dedicated worker thread, which becomes the
/// single logical owner required by [`Snapshot::refresh`]. Transient decode
/// failures (catching the viewer mid-rewrite) keep the previous generation
/// and wait for the next notification; persistent I/O failures are logged
/// and end the subscription.
pub fn watch(snapshot: Snapshot, on_changed: impl FnMut(Vec<Item>) + Send + 'static) -> Result<WatchHandle> {
    let (tx, rx) = std::sync::mpsc::channel();
    let event_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| match event {
        Ok(event) if is_index_rewrite(&event) => {
            // The worker may already be gone during teardown; nothing to do.
            let _ = event_tx.send(Signal::IndexChanged);
        },
        Ok(_) => {},
        Err(err) => warn!(error = %err, "filesystem notification error"),
    })
    .or_raise(|| ErrorKind::Subscribe)?;
    watcher.watch(snapshot.cache_dir(), RecursiveMode::NonRecursive).or_raise(|| ErrorKind::Subscribe)?;
    info!(cache_dir = %snapshot.cache_dir().display(), "watching index for changes");

    let join = std::thread::Builder::new()
        .name("courier-watch".into())
        .spawn(move || run_loop(snapshot, rx, on_changed))
        .map_err(ErrorKind::Spawn)?;
    Ok(WatchHandle { watcher: Some(watcher), tx, join: Some(join) })
}

/// Modification or creation touching the index file name. Everything else in
/// the cache directory (slot store, overflow shards, viewer lock files) is
/// deliberately ignored.
fn is_index_rewrite(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any)
        && event.paths.iter().any(|path| path.file_name().is_some_and(|name| name == INDEX_FILE_NAME))
}

fn run_loop(mut snapshot: Snapshot, rx: Receiver<Signal>, mut on_changed: impl FnMut(Vec<Item>)) {
    while let Ok(signal) = rx.recv() {
        match signal {
            Signal::Cancel => break,
            Signal::IndexChanged => match snapshot.refresh_tolerant() {
                Ok(changed) if changed.is_empty() => debug!("index notification with no effective change"),
                Ok(changed) => {
                    debug!(changed = changed.len(), "index rewrite detected");
                    on_changed(changed);
                },
                Err(err) => {
                    warn!(error = %err, "failed to refresh snapshot, stopping watch");
                    break;
                },
            },
        }
    }
}

/// Cancellable subscription returned by [`watch`].
///
/// Dropping the handle cancels implicitly. Explicit [`cancel`](Self::cancel)
/// additionally joins the worker, guaranteeing that any outstanding callback
/// invocation has completed before it returns.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<Signal>,
    join: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop the subscription. In-flight callback invocations are allowed to
    /// complete; this blocks until the worker has exited.
    pub fn cancel(mut self) {
        self.teardown();
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            warn!("watch worker panicked during shutdown");
        }
    }

    fn teardown(&mut self) {
        // Dropping the OS watcher stops new notifications, then the sentinel
        // unblocks the worker's receive loop.
        self.watcher.take();
        let _ = self.tx.send(Signal::Cancel);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_cache::fixture::CacheFixture;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn collected() -> (Arc<Mutex<Vec<Vec<Uuid>>>>, impl FnMut(Vec<Item>) + Send + 'static) {
        let batches: Arc<Mutex<Vec<Vec<Uuid>>>> = Arc::default();
        let sink = Arc::clone(&batches);
        let callback = move |items: Vec<Item>| {
            sink.lock().unwrap().push(items.iter().map(Item::id).collect());
        };
        (batches, callback)
    }

    #[test]
    fn test_run_loop_emits_only_non_empty_diffs() {
        let dir = tempfile::tempdir().unwrap();
        CacheFixture::new().slot_only(id(1), &[1u8; 50], 10).write_to(dir.path()).unwrap();
        let snapshot = Snapshot::open(dir.path()).unwrap();
        let (batches, callback) = collected();
        let (tx, rx) = mpsc::channel();

        // A bursty notification layer: three signals, one actual change.
        CacheFixture::new()
            .slot_only(id(1), &[1u8; 50], 10)
            .slot_only(id(2), &[2u8; 50], 20)
            .write_to(dir.path())
            .unwrap();
        for _ in 0..3 {
            tx.send(Signal::IndexChanged).unwrap();
        }
        tx.send(Signal::Cancel).unwrap();
        run_loop(snapshot, rx, callback);

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![id(2)]);
    }

    #[test]
    fn test_run_loop_stops_on_cancel_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        CacheFixture::new().slot_only(id(1), &[1u8; 50], 10).write_to(dir.path()).unwrap();
        let snapshot = Snapshot::open(dir.path()).unwrap();
        let (batches, callback) = collected();
        let (tx, rx) = mpsc::channel();
        tx.send(Signal::Cancel).unwrap();
        tx.send(Signal::IndexChanged).unwrap();
        run_loop(snapshot, rx, callback);
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_is_index_rewrite_filters_by_file_name() {
        let modify = Event::new(EventKind::Modify(notify::event::ModifyKind::Any));
        assert!(!is_index_rewrite(&modify));
        let index = modify.clone().add_path("/cache/texture.entries".into());
        assert!(is_index_rewrite(&index));
        let store = modify.add_path("/cache/texture.cache".into());
        assert!(!is_index_rewrite(&store));
        let removal =
            Event::new(EventKind::Remove(notify::event::RemoveKind::Any)).add_path("/cache/texture.entries".into());
        assert!(!is_index_rewrite(&removal));
    }

    #[test]
    fn test_watch_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        CacheFixture::new().slot_only(id(1), &[1u8; 50], 10).write_to(dir.path()).unwrap();
        let snapshot = Snapshot::open(dir.path()).unwrap();
        let (batch_tx, batch_rx) = mpsc::channel();
        let handle = watch(snapshot, move |items| {
            let _ = batch_tx.send(items.iter().map(Item::id).collect::<Vec<_>>());
        })
        .unwrap();

        CacheFixture::new()
            .slot_only(id(1), &[1u8; 50], 10)
            .slot_only(id(2), &[2u8; 50], 20)
            .write_to(dir.path())
            .unwrap();

        let batch = batch_rx.recv_timeout(Duration::from_secs(10)).expect("notification never arrived");
        assert_eq!(batch, vec![id(2)]);
        handle.cancel();
    }
}
