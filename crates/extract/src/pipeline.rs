//! The extraction pipeline: classify, reconstruct, re-encode, write.
//!
//! Every item moves from pending to exactly one terminal [`Outcome`].
//! Expected skips (empty slot, incomplete download, existing output) are
//! decided before any byte is read; only items that survive classification
//! touch the slot store, the codec, and the output directory.
//!
//! Output is atomic with respect to the destination: bytes land in a
//! temporary file in the output directory, timestamps are set to the entry's
//! capture time, and a rename makes the file visible. Classification and
//! file creation are the same step; no partial file is ever observable.

use crate::codec::TextureCodec;
use crate::error::{ErrorKind, Result};
use crate::outcome::{Failure, Outcome, Tally};
use crate::shutdown::ShutdownToken;
use courier_cache::{Item, Snapshot};
use exn::ResultExt;
use std::fs::{File, FileTimes};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Extension for output written in raw codestream mode.
pub const RAW_EXTENSION: &str = "j2c";

/// Invoked once per item with its terminal classification. Runs on worker
/// threads in batch mode; keep it quick.
pub type OutcomeHook = Arc<dyn Fn(Uuid, &Outcome) + Send + Sync>;

/// Knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub output_dir: PathBuf,
    /// Replace existing output files instead of skipping them.
    pub overwrite: bool,
    /// Write the raw codestream verbatim instead of re-encoding through the
    /// codec.
    pub raw: bool,
    /// Skip items whose on-disk bytes don't add up to the declared size.
    /// Disabling this attempts extraction anyway and lets the codec decide.
    pub verify_integrity: bool,
    /// Worker pool size for batch mode; defaults to available hardware
    /// parallelism.
    pub workers: Option<NonZeroUsize>,
}

impl ExtractOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            overwrite: false,
            raw: false,
            verify_integrity: true,
            workers: None,
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// Run one item through the state machine to its terminal outcome.
///
/// Infallible by design: every fault folds into [`Outcome::Failed`] so the
/// caller can keep a full per-classification tally across the run.
#[instrument(level = "debug", skip_all, fields(id = %item.id(), slot = item.slot_index()))]
pub fn extract_item<C: TextureCodec>(item: &Item, options: &ExtractOptions, codec: &C) -> Outcome {
    if item.is_empty() {
        return Outcome::Empty;
    }
    if options.verify_integrity && !item.is_complete_on_disk() {
        return Outcome::Incomplete;
    }
    let extension = if options.raw { RAW_EXTENSION } else { codec.extension() };
    let dest = options.output_dir.join(format!("{}.{extension}", item.id()));
    if dest.exists() && !options.overwrite {
        return Outcome::AlreadyExists;
    }

    let bytes = match item.read_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(error = %err, "cannot reconstruct codestream");
            return Outcome::Failed(Failure::Read);
        },
    };

    let written = if options.raw {
        write_atomic(&dest, item.captured_at(), |temp| {
            std::fs::write(temp, &bytes).or_raise(|| ErrorKind::Write(dest.clone()))
        })
    } else {
        match codec.decode(&bytes) {
            Ok(image) => write_atomic(&dest, item.captured_at(), |temp| codec.encode(&image, temp)),
            Err(err) => {
                debug!(error = %err, "codec rejected codestream");
                return Outcome::Failed(Failure::Codec);
            },
        }
    };

    match written {
        Ok(()) => Outcome::Written(dest),
        Err(err) if matches!(&*err, ErrorKind::Codec(_)) => Outcome::Failed(Failure::Codec),
        Err(err) => {
            warn!(error = %err, "failed to write output");
            Outcome::Failed(Failure::Write)
        },
    }
}

/// Write through a temporary file so the destination appears fully formed or
/// not at all. The temporary keeps the destination's extension because
/// encoders pick their container format from it.
fn write_atomic(dest: &Path, captured_at: u32, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let parent = dest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let suffix = dest.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
    let temp = tempfile::Builder::new()
        .prefix("courier-")
        .suffix(&suffix)
        .tempfile_in(parent)
        .or_raise(|| ErrorKind::Write(dest.to_path_buf()))?;
    write(temp.path())?;

    // Provenance: the output carries the capture time, not extraction
    // wall-clock time.
    let captured = SystemTime::UNIX_EPOCH + Duration::from_secs(u64::from(captured_at));
    let times = FileTimes::new().set_accessed(captured).set_modified(captured);
    File::options()
        .write(true)
        .open(temp.path())
        .and_then(|file| file.set_times(times))
        .or_raise(|| ErrorKind::Write(dest.to_path_buf()))?;

    temp.persist(dest).or_raise(|| ErrorKind::Write(dest.to_path_buf()))?;
    Ok(())
}

/// Drain the snapshot through a bounded worker pool.
///
/// Items are submitted in slot order; completion order across workers is
/// unspecified. The pool size is the available hardware parallelism unless
/// overridden. A graceful shutdown request stops submissions and lets
/// in-flight items finish; the tally then reflects exactly the work done.
///
/// # Errors
///
/// Only pipeline-level faults (output directory creation) surface here.
/// Per-item faults are classified into the tally.
#[instrument(skip_all, fields(output_dir = %options.output_dir.display()))]
pub async fn run_batch<C>(
    snapshot: &Snapshot,
    codec: Arc<C>,
    options: Arc<ExtractOptions>,
    tally: Arc<Tally>,
    shutdown: ShutdownToken,
    on_outcome: OutcomeHook,
) -> Result<()>
where
    C: TextureCodec + 'static,
{
    std::fs::create_dir_all(&options.output_dir).or_raise(|| ErrorKind::OutputDir(options.output_dir.clone()))?;
    let semaphore = Arc::new(Semaphore::new(options.worker_count()));
    let mut workers = JoinSet::new();

    for item in snapshot.iter() {
        if shutdown.is_requested() {
            debug!("shutdown requested, no further submissions");
            break;
        }
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let codec = Arc::clone(&codec);
        let options = Arc::clone(&options);
        let tally = Arc::clone(&tally);
        let on_outcome = Arc::clone(&on_outcome);
        workers.spawn_blocking(move || {
            let outcome = extract_item(&item, &options, codec.as_ref());
            tally.record(&outcome);
            on_outcome(item.id(), &outcome);
            drop(permit);
        });
    }

    // In-flight items always run to completion, shutdown or not.
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "extraction worker panicked");
        }
    }
    Ok(())
}

/// Process one changed-item batch synchronously, for watch mode.
///
/// Watch batches are typically small, so no worker pool is introduced here;
/// the only concurrency is the watcher's own callback thread this runs on.
pub fn run_changed<C: TextureCodec>(
    items: &[Item],
    codec: &C,
    options: &ExtractOptions,
    tally: &Tally,
    shutdown: &ShutdownToken,
    mut on_outcome: impl FnMut(Uuid, &Outcome),
) -> Result<()> {
    std::fs::create_dir_all(&options.output_dir).or_raise(|| ErrorKind::OutputDir(options.output_dir.clone()))?;
    for item in items {
        if shutdown.is_requested() {
            break;
        }
        let outcome = extract_item(item, options, codec);
        tally.record(&outcome);
        on_outcome(item.id(), &outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::mock::MockCodec;
    use courier_cache::fixture::CacheFixture;
    use rstest::rstest;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn noop_hook() -> OutcomeHook {
        Arc::new(|_, _| {})
    }

    /// The canonical three-entry cache: one empty slot, one texture fully
    /// contained in its slot, one split across slot and overflow file.
    fn three_entry_cache(dir: &Path) {
        let split: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        CacheFixture::new()
            .empty(id(1))
            .slot_only(id(2), &[0xaau8; 500], 1_600_000_000)
            .split(id(3), &split, 1_600_000_100)
            .write_to(dir)
            .unwrap();
    }

    async fn run_defaults(cache_dir: &Path, out_dir: &Path, overwrite: bool) -> crate::outcome::Counts {
        let snapshot = Snapshot::open(cache_dir).unwrap();
        let mut options = ExtractOptions::new(out_dir);
        options.overwrite = overwrite;
        let tally = Arc::new(Tally::new());
        run_batch(
            &snapshot,
            Arc::new(MockCodec::new()),
            Arc::new(options),
            Arc::clone(&tally),
            ShutdownToken::new(),
            noop_hook(),
        )
        .await
        .unwrap();
        tally.counts()
    }

    #[tokio::test]
    async fn test_batch_end_to_end() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        three_entry_cache(cache.path());
        let counts = run_defaults(cache.path(), out.path(), false).await;
        assert_eq!(counts.empty, 1);
        assert_eq!(counts.written, 2);
        assert_eq!(counts.failed, 0);
        assert_eq!(counts.incomplete, 0);
        assert!(out.path().join(format!("{}.png", id(2))).is_file());
        assert!(out.path().join(format!("{}.png", id(3))).is_file());
    }

    #[tokio::test]
    async fn test_rerun_without_overwrite_skips_existing() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        three_entry_cache(cache.path());
        run_defaults(cache.path(), out.path(), false).await;
        let counts = run_defaults(cache.path(), out.path(), false).await;
        assert_eq!(counts.existing, 2);
        assert_eq!(counts.written, 0);
        let counts = run_defaults(cache.path(), out.path(), true).await;
        assert_eq!(counts.existing, 0);
        assert_eq!(counts.written, 2);
    }

    #[tokio::test]
    async fn test_output_timestamps_carry_capture_time() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        three_entry_cache(cache.path());
        run_defaults(cache.path(), out.path(), false).await;
        let modified = std::fs::metadata(out.path().join(format!("{}.png", id(2))))
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap();
        assert_eq!(modified.as_secs(), 1_600_000_000);
    }

    #[rstest]
    #[case(&[0u8; 600][..])]
    #[case(&[0xffu8; 600][..])]
    fn test_empty_regardless_of_slot_content(#[case] slot: &[u8]) {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        CacheFixture::new().entry(id(1), -1, 0, 0, slot, None).write_to(cache.path()).unwrap();
        let item = Snapshot::open(cache.path()).unwrap().get(&id(1)).unwrap();
        let outcome = extract_item(&item, &ExtractOptions::new(out.path()), &MockCodec::new());
        assert_eq!(outcome, Outcome::Empty);
        // No I/O performed: the output directory stays untouched.
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_incomplete_unless_integrity_disabled() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        // Declares 4400 overflow bytes; only 100 present on disk.
        CacheFixture::new()
            .entry(id(1), 5000, 4400, 7, &[1u8; 600], Some(&[2u8; 100]))
            .write_to(cache.path())
            .unwrap();
        let item = Snapshot::open(cache.path()).unwrap().get(&id(1)).unwrap();

        let mut options = ExtractOptions::new(out.path());
        assert_eq!(extract_item(&item, &options, &MockCodec::new()), Outcome::Incomplete);

        // Overridden: the attempt goes ahead and the codec decides.
        options.verify_integrity = false;
        std::fs::create_dir_all(&options.output_dir).unwrap();
        assert!(matches!(extract_item(&item, &options, &MockCodec::new()), Outcome::Written(_)));
        options.overwrite = true;
        assert_eq!(
            extract_item(&item, &options, &MockCodec::rejecting()),
            Outcome::Failed(Failure::Codec)
        );
    }

    #[test]
    fn test_missing_overflow_is_read_failure() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        CacheFixture::new().entry(id(1), 5000, 4400, 7, &[1u8; 600], None).write_to(cache.path()).unwrap();
        let item = Snapshot::open(cache.path()).unwrap().get(&id(1)).unwrap();
        let mut options = ExtractOptions::new(out.path());
        options.verify_integrity = false;
        std::fs::create_dir_all(&options.output_dir).unwrap();
        assert_eq!(extract_item(&item, &options, &MockCodec::new()), Outcome::Failed(Failure::Read));
    }

    #[test]
    fn test_raw_mode_writes_codestream_verbatim() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        CacheFixture::new().split(id(1), &data, 7).write_to(cache.path()).unwrap();
        let item = Snapshot::open(cache.path()).unwrap().get(&id(1)).unwrap();
        let mut options = ExtractOptions::new(out.path());
        options.raw = true;
        std::fs::create_dir_all(&options.output_dir).unwrap();
        // The rejecting codec proves raw mode never consults it.
        let outcome = extract_item(&item, &options, &MockCodec::rejecting());
        let dest = out.path().join(format!("{}.{RAW_EXTENSION}", id(1)));
        assert_eq!(outcome, Outcome::Written(dest.clone()));
        assert_eq!(std::fs::read(dest).unwrap(), data);
    }

    #[tokio::test]
    async fn test_graceful_shutdown_before_start_submits_nothing() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        three_entry_cache(cache.path());
        let snapshot = Snapshot::open(cache.path()).unwrap();
        let tally = Arc::new(Tally::new());
        let shutdown = ShutdownToken::new();
        shutdown.request();
        run_batch(
            &snapshot,
            Arc::new(MockCodec::new()),
            Arc::new(ExtractOptions::new(out.path())),
            Arc::clone(&tally),
            shutdown,
            noop_hook(),
        )
        .await
        .unwrap();
        assert_eq!(tally.counts().total(), 0);
    }

    #[test]
    fn test_run_changed_processes_batch_in_order() {
        let cache = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        three_entry_cache(cache.path());
        let snapshot = Snapshot::open(cache.path()).unwrap();
        let items: Vec<Item> = snapshot.iter().collect();
        let tally = Tally::new();
        let mut seen = Vec::new();
        run_changed(
            &items,
            &MockCodec::new(),
            &ExtractOptions::new(out.path()),
            &tally,
            &ShutdownToken::new(),
            |id, _| seen.push(id),
        )
        .unwrap();
        assert_eq!(seen, vec![id(1), id(2), id(3)]);
        let counts = tally.counts();
        assert_eq!(counts.written, 2);
        assert_eq!(counts.empty, 1);
    }
}
