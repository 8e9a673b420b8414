//! texture-courier: rips textures out of a Second Life viewer's texture
//! cache, as a one-shot batch or continuously as the viewer writes them.

mod cli;
mod codec;
mod config;
mod error;
mod find;
mod output;

use crate::cli::{Args, OutputMode};
use crate::codec::ContainerCodec;
use crate::error::{ErrorKind, Result};
use crate::output::Reporter;
use clap::Parser;
use courier_cache::Snapshot;
use courier_extract::{ExtractOptions, OutcomeHook, ShutdownStage, ShutdownToken, Tally};
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for signal-initiated termination, mirroring the shell
/// convention of 128 + SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = config::load()?;
    let cache_dir = match args.cache_dir {
        Some(dir) => dir,
        None => discover(&config.search_roots)?,
    };
    let snapshot = Snapshot::open(&cache_dir).or_raise(|| ErrorKind::Cache)?;

    let mut options = ExtractOptions::new(args.output_dir.unwrap_or(config.output_dir));
    options.overwrite = args.force;
    options.raw = args.raw;
    options.verify_integrity = !args.skip_integrity;
    options.workers = args.workers.or(config.workers);
    let options = Arc::new(options);

    let reporter = Arc::new(Reporter::new(args.output_mode, snapshot.entry_count() as u64));
    reporter.header(snapshot.header());

    let shutdown = ShutdownToken::new();
    spawn_interrupt_handler(shutdown.clone());

    let codec = Arc::new(ContainerCodec);
    let tally = Arc::new(Tally::new());
    let hook: OutcomeHook = {
        let reporter = Arc::clone(&reporter);
        Arc::new(move |id, outcome| reporter.outcome(id, outcome))
    };

    courier_extract::run_batch(
        &snapshot,
        Arc::clone(&codec),
        Arc::clone(&options),
        Arc::clone(&tally),
        shutdown.clone(),
        Arc::clone(&hook),
    )
    .await
    .or_raise(|| ErrorKind::Extract)?;

    if args.watch && !shutdown.is_requested() {
        watch_until_interrupted(snapshot, codec, options, Arc::clone(&tally), shutdown.clone(), hook).await?;
    }

    let counts = tally.counts();
    reporter.summary(&counts);
    if shutdown.is_requested() {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    if args.output_mode == OutputMode::Files && counts.written == 0 {
        eprintln!("error: no textures were written");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn discover(extra_roots: &[PathBuf]) -> Result<PathBuf> {
    let mut candidates = find::candidate_caches(extra_roots);
    if candidates.is_empty() {
        exn::bail!(ErrorKind::NoCacheFound);
    }
    if candidates.len() > 1 {
        info!(count = candidates.len(), "multiple texture caches found, using the first");
    }
    let cache_dir = candidates.remove(0);
    info!(cache_dir = %cache_dir.display(), "using texture cache");
    Ok(cache_dir)
}

/// First Ctrl-C: stop submitting, finish in-flight, summarise, exit 130.
/// Second Ctrl-C: terminate immediately.
fn spawn_interrupt_handler(shutdown: ShutdownToken) {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            match shutdown.request() {
                ShutdownStage::Graceful => {
                    eprintln!("\ninterrupted, finishing in-flight textures (Ctrl-C again to abort)");
                },
                _ => {
                    eprintln!("\naborted");
                    std::process::exit(i32::from(EXIT_INTERRUPTED));
                },
            }
        }
    });
}

/// Hand the snapshot to the watch adapter and extract each non-empty diff
/// synchronously from its callback until an interrupt arrives.
async fn watch_until_interrupted(
    snapshot: Snapshot,
    codec: Arc<ContainerCodec>,
    options: Arc<ExtractOptions>,
    tally: Arc<Tally>,
    shutdown: ShutdownToken,
    hook: OutcomeHook,
) -> Result<()> {
    let callback_shutdown = shutdown.clone();
    let handle = courier_watch::watch(snapshot, move |items| {
        let changed = items.len();
        if let Err(err) = courier_extract::run_changed(
            &items,
            codec.as_ref(),
            &options,
            &tally,
            &callback_shutdown,
            |id, outcome| hook(id, outcome),
        ) {
            warn!(error = %err, "failed to extract changed textures");
        } else {
            info!(changed, "extracted changed textures");
        }
    })
    .or_raise(|| ErrorKind::Watch)?;

    info!("watching for changes, Ctrl-C to stop");
    while !shutdown.is_requested() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    handle.cancel();
    Ok(())
}
