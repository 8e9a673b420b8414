//! Command-line surface.

use clap::{Parser, ValueEnum};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Rips textures out of a Second Life viewer's on-disk texture cache.
#[derive(Debug, Parser)]
#[command(name = "texture-courier", version, about)]
pub struct Args {
    /// Path to the texture cache directory. Searches known viewer
    /// installation paths when omitted.
    pub cache_dir: Option<PathBuf>,

    /// Where to put extracted textures.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Overwrite output files that already exist.
    #[arg(short, long)]
    pub force: bool,

    /// Skip decoding and save the raw codestream (.j2c) verbatim.
    #[arg(long)]
    pub raw: bool,

    /// Attempt extraction of textures whose on-disk bytes don't add up to
    /// their declared size, instead of skipping them as incomplete.
    #[arg(long)]
    pub skip_integrity: bool,

    /// After the initial pass, keep watching the cache and extract textures
    /// as the viewer writes them. Stop with Ctrl-C.
    #[arg(short, long)]
    pub watch: bool,

    /// Worker pool size; defaults to available hardware parallelism.
    #[arg(long)]
    pub workers: Option<NonZeroUsize>,

    /// What to print while running.
    #[arg(short = 'O', long, value_enum, default_value_t = OutputMode::Progress)]
    pub output_mode: OutputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Progress counter on stderr plus a final summary.
    Progress,
    /// One absolute path per written file on stdout, nothing else.
    Files,
    /// Like progress, with the decoded cache header up front.
    Debug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["texture-courier"]);
        assert!(args.cache_dir.is_none());
        assert!(!args.force);
        assert!(!args.raw);
        assert!(!args.watch);
        assert_eq!(args.output_mode, OutputMode::Progress);
    }

    #[test]
    fn test_full_invocation() {
        let args = Args::parse_from([
            "texture-courier",
            "/tmp/cache",
            "-o",
            "/tmp/out",
            "--force",
            "--raw",
            "--skip-integrity",
            "--watch",
            "--workers",
            "3",
            "-O",
            "files",
        ]);
        assert_eq!(args.cache_dir.as_deref(), Some(std::path::Path::new("/tmp/cache")));
        assert_eq!(args.output_dir.as_deref(), Some(std::path::Path::new("/tmp/out")));
        assert!(args.force && args.raw && args.skip_integrity && args.watch);
        assert_eq!(args.workers, NonZeroUsize::new(3));
        assert_eq!(args.output_mode, OutputMode::Files);
    }
}
