//! Configuration loading.
//!
//! Defaults, overlaid by an optional config file in the platform config
//! directory, overlaid by `TEXTURE_COURIER_*` environment variables.
//! Explicit command-line flags always win; merging with those happens at the
//! call site in `main`.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;

pub const ENV_PREFIX: &str = "TEXTURE_COURIER_";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Where extracted textures go unless `-o` says otherwise.
    pub output_dir: PathBuf,
    /// Worker pool override; `None` means available hardware parallelism.
    pub workers: Option<NonZeroUsize>,
    /// Extra roots to probe during cache discovery, on top of the platform
    /// defaults.
    pub search_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./texturecache"),
            workers: None,
            search_roots: Vec::new(),
        }
    }
}

/// Platform path of the optional config file, e.g.
/// `~/.config/texture-courier/config.toml` on Linux.
pub fn config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "texture-courier")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn load() -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = config_file() {
        debug!(path = %path.display(), "merging config file if present");
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX)).extract().or_raise(|| ErrorKind::Config)
}
