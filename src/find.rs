//! Heuristic discovery of viewer texture caches.
//!
//! Probes platform cache roots crossed with known viewer directory names,
//! then descends a couple of levels looking for a `texturecache` directory
//! that actually holds an index file. Purely advisory: callers get zero or
//! more candidates and decide what to do with them.

use courier_cache::INDEX_FILE_NAME;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Viewer cache locations relative to a root. Linux viewers hide under
/// dotted home directories; macOS and Windows use the same names inside the
/// platform cache directory.
const VIEWER_DIRS: [&str; 5] =
    [".firestorm_x64/cache", ".alchemynext/cache", "SecondLife", "Firestorm_x64", "AlchemyNext"];

const TEXTURE_CACHE_DIR_NAME: &str = "texturecache";
const MAX_DESCENT: usize = 3;

/// All texture cache directories found under the platform roots plus
/// `extra_roots`, in probe order.
pub fn candidate_caches(extra_roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(base) = directories::BaseDirs::new() {
        roots.push(base.home_dir().to_path_buf());
        roots.push(base.cache_dir().to_path_buf());
    }
    roots.extend(extra_roots.iter().cloned());

    let mut found = Vec::new();
    for root in &roots {
        for viewer in VIEWER_DIRS {
            let candidate = root.join(viewer);
            if !candidate.is_dir() {
                continue;
            }
            debug!(path = %candidate.display(), "probing viewer directory");
            if let Some(cache) = find_texture_cache(&candidate, MAX_DESCENT)
                && !found.contains(&cache)
            {
                found.push(cache);
            }
        }
    }
    found
}

/// Locate a `texturecache` directory holding an index file, descending at
/// most `depth` levels below `path`.
fn find_texture_cache(path: &Path, depth: usize) -> Option<PathBuf> {
    if path.file_name().is_some_and(|name| name == TEXTURE_CACHE_DIR_NAME)
        && path.join(INDEX_FILE_NAME).is_file()
    {
        return Some(path.to_path_buf());
    }
    if depth == 0 {
        return None;
    }
    let children = std::fs::read_dir(path).ok()?;
    for child in children.flatten() {
        let child_path = child.path();
        if child_path.is_dir()
            && let Some(cache) = find_texture_cache(&child_path, depth - 1)
        {
            return Some(cache);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_nested_texturecache() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("SecondLife/cache/texturecache");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join(INDEX_FILE_NAME), []).unwrap();
        assert_eq!(find_texture_cache(&root.path().join("SecondLife"), 3), Some(cache));
    }

    #[test]
    fn test_requires_index_file() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("texturecache");
        std::fs::create_dir_all(&cache).unwrap();
        assert_eq!(find_texture_cache(root.path(), 3), None);
    }

    #[test]
    fn test_depth_limit() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("a/b/c/d/texturecache");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join(INDEX_FILE_NAME), []).unwrap();
        assert_eq!(find_texture_cache(root.path(), 3), None);
        assert_eq!(find_texture_cache(root.path(), 5), Some(cache));
    }
}
