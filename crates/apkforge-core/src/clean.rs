//! Build cache cleanup.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::StageError;
use crate::Reporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    pub cache_dir: PathBuf,
    pub removed: bool,
    pub reclaimed_bytes: u64,
}

/// Remove the packaging tool's cache directory. A missing cache is not an error.
pub fn clean<R: Reporter + ?Sized>(
    project_dir: &Path,
    settings: &Settings,
    reporter: &R,
) -> Result<CleanOutcome, StageError> {
    let cache_dir = settings.cache_path(project_dir);

    if !cache_dir.exists() {
        reporter.info(&format!("No build cache at {}", cache_dir.display()));
        return Ok(CleanOutcome {
            cache_dir,
            removed: false,
            reclaimed_bytes: 0,
        });
    }

    let reclaimed_bytes = dir_size(&cache_dir);
    reporter.info(&format!("Removing {}", cache_dir.display()));
    std::fs::remove_dir_all(&cache_dir)?;
    tracing::info!(dir = %cache_dir.display(), reclaimed_bytes, "removed build cache");

    Ok(CleanOutcome {
        cache_dir,
        removed: true,
        reclaimed_bytes,
    })
}

/// Total size of regular files under `dir`; symlinks are not followed.
fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
