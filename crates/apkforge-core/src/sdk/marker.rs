//! Completion markers.
//!
//! A marker is written only after the step it guards has fully succeeded, so
//! an interrupted download or component install leaves no marker and is
//! redone on the next run.

use std::io;
use std::path::Path;

/// Written inside `cmdline-tools/latest` and inside each component directory.
pub const COMPLETE: &str = ".apkforge-complete";

/// Written in the SDK root once `sdkmanager --licenses` succeeded.
pub const LICENSES: &str = ".apkforge-licenses";

pub fn is_complete(dir: &Path) -> bool {
    dir.join(COMPLETE).is_file()
}

pub fn mark_complete(dir: &Path) -> io::Result<()> {
    write_marker(&dir.join(COMPLETE))
}

pub fn licenses_accepted(root: &Path) -> bool {
    root.join(LICENSES).is_file()
}

pub fn mark_licenses_accepted(root: &Path) -> io::Result<()> {
    write_marker(&root.join(LICENSES))
}

fn write_marker(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, concat!("apkforge ", env!("CARGO_PKG_VERSION"), "\n"))
}
