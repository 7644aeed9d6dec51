use semver::Version;
use serde::{Deserialize, Serialize};

use crate::platform::{OsFamily, PackageManager};

/// Default free space required before a build (10 GiB).
pub const DISK_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Snapshot of the build host, produced once per run by the prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub os_family: OsFamily,
    pub package_manager: PackageManager,
    pub interpreter_version: Version,
    pub available_disk_bytes: u64,
    pub meets_disk_threshold: bool,
    /// Whether the device bridge was on `PATH` at probe time.
    pub bridge_available: bool,
}

impl EnvironmentReport {
    /// Available disk space in GiB, for display.
    pub fn available_disk_gib(&self) -> f64 {
        self.available_disk_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}
