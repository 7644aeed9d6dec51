//! Host platform identification.
//!
//! apkforge recognises exactly two operating-system families. Each family maps
//! onto the set of system package managers the dependency installer knows how
//! to drive.

use serde::{Deserialize, Serialize};

/// Operating-system family of the build host.
///
/// # Example
///
/// ```
/// use apkforge_schema::OsFamily;
///
/// assert_eq!(OsFamily::from_identifier("linux"), OsFamily::Linux);
/// assert_eq!(OsFamily::from_identifier("windows"), OsFamily::Unsupported);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Any Linux distribution
    Linux,
    /// macOS (Intel or Apple Silicon)
    Macos,
    /// Everything else; the pipeline refuses to run
    Unsupported,
}

impl OsFamily {
    /// Classify a platform identifier as reported by `std::env::consts::OS`.
    pub fn from_identifier(os: &str) -> Self {
        match os.to_ascii_lowercase().as_str() {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::Macos,
            _ => Self::Unsupported,
        }
    }

    /// The family of the machine this binary was compiled for.
    pub fn current() -> Self {
        Self::from_identifier(std::env::consts::OS)
    }

    /// Package managers to look for on this family, in preference order.
    pub fn package_manager_candidates(self) -> &'static [PackageManager] {
        match self {
            Self::Linux => &[PackageManager::Apt, PackageManager::Yum],
            Self::Macos => &[PackageManager::Brew],
            Self::Unsupported => &[],
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System package manager used for native dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// Debian / Ubuntu `apt-get`
    Apt,
    /// Fedora / RHEL / CentOS `yum`
    Yum,
    /// Homebrew
    Brew,
    /// No recognised package manager on `PATH`
    None,
}

impl PackageManager {
    /// Executable that has to be on `PATH` for this manager to be selected.
    pub fn executable(self) -> Option<&'static str> {
        match self {
            Self::Apt => Some("apt-get"),
            Self::Yum => Some("yum"),
            Self::Brew => Some("brew"),
            Self::None => None,
        }
    }

    /// Whether installs go through `sudo` (system-wide managers only).
    pub fn needs_root(self) -> bool {
        matches!(self, Self::Apt | Self::Yum)
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Yum => "yum",
            Self::Brew => "brew",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
