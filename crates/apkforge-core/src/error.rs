//! Stage error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

use apkforge_schema::{DescriptorError, FailureKind};

use crate::config::ConfigError;
use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;

/// Hard failure raised by a stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    PrerequisiteMissing(String),

    #[error("no supported package manager found (looked for apt-get, yum, brew)")]
    UnsupportedPackageManager,

    #[error("{tool} failed: {detail}")]
    ExternalToolFailure { tool: String, detail: String },

    #[error("{tool} exited successfully but no artifact was found in {}", dir.display())]
    ArtifactInconsistency { tool: String, dir: PathBuf },

    #[error("SDK licenses have not been accepted; refusing to install {0}")]
    LicensesNotAccepted(String),

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("invalid build descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Where this error sits in the operator-facing taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PrerequisiteMissing(_)
            | Self::UnsupportedPackageManager
            | Self::LicensesNotAccepted(_)
            | Self::Descriptor(_)
            | Self::Config(_) => FailureKind::PrerequisiteMissing,
            Self::ArtifactInconsistency { .. } => FailureKind::ArtifactInconsistency,
            Self::ExternalToolFailure { .. }
            | Self::Download(_)
            | Self::Extract(_)
            | Self::Io(_) => FailureKind::ExternalToolFailure,
        }
    }

    pub(crate) fn tool(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Recovery hint printed under the diagnostic, when one applies.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedPackageManager => {
                Some("Install apt-get or yum (Linux) or Homebrew (macOS), then rerun --full")
            }
            Self::LicensesNotAccepted(_) => Some("Rerun --full to accept the SDK licenses"),
            Self::Download(_) => Some("Check network access to dl.google.com and rerun --full"),
            Self::ArtifactInconsistency { .. } => {
                Some("Inspect the packaging tool log, then run --clean and rebuild")
            }
            Self::Descriptor(_) => Some("Fix the build descriptor, or delete it to regenerate"),
            _ => None,
        }
    }
}
