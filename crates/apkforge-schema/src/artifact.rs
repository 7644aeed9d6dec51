use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one packaging-tool invocation.
///
/// Construct through [`BuildResult::failed`] or [`BuildResult::produced`] so a
/// failed build can never carry an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub succeeded: bool,
    pub duration_secs: u64,
    pub exit_code: Option<i32>,
    pub artifact_path: Option<PathBuf>,
    pub artifact_size_bytes: Option<u64>,
    pub diagnostic: Option<String>,
}

impl BuildResult {
    /// The tool exited non-zero, or exited zero without leaving an artifact.
    pub fn failed(duration_secs: u64, exit_code: Option<i32>, diagnostic: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            duration_secs,
            exit_code,
            artifact_path: None,
            artifact_size_bytes: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// The tool exited zero and `path` is the artifact it produced.
    pub fn produced(duration_secs: u64, path: PathBuf, size: u64) -> Self {
        Self {
            succeeded: true,
            duration_secs,
            exit_code: Some(0),
            artifact_path: Some(path),
            artifact_size_bytes: Some(size),
            diagnostic: None,
        }
    }

    /// Zero exit code but no artifact in the output directory.
    pub fn is_inconsistent(&self) -> bool {
        !self.succeeded && self.exit_code == Some(0)
    }
}
