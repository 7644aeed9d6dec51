//! Shared data model for the apkforge pipeline.
#![allow(missing_docs)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Every stage in `apkforge-core` reads and produces these types. Nothing in
//! this crate touches the network or spawns processes; the only IO is parsing
//! and rendering the build descriptor text format.

pub mod artifact;
pub mod descriptor;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod sdk;
pub mod version;

// Re-exports
pub use artifact::BuildResult;
pub use descriptor::{BuildDescriptor, DescriptorError, ParsedDescriptor, RequiredField};
pub use pipeline::{FailureKind, PipelineKind, PipelineRun, Stage, StageFailure, StageOutcome};
pub use platform::{OsFamily, PackageManager};
pub use report::{DISK_THRESHOLD_BYTES, EnvironmentReport};
pub use sdk::{SdkComponent, SdkInstallation};
pub use version::{MIN_INTERPRETER, VersionError};
