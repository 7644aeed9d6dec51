//! Stages, named pipelines, and the per-run audit record.
//!
//! A named pipeline is nothing more than an ordered list of [`Stage`]s. The
//! controller in `apkforge-core` walks the list and records one
//! [`StageOutcome`] per stage it actually executed in a [`PipelineRun`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One discrete unit of the pipeline.
///
/// Variant order is the canonical execution order, so `Ord` sorts stages the
/// way the full pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probe,
    InstallDeps,
    ProvisionSdk,
    VerifyConfig,
    Build,
    InstallDevice,
    Clean,
}

impl Stage {
    /// Identifier used in logs and the run summary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::InstallDeps => "install_deps",
            Self::ProvisionSdk => "provision_sdk",
            Self::VerifyConfig => "verify_config",
            Self::Build => "build",
            Self::InstallDevice => "install_device",
            Self::Clean => "clean",
        }
    }

    /// Human-readable title for section headers.
    pub fn title(self) -> &'static str {
        match self {
            Self::Probe => "Checking environment",
            Self::InstallDeps => "Installing dependencies",
            Self::ProvisionSdk => "Provisioning Android SDK",
            Self::VerifyConfig => "Verifying build descriptor",
            Self::Build => "Building APK",
            Self::InstallDevice => "Installing to device",
            Self::Clean => "Cleaning build cache",
        }
    }

    /// Independent stages still run after an earlier stage failed.
    pub fn is_independent(self) -> bool {
        matches!(self, Self::Clean)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    Success,
    /// Soft outcome: nothing to do, or an optional prerequisite was absent.
    Skipped,
    Failed,
}

impl StageOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad command-line flags; no stage runs.
    Usage,
    /// Unsupported OS, interpreter too old, required tool absent.
    PrerequisiteMissing,
    /// A package manager, download, extraction, packaging tool, or bridge failed.
    ExternalToolFailure,
    /// The packaging tool exited zero but left no artifact.
    ArtifactInconsistency,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage error",
            Self::PrerequisiteMissing => "missing prerequisite",
            Self::ExternalToolFailure => "external tool failure",
            Self::ArtifactInconsistency => "artifact inconsistency",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage halted the run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

/// Operator-selectable ordered subset of stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Full,
    Quick,
    /// `Quick` with device installation forced on.
    Install,
    Clean,
}

impl PipelineKind {
    /// Ordered stages for this pipeline. `deploy` appends device install to
    /// `Full` and `Quick`; `Install` always has it and `Clean` never does.
    ///
    /// # Example
    ///
    /// ```
    /// use apkforge_schema::{PipelineKind, Stage};
    ///
    /// assert_eq!(
    ///     PipelineKind::Install.stages(false),
    ///     vec![Stage::VerifyConfig, Stage::Build, Stage::InstallDevice]
    /// );
    /// ```
    pub fn stages(self, deploy: bool) -> Vec<Stage> {
        let mut stages = match self {
            Self::Full => vec![
                Stage::Probe,
                Stage::InstallDeps,
                Stage::ProvisionSdk,
                Stage::VerifyConfig,
                Stage::Build,
            ],
            Self::Quick | Self::Install => vec![Stage::VerifyConfig, Stage::Build],
            Self::Clean => return vec![Stage::Clean],
        };
        if deploy || self == Self::Install {
            stages.push(Stage::InstallDevice);
        }
        stages
    }

    /// Whether device installation is mandatory rather than requested.
    pub fn requires_device(self) -> bool {
        self == Self::Install
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Quick => "quick",
            Self::Install => "install",
            Self::Clean => "clean",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub kind: PipelineKind,
    pub selected_stages: Vec<Stage>,
    pub current_stage: Option<Stage>,
    pub stage_outcomes: BTreeMap<Stage, StageOutcome>,
    pub failure: Option<StageFailure>,
}

impl PipelineRun {
    pub fn new(kind: PipelineKind, selected_stages: Vec<Stage>) -> Self {
        Self {
            kind,
            selected_stages,
            current_stage: None,
            stage_outcomes: BTreeMap::new(),
            failure: None,
        }
    }

    /// Whether `stage` may start given what already happened.
    pub fn may_run(&self, stage: Stage) -> bool {
        self.failure.is_none() || stage.is_independent()
    }

    pub fn begin(&mut self, stage: Stage) {
        self.current_stage = Some(stage);
    }

    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stage_outcomes.insert(stage, outcome);
    }

    /// Record a hard failure. Only the first failure is kept.
    pub fn fail(&mut self, stage: Stage, kind: FailureKind, message: impl Into<String>) {
        self.stage_outcomes.insert(stage, StageOutcome::Failed);
        if self.failure.is_none() {
            self.failure = Some(StageFailure {
                stage,
                kind,
                message: message.into(),
            });
        }
    }

    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stage_outcomes.get(&stage).copied()
    }

    /// Stages that actually executed, in execution order.
    pub fn executed(&self) -> impl Iterator<Item = (Stage, StageOutcome)> + '_ {
        self.stage_outcomes.iter().map(|(s, o)| (*s, *o))
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Process exit code: 0 on success, 1 on any hard failure.
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.succeeded())
    }
}
