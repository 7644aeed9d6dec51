//! Pipeline controller.
//!
//! Walks the stage list of a [`PipelineKind`] in order, threading each
//! stage's product (environment report, SDK state, descriptor, build result)
//! to the stages after it. The first hard failure stops every dependent
//! stage; completed stages are never rolled back.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use apkforge_schema::{
    BuildResult, EnvironmentReport, PipelineKind, PipelineRun, SdkInstallation, Stage,
    StageOutcome,
};

use crate::config::Settings;
use crate::device::DeviceInstallOutcome;
use crate::error::StageError;
use crate::host::Host;
use crate::sdk::SdkEnv;
use crate::verify::Verification;
use crate::{Reporter, builder, clean, deps, device, probe, sdk, verify};

/// What a stage finished with, short of a hard failure.
type StageDone = (StageOutcome, Option<String>);

/// Everything a run needs. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    pub host: Arc<dyn Host>,
    pub settings: Settings,
    pub project_dir: PathBuf,
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("project_dir", &self.project_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Products of earlier stages.
#[derive(Debug, Default)]
struct RunState {
    report: Option<EnvironmentReport>,
    sdk: Option<SdkInstallation>,
    verification: Option<Verification>,
    build: Option<BuildResult>,
}

impl Pipeline {
    pub fn new(
        host: Arc<dyn Host>,
        settings: Settings,
        project_dir: impl Into<PathBuf>,
        client: reqwest::Client,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            host,
            settings,
            project_dir: project_dir.into(),
            client,
            reporter,
        }
    }

    /// Run a named pipeline to completion or first hard failure.
    pub async fn run(&self, kind: PipelineKind, deploy: bool) -> PipelineRun {
        let stages = kind.stages(deploy);
        let mut run = PipelineRun::new(kind, stages.clone());
        let mut state = RunState::default();

        tracing::info!(pipeline = %kind, stages = stages.len(), "starting pipeline");

        for stage in stages {
            if !run.may_run(stage) {
                tracing::debug!(stage = %stage, "not run after earlier failure");
                continue;
            }

            run.begin(stage);
            self.reporter.stage_started(stage);
            tracing::info!(stage = %stage, "stage started");

            match self.execute(kind, stage, &mut state).await {
                Ok((outcome, detail)) => {
                    run.record(stage, outcome);
                    tracing::info!(stage = %stage, outcome = %outcome, "stage finished");
                    self.reporter.stage_finished(stage, outcome, detail.as_deref());
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(stage = %stage, kind = %err.kind(), "{message}");
                    run.fail(stage, err.kind(), message.clone());
                    self.reporter
                        .stage_finished(stage, StageOutcome::Failed, Some(&message));
                    if let Some(hint) = err.hint() {
                        self.reporter.info(hint);
                    }
                }
            }
        }

        run
    }

    async fn execute(
        &self,
        kind: PipelineKind,
        stage: Stage,
        state: &mut RunState,
    ) -> Result<StageDone, StageError> {
        match stage {
            Stage::Probe => {
                let report = self
                    .blocking(|host, settings, project, reporter| {
                        probe::probe(host, project, settings, reporter)
                    })
                    .await?;
                let detail = format!("{} / {}", report.os_family, report.package_manager);
                state.report = Some(report);
                Ok((StageOutcome::Success, Some(detail)))
            }

            Stage::InstallDeps => {
                let report = self.report(state).await?;
                let outcome = self
                    .blocking(move |host, settings, _, reporter| {
                        deps::install_dependencies(host, &report, settings, reporter)
                    })
                    .await?;
                Ok((
                    StageOutcome::Success,
                    Some(format!(
                        "{} native, {} python packages",
                        outcome.native_packages.len(),
                        outcome.python_packages.len()
                    )),
                ))
            }

            Stage::ProvisionSdk => {
                let report = self.report(state).await?;
                let provisioned = sdk::provision(
                    &self.host,
                    &self.client,
                    &report,
                    &self.settings,
                    &self.reporter,
                )
                .await?;
                let components = provisioned.sdk.installed_components.len();
                state.sdk = Some(provisioned.sdk);
                if provisioned.changed {
                    Ok((
                        StageOutcome::Success,
                        Some(format!("{components} component(s) installed")),
                    ))
                } else {
                    Ok((StageOutcome::Skipped, Some("already provisioned".to_string())))
                }
            }

            Stage::VerifyConfig => {
                let verification = self.verify().await?;
                let detail = match (verification.created, verification.warnings.len()) {
                    (true, _) => "created default descriptor".to_string(),
                    (false, 0) => verification.descriptor.application_id(),
                    (false, n) => format!("{n} warning(s)"),
                };
                state.verification = Some(verification);
                Ok((StageOutcome::Success, Some(detail)))
            }

            Stage::Build => {
                let descriptor = match &state.verification {
                    Some(v) => v.descriptor.clone(),
                    None => self.verify().await?.descriptor,
                };
                self.warn_if_unprovisioned(state);

                let result = self
                    .blocking(move |host, settings, project, reporter| {
                        builder::build(
                            host,
                            project,
                            &descriptor,
                            &SdkEnv::new(&settings.sdk_root),
                            settings,
                            reporter,
                        )
                    })
                    .await?;
                state.build = Some(result.clone());
                builder::require_success(&result, &self.settings, &self.project_dir)?;

                let name = result
                    .artifact_path
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok((
                    StageOutcome::Success,
                    Some(format!(
                        "{name} ({}) in {}s",
                        human_bytes(result.artifact_size_bytes.unwrap_or(0)),
                        result.duration_secs
                    )),
                ))
            }

            Stage::InstallDevice => {
                let built = state.build.as_ref().and_then(|b| b.artifact_path.clone());
                let outcome = self
                    .blocking(move |host, settings, project, reporter| {
                        let artifact = match built {
                            Some(path) => path,
                            None => builder::find_artifact(&settings.output_path(project))?
                                .map(|(path, _)| path)
                                .ok_or_else(|| {
                                    StageError::PrerequisiteMissing("no APK to install".to_string())
                                })?,
                        };
                        device::install_to_device(host, &artifact, settings, reporter)
                    })
                    .await?;
                log_device_outcome(&outcome);
                match outcome.stage_outcome() {
                    StageOutcome::Failed => Err(StageError::tool(
                        format!("{} install", self.settings.bridge_tool),
                        "install failed on every device",
                    )),
                    StageOutcome::Skipped if kind.requires_device() => {
                        self.reporter
                            .warning("The APK was built but not installed; connect a device and rerun --install");
                        Ok((StageOutcome::Skipped, Some(outcome.detail())))
                    }
                    other => Ok((other, Some(outcome.detail()))),
                }
            }

            Stage::Clean => {
                let outcome = self
                    .blocking(|_, settings, project, reporter| {
                        clean::clean(project, settings, reporter)
                    })
                    .await?;
                if outcome.removed {
                    Ok((
                        StageOutcome::Success,
                        Some(format!("reclaimed {}", human_bytes(outcome.reclaimed_bytes))),
                    ))
                } else {
                    Ok((StageOutcome::Skipped, Some("no build cache".to_string())))
                }
            }
        }
    }

    /// Run synchronous stage work on the blocking pool; packaging tools and
    /// package managers can hold a thread for many minutes.
    async fn blocking<T, F>(&self, work: F) -> Result<T, StageError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Host, &Settings, &Path, &dyn Reporter) -> Result<T, StageError>
            + Send
            + 'static,
    {
        let host = Arc::clone(&self.host);
        let settings = self.settings.clone();
        let project = self.project_dir.clone();
        let reporter = Arc::clone(&self.reporter);
        tokio::task::spawn_blocking(move || {
            work(host.as_ref(), &settings, &project, reporter.as_ref())
        })
        .await
        .map_err(std::io::Error::other)?
    }

    async fn verify(&self) -> Result<Verification, StageError> {
        self.blocking(|_, settings, project, reporter| verify::verify(project, settings, reporter))
            .await
    }

    /// The probe's report, probing now if this pipeline skipped the stage.
    async fn report(&self, state: &mut RunState) -> Result<EnvironmentReport, StageError> {
        if let Some(report) = &state.report {
            return Ok(report.clone());
        }
        let report = self
            .blocking(|host, settings, project, reporter| {
                probe::probe(host, project, settings, reporter)
            })
            .await?;
        state.report = Some(report.clone());
        Ok(report)
    }

    fn warn_if_unprovisioned(&self, state: &RunState) {
        let components = self.settings.sdk_components().unwrap_or_default();
        let complete = match &state.sdk {
            Some(sdk) => sdk.cmdline_tools_present && sdk.has_all(&components),
            None => {
                let sdk = sdk::inspect(&self.settings.sdk_root, &components);
                sdk.cmdline_tools_present && sdk.has_all(&components)
            }
        };
        if !complete {
            self.reporter.warning(&format!(
                "Android SDK at {} is missing or incomplete; run --full first if the build cannot find it",
                self.settings.sdk_root.display()
            ));
        }
    }
}

fn log_device_outcome(outcome: &DeviceInstallOutcome) {
    if let DeviceInstallOutcome::Installed(results) = outcome {
        for r in results {
            tracing::debug!(serial = %r.serial, succeeded = r.succeeded, "{}", r.detail);
        }
    }
}

/// Binary-prefixed size for summaries, e.g. `24.1 MiB`.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
