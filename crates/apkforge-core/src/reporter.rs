//! Reporter trait for dependency injection
//!
//! Stages report progress and soft warnings through this trait instead of
//! printing, so the CLI decides how things look and tests can record them.

use apkforge_schema::{PipelineRun, Stage, StageOutcome};

pub trait Reporter: Send + Sync {
    /// A stage is about to run.
    fn stage_started(&self, stage: Stage);

    /// A stage finished; `detail` is a one-line explanation for skips and failures.
    fn stage_finished(&self, stage: Stage, outcome: StageOutcome, detail: Option<&str>);

    /// Updates the progress of a download.
    fn downloading(&self, label: &str, current: u64, total: Option<u64>);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display the per-stage outcome table for a finished run.
    fn summary(&self, run: &PipelineRun, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn stage_started(&self, stage: Stage) {
        (**self).stage_started(stage);
    }
    fn stage_finished(&self, stage: Stage, outcome: StageOutcome, detail: Option<&str>) {
        (**self).stage_finished(stage, outcome, detail);
    }
    fn downloading(&self, label: &str, current: u64, total: Option<u64>) {
        (**self).downloading(label, current, total);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, run: &PipelineRun, elapsed_secs: f64) {
        (**self).summary(run, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage_started(&self, _: Stage) {}
    fn stage_finished(&self, _: Stage, _: StageOutcome, _: Option<&str>) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: &PipelineRun, _: f64) {}
}

/// Captures warnings so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    pub(crate) warnings: std::sync::Mutex<Vec<String>>,
    pub(crate) downloads: std::sync::Mutex<Vec<(u64, Option<u64>)>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn stage_started(&self, _: Stage) {}
    fn stage_finished(&self, _: Stage, _: StageOutcome, _: Option<&str>) {}
    fn downloading(&self, _: &str, current: u64, total: Option<u64>) {
        self.downloads.lock().unwrap().push((current, total));
    }
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
    fn error(&self, _: &str) {}
    fn summary(&self, _: &PipelineRun, _: f64) {}
}
