//! Terminal output for pipeline runs.
//!
//! Stage lines, info and success go to stdout; warnings and errors go to
//! stderr. Writes are serialized through one lock so a download progress
//! line is always terminated before anything else prints.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;

use apkforge_core::Reporter;
use apkforge_core::pipeline::human_bytes;
use apkforge_schema::{PipelineRun, Stage, StageOutcome};
use crossterm::style::Stylize;

use super::summary;
use super::theme::Theme;

/// Progress line currently drawn with `\r`.
#[derive(Debug)]
struct OpenProgress {
    label: String,
    bucket: u64,
}

#[derive(Debug, Default)]
struct State {
    progress: Option<OpenProgress>,
    details: BTreeMap<Stage, String>,
}

#[derive(Debug)]
pub struct Output {
    theme: Theme,
    state: Mutex<State>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            theme: Theme::new(),
            state: Mutex::new(State::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Terminate an open progress line.
    fn close_progress(state: &mut State) {
        if state.progress.take().is_some() {
            println!();
        }
    }

    fn line(&self, to_stderr: bool, text: &str) {
        self.with_state(|state| {
            Self::close_progress(state);
            if to_stderr {
                eprintln!("{text}");
            } else {
                println!("{text}");
            }
        });
    }
}

impl Reporter for Output {
    fn stage_started(&self, stage: Stage) {
        let title = format!(
            "{: <width$}",
            stage.title(),
            width = self.theme.phase_padding
        );
        self.line(
            false,
            &format!(
                "{} {} {}",
                "==>".with(self.theme.colors.header).bold(),
                title.bold(),
                format!("[{stage}]").with(self.theme.colors.secondary)
            ),
        );
    }

    fn stage_finished(&self, stage: Stage, outcome: StageOutcome, detail: Option<&str>) {
        if let Some(detail) = detail {
            self.with_state(|state| {
                state.details.insert(stage, detail.to_string());
            });
        }
        let color = self.theme.outcome_color(outcome);
        let status = format!(
            "  {} {}",
            self.theme.outcome_icon(outcome).with(color),
            outcome.as_str().with(color)
        );
        let text = match detail {
            Some(detail) => format!("{status} {}", detail.with(self.theme.colors.secondary)),
            None => status,
        };
        self.line(outcome == StageOutcome::Failed, &text);
    }

    fn downloading(&self, label: &str, current: u64, total: Option<u64>) {
        self.with_state(|state| {
            let bucket = progress_bucket(current, total);
            let unchanged = state
                .progress
                .as_ref()
                .is_some_and(|p| p.label == label && p.bucket == bucket);
            if unchanged {
                return;
            }
            if state.progress.as_ref().is_some_and(|p| p.label != label) {
                Self::close_progress(state);
            }

            let mut stdout = std::io::stdout();
            let _ = write!(
                stdout,
                "\r  {} {}",
                self.theme.icons.active.with(self.theme.colors.active),
                progress_text(label, current, total)
            );
            let _ = stdout.flush();
            state.progress = Some(OpenProgress {
                label: label.to_string(),
                bucket,
            });
        });
    }

    fn info(&self, msg: &str) {
        self.line(false, &format!("  {} {msg}", self.theme.icons.info));
    }

    fn success(&self, msg: &str) {
        self.line(
            false,
            &format!("  {} {msg}", self.theme.icons.success.with(self.theme.colors.success)),
        );
    }

    fn warning(&self, msg: &str) {
        self.line(
            true,
            &format!(
                "  {} {}",
                self.theme.icons.warning.with(self.theme.colors.warning),
                msg.with(self.theme.colors.warning)
            ),
        );
    }

    fn error(&self, msg: &str) {
        self.line(
            true,
            &format!(
                "  {} {}",
                self.theme.icons.error.with(self.theme.colors.error),
                msg.with(self.theme.colors.error)
            ),
        );
    }

    fn summary(&self, run: &PipelineRun, elapsed_secs: f64) {
        let details = self.with_state(|state| state.details.clone());
        self.line(false, &format!("\n{}", summary::render(run, &details, elapsed_secs)));
    }
}

/// Redraw granularity: every 5% with a known length, otherwise every MiB.
fn progress_bucket(current: u64, total: Option<u64>) -> u64 {
    match total.filter(|&t| t > 0) {
        Some(total) => current.min(total) * 20 / total,
        None => current >> 20,
    }
}

fn progress_text(label: &str, current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(total) => format!(
            "{label} {} / {} ({}%)",
            human_bytes(current),
            human_bytes(total),
            current.min(total) * 100 / total
        ),
        None => format!("{label} {}", human_bytes(current)),
    }
}
