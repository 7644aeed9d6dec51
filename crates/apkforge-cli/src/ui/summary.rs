//! Run summary table.
//!
//! One row per selected stage in execution order. Stages that never started
//! because an earlier one failed are listed as `not run`.

use std::collections::BTreeMap;

use apkforge_schema::{PipelineRun, Stage, StageOutcome};
use comfy_table::{Cell, Color, Table, presets};

pub fn render(run: &PipelineRun, details: &BTreeMap<Stage, String>, elapsed_secs: f64) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_header(vec!["Stage", "Outcome", "Detail"]);

    for &stage in &run.selected_stages {
        let outcome = match run.outcome(stage) {
            Some(outcome) => Cell::new(outcome.as_str()).fg(outcome_color(outcome)),
            None => Cell::new("not run").fg(Color::DarkGrey),
        };
        let detail = details.get(&stage).map_or("", String::as_str);
        table.add_row(vec![Cell::new(stage.as_str()), outcome, Cell::new(detail)]);
    }

    format!("{table}\n{}", footer(run, elapsed_secs))
}

fn footer(run: &PipelineRun, elapsed_secs: f64) -> String {
    match &run.failure {
        Some(failure) => format!(
            "{} FAILED at {} ({}), elapsed {elapsed_secs:.1}s",
            run.kind.as_str().to_uppercase(),
            failure.stage,
            failure.kind
        ),
        None => format!(
            "{} COMPLETE, elapsed {elapsed_secs:.1}s",
            run.kind.as_str().to_uppercase()
        ),
    }
}

fn outcome_color(outcome: StageOutcome) -> Color {
    match outcome {
        StageOutcome::Success => Color::Green,
        StageOutcome::Skipped => Color::Yellow,
        StageOutcome::Failed => Color::Red,
    }
}
