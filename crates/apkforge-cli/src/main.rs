//! apkforge - Android builds for Kivy projects

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apkforge_cli::Cli;
use apkforge_cli::ui::Output;
use apkforge_core::{Pipeline, Reporter, Settings, SystemHost, USER_AGENT};

const VERBOSE_FILTER: &str = "apkforge=debug,apkforge_core=debug,apkforge_cli=debug";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not usage errors
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::new("error")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let kind = cli.pipeline();
    let project_dir = cli
        .project
        .canonicalize()
        .with_context(|| format!("project directory {} not found", cli.project.display()))?;
    let settings = Settings::load(&project_dir).context("failed to load configuration")?;
    tracing::debug!(project = %project_dir.display(), sdk_root = %settings.sdk_root.display(), "configuration loaded");

    let output = Arc::new(Output::new());
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;

    let pipeline = Pipeline::new(
        Arc::new(SystemHost),
        settings,
        project_dir,
        client,
        output.clone(),
    );

    let start = Instant::now();
    let run = pipeline.run(kind, cli.deploy).await;
    output.summary(&run, start.elapsed().as_secs_f64());

    Ok(ExitCode::from(run.exit_code()))
}
