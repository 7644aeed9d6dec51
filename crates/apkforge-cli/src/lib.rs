//! apkforge - Android builds for Kivy projects
#![allow(missing_docs)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Provisions the Android SDK and NDK, installs the packaging toolchain, and
//! drives `buildozer` to produce a debug APK, optionally deploying it to
//! attached devices.
//!
//! # Pipelines
//!
//! ```text
//! --full     probe → install_deps → provision_sdk → verify_config → build
//! --quick    verify_config → build
//! --install  verify_config → build → install_device
//! --clean    clean
//! ```
//!
//! `--deploy` appends `install_device` to `--full` and `--quick`.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.apkforge/
//! └── android-sdk/
//!     ├── cmdline-tools/latest/   # sdkmanager, avdmanager
//!     ├── platforms/android-33/
//!     ├── build-tools/33.0.2/
//!     └── ndk/25.2.9519653/
//! ```

pub mod ui;

use apkforge_schema::PipelineKind;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "apkforge")]
#[command(author, version, about = "Provision the Android SDK and build APKs for Kivy projects")]
#[command(group(
    ArgGroup::new("pipeline")
        .required(true)
        .args(["clean", "full", "quick", "install"]),
))]
pub struct Cli {
    /// Remove the build cache
    #[arg(short, long)]
    pub clean: bool,

    /// Check the host, install dependencies, provision the SDK, then build
    #[arg(short, long)]
    pub full: bool,

    /// Verify the descriptor and build, assuming the toolchain is in place
    #[arg(short, long)]
    pub quick: bool,

    /// Build, then install the APK on every attached device
    #[arg(short, long)]
    pub install: bool,

    /// Also install to attached devices after --full or --quick
    #[arg(long, conflicts_with = "clean")]
    pub deploy: bool,

    /// Project directory containing buildozer.spec
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Show debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The pipeline the flags selected. The argument group guarantees exactly one.
    pub fn pipeline(&self) -> PipelineKind {
        if self.clean {
            PipelineKind::Clean
        } else if self.full {
            PipelineKind::Full
        } else if self.install {
            PipelineKind::Install
        } else {
            PipelineKind::Quick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("apkforge").chain(args.iter().copied()))
    }

    #[test]
    fn test_each_flag_selects_one_pipeline() {
        assert_eq!(parse(&["-c"]).unwrap().pipeline(), PipelineKind::Clean);
        assert_eq!(parse(&["--full"]).unwrap().pipeline(), PipelineKind::Full);
        assert_eq!(parse(&["-q"]).unwrap().pipeline(), PipelineKind::Quick);
        assert_eq!(parse(&["-i"]).unwrap().pipeline(), PipelineKind::Install);
    }

    #[test]
    fn test_pipeline_is_required() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(parse(&["-v", "-p", "app"]).is_err());
    }

    #[test]
    fn test_pipelines_are_exclusive() {
        assert_eq!(
            parse(&["--clean", "--full"]).unwrap_err().kind(),
            ErrorKind::ArgumentConflict
        );
        assert!(parse(&["-q", "-i"]).is_err());
        assert!(parse(&["--clean", "--deploy"]).is_err());
    }

    #[test]
    fn test_ambient_flags_allowed_with_clean() {
        let cli = parse(&["--clean", "-v", "--project", "/work/app"]).unwrap();
        assert_eq!(cli.pipeline(), PipelineKind::Clean);
        assert!(cli.verbose);
        assert_eq!(cli.project, PathBuf::from("/work/app"));
    }

    #[test]
    fn test_deploy_with_quick() {
        let cli = parse(&["-q", "--deploy"]).unwrap();
        assert!(cli.deploy);
        assert_eq!(cli.pipeline(), PipelineKind::Quick);
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }
}
