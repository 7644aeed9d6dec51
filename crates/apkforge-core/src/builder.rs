//! Build executor: drive the packaging tool and locate the APK it produced.

use std::path::{Path, PathBuf};
use std::time::Instant;

use apkforge_schema::{BuildDescriptor, BuildResult};

use crate::config::Settings;
use crate::error::StageError;
use crate::host::{Host, Invocation};
use crate::sdk::SdkEnv;
use crate::Reporter;

/// Run `<tool> android debug` in the project. Only a missing or unstartable
/// tool is an `Err`; a failed build comes back as an unsuccessful
/// [`BuildResult`] for [`require_success`] to judge.
pub fn build<H, R>(
    host: &H,
    project_dir: &Path,
    descriptor: &BuildDescriptor,
    sdk_env: &SdkEnv,
    settings: &Settings,
    reporter: &R,
) -> Result<BuildResult, StageError>
where
    H: Host + ?Sized,
    R: Reporter + ?Sized,
{
    let tool = &settings.packaging_tool;
    let Some(tool_path) = host.which(tool) else {
        return Err(StageError::PrerequisiteMissing(format!(
            "{tool} not found on PATH; run --full to install it"
        )));
    };

    reporter.info(&format!(
        "Building {} ({}) for {}",
        descriptor.title,
        descriptor.application_id(),
        descriptor
            .architectures
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let invocation = Invocation::new(tool_path.display().to_string())
        .args(["android", "debug"])
        .envs(sdk_env.vars(std::env::var_os("PATH")))
        .current_dir(project_dir)
        .passthrough();

    let start = Instant::now();
    let output = host
        .run(&invocation)
        .map_err(|e| StageError::tool(tool.as_str(), e.to_string()))?;
    let duration_secs = start.elapsed().as_secs();

    if !output.success() {
        return Ok(BuildResult::failed(
            duration_secs,
            output.code,
            format!("{tool} android debug: {}", output.diagnostic()),
        ));
    }

    let output_dir = settings.output_path(project_dir);
    match find_artifact(&output_dir)? {
        Some((path, size)) => {
            tracing::info!(artifact = %path.display(), size, duration_secs, "build finished");
            Ok(BuildResult::produced(duration_secs, path, size))
        }
        None => Ok(BuildResult::failed(
            duration_secs,
            Some(0),
            format!("no .apk in {}", output_dir.display()),
        )),
    }
}

/// Turn an unsuccessful result into the matching stage error.
pub fn require_success(result: &BuildResult, settings: &Settings, project_dir: &Path) -> Result<(), StageError> {
    if result.succeeded {
        return Ok(());
    }
    if result.is_inconsistent() {
        return Err(StageError::ArtifactInconsistency {
            tool: settings.packaging_tool.clone(),
            dir: settings.output_path(project_dir),
        });
    }
    Err(StageError::tool(
        settings.packaging_tool.as_str(),
        result
            .diagnostic
            .clone()
            .unwrap_or_else(|| "build failed".to_string()),
    ))
}

/// First `*.apk` in `dir` by file name, with its size.
pub fn find_artifact(dir: &Path) -> std::io::Result<Option<(PathBuf, u64)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut apks = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_apk = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("apk"));
        if is_apk && path.is_file() {
            apks.push(path);
        }
    }
    apks.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    match apks.into_iter().next() {
        Some(path) => {
            let size = std::fs::metadata(&path)?.len();
            Ok(Some((path, size)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::ScriptedHost;
    use crate::NullReporter;
    use apkforge_schema::{FailureKind, OsFamily};
    use tempfile::tempdir;

    fn run_build(host: &ScriptedHost, project: &Path) -> BuildResult {
        build(
            host,
            project,
            &BuildDescriptor::default(),
            &SdkEnv::new("/sdk"),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap()
    }

    #[test]
    fn test_successful_build_finds_first_apk() {
        let dir = tempdir().unwrap();
        let project = dir.path().to_path_buf();
        let bin = project.join("bin");
        let host = ScriptedHost::new(OsFamily::Linux)
            .with_tools(&["buildozer"])
            .respond_with("buildozer", Some("android"), 0, move |inv| {
                assert_eq!(inv.args, vec!["android", "debug"]);
                std::fs::create_dir_all(&bin).unwrap();
                std::fs::write(bin.join("myapp-0.1-arm64-v8a-debug.apk"), b"PK..").unwrap();
                std::fs::write(bin.join("zz-other.apk"), b"PK").unwrap();
                std::fs::write(bin.join("build.log"), b"log").unwrap();
            });

        let result = run_build(&host, &project);
        assert!(result.succeeded);
        assert_eq!(
            result.artifact_path.as_deref(),
            Some(project.join("bin/myapp-0.1-arm64-v8a-debug.apk").as_path())
        );
        assert_eq!(result.artifact_size_bytes, Some(4));

        let call = &host.calls()[0];
        assert_eq!(call.cwd.as_deref(), Some(project.as_path()));
        assert!(call.passthrough);
        assert!(call.envs.iter().any(|(k, v)| k == "ANDROID_SDK_ROOT" && v == "/sdk"));
    }

    #[test]
    fn test_nonzero_exit_never_succeeds() {
        let dir = tempdir().unwrap();
        // A stale APK from an earlier build must not be picked up
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/old.apk"), b"PK").unwrap();

        let host = ScriptedHost::new(OsFamily::Linux)
            .with_tools(&["buildozer"])
            .respond("buildozer", Some("android"), 2, "");

        let result = run_build(&host, dir.path());
        assert!(!result.succeeded);
        assert!(result.artifact_path.is_none());
        assert_eq!(result.exit_code, Some(2));

        let err = require_success(&result, &Settings::default(), dir.path()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExternalToolFailure);
    }

    #[test]
    fn test_zero_exit_without_apk_is_inconsistent() {
        let dir = tempdir().unwrap();
        let host = ScriptedHost::new(OsFamily::Linux).with_tools(&["buildozer"]);

        let result = run_build(&host, dir.path());
        assert!(result.is_inconsistent());
        let err = require_success(&result, &Settings::default(), dir.path()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ArtifactInconsistency);
    }

    #[test]
    fn test_missing_tool() {
        let dir = tempdir().unwrap();
        let host = ScriptedHost::new(OsFamily::Linux);
        let err = build(
            &host,
            dir.path(),
            &BuildDescriptor::default(),
            &SdkEnv::new("/sdk"),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PrerequisiteMissing);
        assert!(host.calls().is_empty());
    }
}
