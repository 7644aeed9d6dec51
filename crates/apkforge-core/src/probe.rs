//! Environment prober.

use std::path::Path;

use apkforge_schema::version::{self, VersionError};
use apkforge_schema::{EnvironmentReport, OsFamily, PackageManager};

use crate::config::Settings;
use crate::error::StageError;
use crate::host::{Host, Invocation};
use crate::Reporter;

/// Inspect the host. Fails hard on an unsupported OS or a missing or too-old
/// interpreter; low disk space is only a warning.
pub fn probe<H, R>(
    host: &H,
    project_dir: &Path,
    settings: &Settings,
    reporter: &R,
) -> Result<EnvironmentReport, StageError>
where
    H: Host + ?Sized,
    R: Reporter + ?Sized,
{
    let os_family = host.os();
    if os_family == OsFamily::Unsupported {
        return Err(StageError::PrerequisiteMissing(format!(
            "unsupported operating system '{}'; apkforge runs on Linux and macOS",
            std::env::consts::OS
        )));
    }

    let package_manager = detect_package_manager(host, os_family);
    tracing::debug!(os = %os_family, package_manager = %package_manager, "detected platform");

    let interpreter_version = interpreter_version(host, &settings.python)?;
    let minimum = settings.min_python_version();
    if !version::meets_minimum(&interpreter_version, minimum) {
        return Err(StageError::PrerequisiteMissing(format!(
            "{} {interpreter_version} is too old; {}.{} or newer is required",
            settings.python, minimum.0, minimum.1
        )));
    }

    let (available_disk_bytes, meets_disk_threshold) = match host.available_space(project_dir) {
        Some(bytes) => (bytes, bytes >= settings.min_disk_bytes),
        None => {
            reporter.warning("Could not determine free disk space");
            (0, false)
        }
    };

    let report = EnvironmentReport {
        os_family,
        package_manager,
        interpreter_version,
        available_disk_bytes,
        meets_disk_threshold,
        bridge_available: host.which(&settings.bridge_tool).is_some(),
    };

    if available_disk_bytes > 0 && !meets_disk_threshold {
        let msg = format!(
            "Only {:.1} GiB free; a first build needs about {:.0} GiB",
            report.available_disk_gib(),
            settings.min_disk_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
        );
        tracing::warn!("{msg}");
        reporter.warning(&msg);
    }

    reporter.info(&format!(
        "{} / {} / {} {} / {:.1} GiB free",
        report.os_family,
        report.package_manager,
        settings.python,
        report.interpreter_version,
        report.available_disk_gib()
    ));
    if !report.bridge_available {
        tracing::debug!(tool = %settings.bridge_tool, "device bridge not on PATH");
    }

    Ok(report)
}

/// First candidate package manager for `os` that is on `PATH`.
pub fn detect_package_manager<H: Host + ?Sized>(host: &H, os: OsFamily) -> PackageManager {
    os.package_manager_candidates()
        .iter()
        .copied()
        .find(|pm| pm.executable().is_some_and(|exe| host.which(exe).is_some()))
        .unwrap_or(PackageManager::None)
}

fn interpreter_version<H: Host + ?Sized>(
    host: &H,
    python: &str,
) -> Result<semver::Version, StageError> {
    if host.which(python).is_none() {
        return Err(StageError::PrerequisiteMissing(format!(
            "{python} not found on PATH"
        )));
    }

    let output = host
        .run(&Invocation::new(python).arg("--version"))
        .map_err(|e| StageError::PrerequisiteMissing(format!("cannot run {python}: {e}")))?;
    if !output.success() {
        return Err(StageError::PrerequisiteMissing(format!(
            "{python} --version failed ({})",
            output.diagnostic()
        )));
    }

    // Older interpreters print the banner on stderr
    version::parse_lenient(&output.stdout)
        .or_else(|_| version::parse_lenient(&output.stderr))
        .map_err(|e: VersionError| {
            StageError::PrerequisiteMissing(format!("cannot read {python} version: {e}"))
        })
}
