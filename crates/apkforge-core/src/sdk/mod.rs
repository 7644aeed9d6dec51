//! Android SDK provisioning.
//!
//! Provisioning is a fixed sequence of steps over an SDK root:
//!
//! 1. create the root
//! 2. fetch and relocate the command-line tools into `cmdline-tools/latest`
//! 3. accept the SDK licenses
//! 4. install each pinned component with `sdkmanager`
//! 5. upsert the export block into the shell profile
//!
//! Steps 2 to 4 are guarded by completion markers (see [`marker`]), so a
//! second run against a complete installation neither downloads nor spawns
//! anything.

pub mod marker;
pub mod profile;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tempfile::TempDir;

use apkforge_schema::{EnvironmentReport, SdkComponent, SdkInstallation};

use crate::config::Settings;
use crate::error::StageError;
use crate::host::{Host, Invocation};
use crate::io::download::DownloadRequest;
use crate::io::extract::{self, ExtractError};
use crate::Reporter;

pub use profile::SdkEnv;

/// Answers fed to `sdkmanager --licenses`; more than it ever asks.
const LICENSE_ANSWERS: usize = 64;

/// What a provisioning pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub sdk: SdkInstallation,
    /// Profile that carries the exports, if one could be determined.
    pub profile: Option<PathBuf>,
    pub profile_changed: bool,
    /// False when every step was already satisfied.
    pub changed: bool,
}

/// Rebuild what is installed under `root` from the completion markers.
pub fn inspect(root: &Path, components: &[SdkComponent]) -> SdkInstallation {
    let mut sdk = SdkInstallation::empty(root);
    sdk.cmdline_tools_present = marker::is_complete(&sdk.cmdline_tools_dir());
    sdk.licenses_accepted = marker::licenses_accepted(root);
    sdk.installed_components = components
        .iter()
        .filter(|c| marker::is_complete(&root.join(c.install_dir())))
        .cloned()
        .collect();
    sdk
}

/// Run every provisioning step that is not already complete. Only the
/// download runs on the async runtime; extraction, `sdkmanager` and the
/// profile edit go to the blocking pool.
pub async fn provision<H, R>(
    host: &Arc<H>,
    client: &Client,
    report: &EnvironmentReport,
    settings: &Settings,
    reporter: &Arc<R>,
) -> Result<Provisioned, StageError>
where
    H: Host + ?Sized + 'static,
    R: Reporter + ?Sized + 'static,
{
    let components = settings.sdk_components()?;
    let root = settings.sdk_root.clone();
    fs::create_dir_all(&root)?;

    let mut sdk = inspect(&root, &components);
    let mut changed = false;

    if sdk.cmdline_tools_present {
        tracing::debug!(root = %root.display(), "command-line tools already installed");
    } else {
        let (url, sha256) = settings
            .cmdline_tools
            .for_os(report.os_family)
            .ok_or_else(|| {
                StageError::PrerequisiteMissing(format!(
                    "no command-line tools available for {}",
                    report.os_family
                ))
            })?;
        reporter.info("Downloading Android command-line tools");
        install_cmdline_tools(client, url, sha256, &sdk, reporter.as_ref()).await?;
        sdk.cmdline_tools_present = true;
        changed = true;
        reporter.success("Command-line tools installed");
    }

    let host = Arc::clone(host);
    let reporter = Arc::clone(reporter);
    let profile = settings.profile_path(report.os_family);
    let (sdk, installed, profile_changed) = tokio::task::spawn_blocking(move || {
        let installed = install_remaining(host.as_ref(), &mut sdk, &components, reporter.as_ref())?;
        let profile_changed = update_profile(profile.as_deref(), &sdk, reporter.as_ref())?;
        Ok::<_, StageError>((sdk, installed, profile_changed))
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(Provisioned {
        sdk,
        profile: settings.profile_path(report.os_family),
        profile_changed,
        changed: changed || installed || profile_changed,
    })
}

/// Licenses, then every component without a marker. Returns whether
/// anything ran.
fn install_remaining<H, R>(
    host: &H,
    sdk: &mut SdkInstallation,
    components: &[SdkComponent],
    reporter: &R,
) -> Result<bool, StageError>
where
    H: Host + ?Sized,
    R: Reporter + ?Sized,
{
    let env = SdkEnv::new(&sdk.root_path).vars(std::env::var_os("PATH"));
    let mut changed = false;

    if !sdk.licenses_accepted {
        accept_licenses(host, sdk, &env)?;
        sdk.licenses_accepted = true;
        changed = true;
        reporter.success("SDK licenses accepted");
    }

    for component in components {
        if sdk.installed_components.contains(component) {
            tracing::debug!(component = %component, "already installed");
            continue;
        }
        reporter.info(&format!("Installing {component}"));
        install_component(host, sdk, component, &env)?;
        changed = true;
    }
    Ok(changed)
}

fn update_profile<R: Reporter + ?Sized>(
    profile: Option<&Path>,
    sdk: &SdkInstallation,
    reporter: &R,
) -> Result<bool, StageError> {
    let Some(path) = profile else {
        reporter.warning("No home directory found; export ANDROID_SDK_ROOT manually");
        return Ok(false);
    };
    let updated = profile::upsert_block(path, &SdkEnv::new(&sdk.root_path).profile_block())?;
    if updated {
        reporter.info(&format!(
            "Added SDK exports to {} (open a new shell to pick them up)",
            path.display()
        ));
    }
    Ok(updated)
}

/// Download, extract, and move the archive's `cmdline-tools/` into
/// `cmdline-tools/latest`, replacing any partial previous attempt.
async fn install_cmdline_tools<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    sha256: Option<&str>,
    sdk: &SdkInstallation,
    reporter: &R,
) -> Result<(), StageError> {
    // Staging lives inside the root so the final move is a rename
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(&sdk.root_path)?;

    let file_name = match crate::paths::filename_from_url(url) {
        "" => "commandlinetools.zip",
        name => name,
    }
    .to_string();
    let archive = staging.path().join(&file_name);
    DownloadRequest::new(client, url, &archive)
        .with_expected_hash(sha256)
        .with_label("cmdline-tools")
        .execute(reporter)
        .await?;

    let target = sdk.cmdline_tools_dir();
    tokio::task::spawn_blocking(move || relocate_cmdline_tools(&staging, &archive, &file_name, &target))
        .await
        .map_err(std::io::Error::other)?
}

fn relocate_cmdline_tools(
    staging: &TempDir,
    archive: &Path,
    file_name: &str,
    target: &Path,
) -> Result<(), StageError> {
    let unpacked = staging.path().join("unpacked");
    extract::extract_auto(archive, &unpacked)?;

    let source = unpacked.join("cmdline-tools");
    if !source.is_dir() {
        return Err(ExtractError::Archive(format!(
            "{file_name} has no top-level cmdline-tools/ directory"
        ))
        .into());
    }

    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&source, target)?;
    marker::mark_complete(target)?;
    Ok(())
}

fn accept_licenses<H: Host + ?Sized>(
    host: &H,
    sdk: &SdkInstallation,
    env: &[(String, String)],
) -> Result<(), StageError> {
    let invocation = Invocation::new(sdk.sdkmanager_path().display().to_string())
        .arg(sdk_root_arg(sdk))
        .arg("--licenses")
        .envs(env.iter().cloned())
        .stdin("y\n".repeat(LICENSE_ANSWERS));

    let output = host
        .run(&invocation)
        .map_err(|e| StageError::tool("sdkmanager --licenses", e.to_string()))?;
    if !output.success() {
        return Err(StageError::tool("sdkmanager --licenses", output.diagnostic()));
    }
    marker::mark_licenses_accepted(&sdk.root_path)?;
    Ok(())
}

/// Install one component and record it. Refuses to run before the licenses
/// are accepted.
pub fn install_component<H: Host + ?Sized>(
    host: &H,
    sdk: &mut SdkInstallation,
    component: &SdkComponent,
    env: &[(String, String)],
) -> Result<(), StageError> {
    if !sdk.licenses_accepted {
        return Err(StageError::LicensesNotAccepted(component.id().to_string()));
    }

    let invocation = Invocation::new(sdk.sdkmanager_path().display().to_string())
        .arg(sdk_root_arg(sdk))
        .arg(component.id())
        .envs(env.iter().cloned())
        .passthrough();

    let output = host
        .run(&invocation)
        .map_err(|e| StageError::tool("sdkmanager", e.to_string()))?;
    if !output.success() {
        return Err(StageError::tool(
            format!("sdkmanager {component}"),
            output.diagnostic(),
        ));
    }

    marker::mark_complete(&sdk.root_path.join(component.install_dir()))?;
    sdk.installed_components.insert(component.clone());
    Ok(())
}

fn sdk_root_arg(sdk: &SdkInstallation) -> String {
    format!("--sdk_root={}", sdk.root_path.display())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::CmdlineToolsSource;
    use crate::host::testing::ScriptedHost;
    use crate::NullReporter;
    use apkforge_schema::{OsFamily, PackageManager};
    use mockito::Server;
    use std::io::Write;
    use tempfile::{TempDir, tempdir};

    pub(crate) fn report_for(os: OsFamily) -> EnvironmentReport {
        EnvironmentReport {
            os_family: os,
            package_manager: PackageManager::Apt,
            interpreter_version: semver::Version::new(3, 11, 4),
            available_disk_bytes: 50 * 1024 * 1024 * 1024,
            meets_disk_threshold: true,
            bridge_available: false,
        }
    }

    /// Zip laid out like Google's command-line tools archive.
    pub(crate) fn tools_zip(top_level: &str) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            zip.start_file(format!("{top_level}/bin/sdkmanager"), options)
                .unwrap();
            zip.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    pub(crate) fn settings_in(dir: &TempDir, tools_url: String) -> Settings {
        Settings {
            sdk_root: dir.path().join("android-sdk"),
            shell_profile: Some(dir.path().join(".bashrc")),
            cmdline_tools: CmdlineToolsSource {
                linux_url: tools_url,
                ..CmdlineToolsSource::default()
            },
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_second_run_downloads_nothing() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/tools.zip")
            .with_status(200)
            .with_body(tools_zip("cmdline-tools"))
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        let report = report_for(OsFamily::Linux);
        let client = Client::new();

        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let first = provision(&host, &client, &report, &settings, &Arc::new(NullReporter))
            .await
            .unwrap();
        assert!(first.changed);
        assert!(first.profile_changed);
        assert!(first.sdk.licenses_accepted);
        assert_eq!(first.sdk.installed_components.len(), 3);
        assert!(
            settings
                .sdk_root
                .join("cmdline-tools/latest/bin/sdkmanager")
                .is_file()
        );
        // licenses + three components
        assert_eq!(host.calls().len(), 4);

        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let second = provision(&host, &client, &report, &settings, &Arc::new(NullReporter))
            .await
            .unwrap();
        assert!(!second.changed);
        assert!(host.calls().is_empty());
        assert_eq!(second.sdk, first.sdk);

        m.assert_async().await;

        let profile = std::fs::read_to_string(dir.path().join(".bashrc")).unwrap();
        assert_eq!(profile.matches("ANDROID_SDK_ROOT=").count(), 1);
    }

    #[tokio::test]
    async fn test_license_prompt_gets_answers() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/tools.zip")
            .with_body(tools_zip("cmdline-tools"))
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        provision(
            &host,
            &Client::new(),
            &report_for(OsFamily::Linux),
            &settings,
            &Arc::new(NullReporter),
        )
        .await
        .unwrap();

        let calls = host.calls();
        let licenses = calls
            .iter()
            .find(|c| c.args.iter().any(|a| a == "--licenses"))
            .unwrap();
        assert!(licenses.stdin.as_deref().unwrap().starts_with("y\ny\n"));
        assert!(
            licenses
                .envs
                .iter()
                .any(|(k, _)| k == "ANDROID_SDK_ROOT")
        );
    }

    #[tokio::test]
    async fn test_license_failure_is_retried_next_run() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/tools.zip")
            .with_body(tools_zip("cmdline-tools"))
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        let report = report_for(OsFamily::Linux);
        let client = Client::new();
        let root_arg = format!("--sdk_root={}", settings.sdk_root.display());

        let failing = Arc::new(
            ScriptedHost::new(OsFamily::Linux).respond("sdkmanager", Some(root_arg.as_str()), 1, ""),
        );
        let err = provision(&failing, &client, &report, &settings, &Arc::new(NullReporter))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ExternalToolFailure { .. }));

        let sdk = inspect(&settings.sdk_root, &settings.sdk_components().unwrap());
        assert!(sdk.cmdline_tools_present);
        assert!(!sdk.licenses_accepted);
        assert!(sdk.installed_components.is_empty());

        // Tools are kept; only the licenses and components are redone
        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let done = provision(&host, &client, &report, &settings, &Arc::new(NullReporter))
            .await
            .unwrap();
        assert!(done.sdk.licenses_accepted);
        assert_eq!(host.calls().len(), 4);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_partial_tools_dir_is_replaced() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/tools.zip")
            .with_body(tools_zip("cmdline-tools"))
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        // Left behind by an interrupted relocation: no completion marker
        let latest = settings.sdk_root.join("cmdline-tools/latest");
        std::fs::create_dir_all(latest.join("bin")).unwrap();
        std::fs::write(latest.join("bin/half-written"), "partial").unwrap();

        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let done = provision(
            &host,
            &Client::new(),
            &report_for(OsFamily::Linux),
            &settings,
            &Arc::new(NullReporter),
        )
        .await
        .unwrap();

        assert!(done.changed);
        assert!(done.sdk.cmdline_tools_present);
        assert!(marker::is_complete(&latest));
        assert!(latest.join("bin/sdkmanager").is_file());
        assert!(!latest.join("bin/half-written").exists());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_macos_uses_macos_archive() {
        let mut server = Server::new_async().await;
        let linux = server
            .mock("GET", "/linux.zip")
            .with_body(tools_zip("cmdline-tools"))
            .expect(0)
            .create_async()
            .await;
        let mac = server
            .mock("GET", "/mac.zip")
            .with_body(tools_zip("cmdline-tools"))
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let mut settings = settings_in(&dir, format!("{}/linux.zip", server.url()));
        settings.cmdline_tools.macos_url = format!("{}/mac.zip", server.url());

        let host = Arc::new(ScriptedHost::new(OsFamily::Macos));
        let done = provision(
            &host,
            &Client::new(),
            &report_for(OsFamily::Macos),
            &settings,
            &Arc::new(NullReporter),
        )
        .await
        .unwrap();

        assert!(done.sdk.cmdline_tools_present);
        assert!(
            settings
                .sdk_root
                .join("cmdline-tools/latest/bin/sdkmanager")
                .is_file()
        );
        mac.assert_async().await;
        linux.assert_async().await;
    }

    #[test]
    fn test_component_install_requires_licenses() {
        let dir = tempdir().unwrap();
        let mut sdk = SdkInstallation::empty(dir.path());
        let host = ScriptedHost::new(OsFamily::Linux);
        let component = SdkComponent::parse("platforms;android-33").unwrap();

        let err = install_component(&host, &mut sdk, &component, &[]).unwrap_err();
        assert!(matches!(err, StageError::LicensesNotAccepted(_)));
        assert!(host.calls().is_empty());
        assert!(!dir.path().join("platforms/android-33").exists());
    }

    #[tokio::test]
    async fn test_archive_without_cmdline_tools_dir() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/tools.zip")
            .with_body(tools_zip("tools"))
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let err = provision(
            &host,
            &Client::new(),
            &report_for(OsFamily::Linux),
            &settings,
            &Arc::new(NullReporter),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StageError::Extract(_)));
        assert!(!marker::is_complete(
            &settings.sdk_root.join("cmdline-tools/latest")
        ));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_fatal() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/tools.zip")
            .with_body(tools_zip("cmdline-tools"))
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let mut settings = settings_in(&dir, format!("{}/tools.zip", server.url()));
        settings.cmdline_tools.linux_sha256 = Some("00".repeat(32));
        let host = Arc::new(ScriptedHost::new(OsFamily::Linux));
        let err = provision(
            &host,
            &Client::new(),
            &report_for(OsFamily::Linux),
            &settings,
            &Arc::new(NullReporter),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StageError::Download(_)));
        assert!(host.calls().is_empty());
    }
}
