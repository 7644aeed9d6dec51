//! Pipeline settings.
//!
//! Every field has a default, so a project without `apkforge.toml` works out
//! of the box. Load order: defaults, then `<project>/apkforge.toml`, then
//! environment overrides (`APKFORGE_HOME`, `ANDROID_SDK_ROOT`,
//! `APKFORGE_PROFILE`).
//!
//! ```toml
//! sdk_root = "/opt/android-sdk"
//! min_disk_bytes = 5368709120
//!
//! [cmdline_tools]
//! linux_sha256 = "2d2d50857e4eb553af5a6dc3ad507a17adf43d115264b1afc116f95c92e5e258"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use apkforge_schema::sdk::DEFAULT_COMPONENTS;
use apkforge_schema::{DISK_THRESHOLD_BYTES, OsFamily, SdkComponent};

/// Name of the optional per-project settings file.
pub const CONFIG_FILE: &str = "apkforge.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid SDK component {0:?}")]
    Component(String),
}

/// Where to fetch the SDK command-line tools for each OS family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmdlineToolsSource {
    pub linux_url: String,
    pub macos_url: String,
    /// Expected SHA-256 of the Linux archive; unchecked when absent.
    pub linux_sha256: Option<String>,
    pub macos_sha256: Option<String>,
}

impl Default for CmdlineToolsSource {
    fn default() -> Self {
        Self {
            linux_url: "https://dl.google.com/android/repository/commandlinetools-linux-11076708_latest.zip"
                .to_string(),
            macos_url: "https://dl.google.com/android/repository/commandlinetools-mac-11076708_latest.zip"
                .to_string(),
            linux_sha256: None,
            macos_sha256: None,
        }
    }
}

impl CmdlineToolsSource {
    /// URL and optional checksum for `os`; None for unsupported families.
    pub fn for_os(&self, os: OsFamily) -> Option<(&str, Option<&str>)> {
        match os {
            OsFamily::Linux => Some((&self.linux_url, self.linux_sha256.as_deref())),
            OsFamily::Macos => Some((&self.macos_url, self.macos_sha256.as_deref())),
            OsFamily::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Android SDK installation root.
    pub sdk_root: PathBuf,
    /// Profile that receives the SDK exports; derived from `$SHELL` when unset.
    pub shell_profile: Option<PathBuf>,
    pub cmdline_tools: CmdlineToolsSource,
    /// `sdkmanager` identifiers installed by the provisioner.
    pub components: Vec<String>,
    /// Interpreter used for the version check and pip installs.
    pub python: String,
    /// Minimum interpreter as `major.minor`.
    pub min_python: String,
    pub min_disk_bytes: u64,
    pub descriptor_file: String,
    /// Main module the descriptor's `source.main` is expected to name.
    pub expected_main: String,
    /// Build cache, relative to the project unless absolute.
    pub cache_dir: PathBuf,
    /// Where the packaging tool leaves the APK, relative to the project.
    pub output_dir: PathBuf,
    pub packaging_tool: String,
    pub bridge_tool: String,
    /// Prefix system package installs with `sudo` when it is available.
    pub use_sudo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sdk_root: crate::paths::default_sdk_root(),
            shell_profile: None,
            cmdline_tools: CmdlineToolsSource::default(),
            components: DEFAULT_COMPONENTS.map(String::from).to_vec(),
            python: "python3".to_string(),
            min_python: "3.8".to_string(),
            min_disk_bytes: DISK_THRESHOLD_BYTES,
            descriptor_file: "buildozer.spec".to_string(),
            expected_main: "main.py".to_string(),
            cache_dir: PathBuf::from(".buildozer"),
            output_dir: PathBuf::from("bin"),
            packaging_tool: "buildozer".to_string(),
            bridge_tool: "adb".to_string(),
            use_sudo: true,
        }
    }
}

impl Settings {
    /// Load settings for a project directory, applying process environment overrides.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::from_project(project_dir)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Defaults merged with `<project>/apkforge.toml`, if present.
    pub fn from_project(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings: Self =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        settings.sdk_components()?;
        Ok(settings)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// `ANDROID_SDK_ROOT` wins over `APKFORGE_HOME`, so an SDK the operator
    /// already manages is reused instead of provisioning a second one.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(home) = non_empty("APKFORGE_HOME") {
            self.sdk_root = PathBuf::from(home).join("android-sdk");
        }
        if let Some(root) = non_empty("ANDROID_SDK_ROOT") {
            self.sdk_root = PathBuf::from(root);
        }
        if let Some(profile) = non_empty("APKFORGE_PROFILE") {
            self.shell_profile = Some(PathBuf::from(profile));
        }
    }

    /// Configured components, validated.
    pub fn sdk_components(&self) -> Result<Vec<SdkComponent>, ConfigError> {
        self.components
            .iter()
            .map(|id| SdkComponent::parse(id).ok_or_else(|| ConfigError::Component(id.clone())))
            .collect()
    }

    pub fn min_python_version(&self) -> (u64, u64) {
        apkforge_schema::version::parse_minimum(&self.min_python)
            .unwrap_or(apkforge_schema::MIN_INTERPRETER)
    }

    pub fn descriptor_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.descriptor_file)
    }

    pub fn cache_path(&self, project_dir: &Path) -> PathBuf {
        crate::paths::resolve_in(project_dir, &self.cache_dir)
    }

    pub fn output_path(&self, project_dir: &Path) -> PathBuf {
        crate::paths::resolve_in(project_dir, &self.output_dir)
    }

    /// Explicit profile, or the shell's default for `os`.
    pub fn profile_path(&self, os: OsFamily) -> Option<PathBuf> {
        self.shell_profile
            .clone()
            .or_else(|| crate::paths::default_shell_profile(os))
    }
}
