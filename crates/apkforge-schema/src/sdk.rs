//! Android SDK component identifiers and installation state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default pinned components: platform, build-tools, NDK.
pub const DEFAULT_COMPONENTS: [&str; 3] = [
    "platforms;android-33",
    "build-tools;33.0.2",
    "ndk;25.2.9519653",
];

/// An `sdkmanager` package identifier such as `build-tools;33.0.2`.
///
/// # Example
///
/// ```
/// use apkforge_schema::SdkComponent;
/// use std::path::Path;
///
/// let c = SdkComponent::parse("ndk;25.2.9519653").unwrap();
/// assert_eq!(c.install_dir(), Path::new("ndk").join("25.2.9519653"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SdkComponent(String);

impl SdkComponent {
    /// Parse an identifier; every `;`-separated segment must be non-empty.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() || id.split(';').any(str::is_empty) {
            return None;
        }
        Some(Self(id.to_string()))
    }

    /// The identifier as passed to `sdkmanager`.
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Directory the component lands in, relative to the SDK root.
    pub fn install_dir(&self) -> PathBuf {
        self.0.split(';').collect()
    }
}

impl std::fmt::Display for SdkComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SdkComponent {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid SDK component: {value:?}"))
    }
}

impl From<SdkComponent> for String {
    fn from(value: SdkComponent) -> Self {
        value.0
    }
}

/// What is known to be installed under an SDK root.
///
/// There is no metadata file: the provisioner rebuilds this from the
/// completion markers on disk and updates it as each step finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInstallation {
    pub root_path: PathBuf,
    pub cmdline_tools_present: bool,
    pub licenses_accepted: bool,
    pub installed_components: BTreeSet<SdkComponent>,
}

impl SdkInstallation {
    /// An installation with nothing recorded yet.
    pub fn empty(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            cmdline_tools_present: false,
            licenses_accepted: false,
            installed_components: BTreeSet::new(),
        }
    }

    /// Whether every component in `wanted` is recorded as installed.
    pub fn has_all<'a>(&self, wanted: impl IntoIterator<Item = &'a SdkComponent>) -> bool {
        wanted
            .into_iter()
            .all(|c| self.installed_components.contains(c))
    }

    /// Canonical command-line tools layout: `<root>/cmdline-tools/latest`.
    pub fn cmdline_tools_dir(&self) -> PathBuf {
        self.root_path.join("cmdline-tools").join("latest")
    }

    /// Path to the `sdkmanager` executable inside the canonical layout.
    pub fn sdkmanager_path(&self) -> PathBuf {
        self.cmdline_tools_dir().join("bin").join("sdkmanager")
    }
}
