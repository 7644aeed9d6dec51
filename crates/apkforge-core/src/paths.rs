use dirs::home_dir;
use std::path::{Path, PathBuf};

use apkforge_schema::OsFamily;

/// Returns the apkforge state directory, or None if the user's home cannot be resolved.
pub fn try_apkforge_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("APKFORGE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".apkforge"))
}

/// Default SDK root: ~/.apkforge/android-sdk
///
/// Falls back to a project-relative `.apkforge/android-sdk` when no home
/// directory exists (containers running as a nameless uid).
pub fn default_sdk_root() -> PathBuf {
    try_apkforge_home()
        .unwrap_or_else(|| PathBuf::from(".apkforge"))
        .join("android-sdk")
}

/// Shell profile that receives the SDK exports.
///
/// Follows `$SHELL` when it names zsh or bash; otherwise picks the login
/// shell's usual default for the platform.
pub fn default_shell_profile(os: OsFamily) -> Option<PathBuf> {
    let home = home_dir()?;
    let shell = std::env::var("SHELL").unwrap_or_default();
    Some(home.join(profile_file_name(os, &shell)))
}

fn profile_file_name(os: OsFamily, shell: &str) -> &'static str {
    let shell_name = Path::new(shell)
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or_default();

    match (shell_name, os) {
        ("zsh", _) => ".zshrc",
        ("bash", OsFamily::Macos) => ".bash_profile",
        ("bash", _) => ".bashrc",
        (_, OsFamily::Macos) => ".zshrc",
        _ => ".bashrc",
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_in(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_follows_shell() {
        assert_eq!(profile_file_name(OsFamily::Linux, "/usr/bin/zsh"), ".zshrc");
        assert_eq!(profile_file_name(OsFamily::Linux, "/bin/bash"), ".bashrc");
        assert_eq!(
            profile_file_name(OsFamily::Macos, "/bin/bash"),
            ".bash_profile"
        );
        assert_eq!(profile_file_name(OsFamily::Macos, ""), ".zshrc");
        assert_eq!(profile_file_name(OsFamily::Linux, "/usr/bin/fish"), ".bashrc");
    }

    #[test]
    fn test_resolve_in() {
        let base = Path::new("/work/app");
        assert_eq!(
            resolve_in(base, Path::new(".buildozer")),
            Path::new("/work/app/.buildozer")
        );
        assert_eq!(resolve_in(base, Path::new("/tmp/x")), Path::new("/tmp/x"));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://dl.google.com/android/repository/tools.zip"),
            "tools.zip"
        );
        assert_eq!(filename_from_url(""), "");
    }
}
