//! SDK environment variables and the shell-profile export block.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

const BEGIN: &str = "# >>> apkforge android sdk >>>";
const END: &str = "# <<< apkforge android sdk <<<";

/// Environment an SDK root implies for child processes and login shells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkEnv {
    pub root: PathBuf,
}

impl SdkEnv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directories that go on `PATH`, in order.
    pub fn path_entries(&self) -> [PathBuf; 2] {
        [
            self.root.join("cmdline-tools").join("latest").join("bin"),
            self.root.join("platform-tools"),
        ]
    }

    /// Variables for a child process, with `PATH` built on top of `current_path`.
    pub fn vars(&self, current_path: Option<OsString>) -> Vec<(String, String)> {
        let root = self.root.display().to_string();
        let mut paths: Vec<PathBuf> = self.path_entries().into();
        if let Some(current) = current_path {
            paths.extend(std::env::split_paths(&current));
        }
        let path = std::env::join_paths(paths)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        vec![
            ("ANDROID_SDK_ROOT".to_string(), root.clone()),
            ("ANDROID_HOME".to_string(), root),
            ("PATH".to_string(), path),
        ]
    }

    /// The marker-delimited export block, ending in a newline.
    pub fn profile_block(&self) -> String {
        let root = self.root.display();
        let [bin, platform_tools] = self.path_entries();
        format!(
            "{BEGIN}\nexport ANDROID_SDK_ROOT=\"{root}\"\nexport ANDROID_HOME=\"$ANDROID_SDK_ROOT\"\nexport PATH=\"$PATH:{}:{}\"\n{END}\n",
            bin.display(),
            platform_tools.display()
        )
    }
}

/// Insert or replace the apkforge block in `profile`. Returns whether the
/// file changed.
pub fn upsert_block(profile: &Path, block: &str) -> io::Result<bool> {
    let existing = match std::fs::read_to_string(profile) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let updated = splice(&existing, block);
    if updated == existing {
        return Ok(false);
    }

    if let Some(parent) = profile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(profile, updated)?;
    tracing::debug!(profile = %profile.display(), "updated shell profile");
    Ok(true)
}

/// Drop every apkforge block from `existing` and put `block` where the first
/// complete one was, or at the end. A begin marker with no end marker before
/// the next begin marker is stale: only that line goes, never the lines after it.
fn splice(existing: &str, block: &str) -> String {
    let lines: Vec<&str> = existing.split_inclusive('\n').collect();
    let is = |line: &str, marker: &str| line.trim_end() == marker;

    let mut kept = String::with_capacity(existing.len() + block.len());
    let mut insert_at = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is(line, BEGIN) {
            let close = lines[i + 1..]
                .iter()
                .position(|l| is(*l, END) || is(*l, BEGIN))
                .map(|offset| i + 1 + offset)
                .filter(|&j| is(lines[j], END));
            match close {
                Some(j) => {
                    insert_at.get_or_insert(kept.len());
                    i = j + 1;
                }
                None => i += 1,
            }
            continue;
        }
        if !is(line, END) {
            kept.push_str(line);
        }
        i += 1;
    }

    match insert_at {
        Some(at) => {
            kept.insert_str(at, block);
            kept
        }
        None if kept.is_empty() => block.to_string(),
        None if kept.ends_with('\n') => format!("{kept}\n{block}"),
        None => format!("{kept}\n\n{block}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_block_contents() {
        let block = SdkEnv::new("/home/u/.apkforge/android-sdk").profile_block();
        assert!(block.starts_with(BEGIN));
        assert!(block.contains("export ANDROID_SDK_ROOT=\"/home/u/.apkforge/android-sdk\""));
        assert!(block.contains("export ANDROID_HOME="));
        assert!(block.contains("/home/u/.apkforge/android-sdk/cmdline-tools/latest/bin"));
        assert!(block.contains("/home/u/.apkforge/android-sdk/platform-tools"));
        assert!(block.trim_end().ends_with(END));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join(".bashrc");
        std::fs::write(&profile, "alias ll='ls -l'").unwrap();
        let block = SdkEnv::new("/sdk").profile_block();

        assert!(upsert_block(&profile, &block).unwrap());
        assert!(!upsert_block(&profile, &block).unwrap());

        let content = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(content.matches(BEGIN).count(), 1);
        assert!(content.starts_with("alias ll='ls -l'\n\n"));
    }

    #[test]
    fn test_upsert_replaces_stale_block() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join(".zshrc");
        let old = SdkEnv::new("/old/sdk").profile_block();
        std::fs::write(&profile, format!("export A=1\n\n{old}export B=2\n")).unwrap();

        let new = SdkEnv::new("/new/sdk").profile_block();
        assert!(upsert_block(&profile, &new).unwrap());

        let content = std::fs::read_to_string(&profile).unwrap();
        assert!(!content.contains("/old/sdk"));
        assert!(content.contains("/new/sdk"));
        assert!(content.starts_with("export A=1\n"));
        assert!(content.ends_with("export B=2\n"));
        assert_eq!(content.matches(END).count(), 1);
    }

    #[test]
    fn test_orphaned_begin_marker_keeps_user_lines() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join(".bashrc");
        std::fs::write(
            &profile,
            format!("{BEGIN}\nexport OLD=1\nalias keep_me='echo hi'\n"),
        )
        .unwrap();
        let block = SdkEnv::new("/sdk").profile_block();

        assert!(upsert_block(&profile, &block).unwrap());
        let second = std::fs::read_to_string(&profile).unwrap();
        assert!(second.contains("alias keep_me='echo hi'"));
        assert_eq!(second.matches(BEGIN).count(), 1);

        assert!(!upsert_block(&profile, &block).unwrap());
        let third = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(third, second);
        assert!(third.contains("alias keep_me='echo hi'"));
    }

    #[test]
    fn test_stray_end_marker_is_dropped() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join(".zshrc");
        std::fs::write(&profile, format!("export A=1\n{END}\nexport B=2\n")).unwrap();
        let block = SdkEnv::new("/sdk").profile_block();

        assert!(upsert_block(&profile, &block).unwrap());
        let content = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(content, format!("export A=1\nexport B=2\n\n{block}"));
        assert!(!upsert_block(&profile, &block).unwrap());
    }

    #[test]
    fn test_upsert_creates_missing_profile() {
        let dir = tempdir().unwrap();
        let profile = dir.path().join(".bash_profile");
        assert!(upsert_block(&profile, "x\n").unwrap());
        assert_eq!(std::fs::read_to_string(&profile).unwrap(), "x\n");
    }

    #[test]
    fn test_vars_prepend_sdk_dirs() {
        let env = SdkEnv::new("/sdk");
        let vars = env.vars(Some(OsString::from("/usr/bin")));
        let path = &vars.iter().find(|(k, _)| k == "PATH").unwrap().1;
        assert!(path.starts_with("/sdk/cmdline-tools/latest/bin"));
        assert!(path.ends_with("/usr/bin"));
        assert!(vars.contains(&("ANDROID_HOME".to_string(), "/sdk".to_string())));
    }
}
