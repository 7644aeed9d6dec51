//! Host abstraction over subprocesses, `PATH` lookup, and disk space.
//!
//! Stages never call `std::process` directly. They describe what to run as an
//! [`Invocation`] and hand it to a [`Host`]; the exit code in the returned
//! [`ToolOutput`] is the only success signal.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use apkforge_schema::OsFamily;

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    /// Inherit stdio instead of capturing it.
    pub passthrough: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            stdin: None,
            passthrough: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }

    /// File name of the program, for messages.
    pub fn tool_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or(&self.program)
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What a finished command left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// None when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-empty stderr line, or the exit status.
    pub fn diagnostic(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{status}: {}", line.trim()),
            None => status,
        }
    }
}

pub trait Host: Send + Sync {
    fn os(&self) -> OsFamily;

    /// Resolve `program` on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Free bytes on the volume holding `path`, when it can be determined.
    fn available_space(&self, path: &Path) -> Option<u64>;

    /// Run to completion. `Err` means the process could not be started.
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// The real machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn os(&self) -> OsFamily {
        OsFamily::current()
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn available_space(&self, path: &Path) -> Option<u64> {
        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let disks = sysinfo::Disks::new_with_refreshed_list();

        disks
            .list()
            .iter()
            .filter(|d| target.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(sysinfo::Disk::available_space)
    }

    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        tracing::debug!(command = %invocation, "running");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for (key, value) in &invocation.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let start = Instant::now();

        if invocation.passthrough {
            if invocation.stdin.is_some() {
                cmd.stdin(Stdio::piped());
            }
            let mut child = cmd.spawn()?;
            feed_stdin(&mut child, invocation.stdin.as_deref())?;
            let status = child.wait()?;
            return Ok(ToolOutput {
                code: status.code(),
                stdout: String::new(),
                stderr: String::new(),
                duration: start.elapsed(),
            });
        }

        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        feed_stdin(&mut child, invocation.stdin.as_deref())?;
        let output = child.wait_with_output()?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}

fn feed_stdin(child: &mut std::process::Child, input: Option<&str>) -> io::Result<()> {
    let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) else {
        return Ok(());
    };
    match stdin.write_all(input.as_bytes()) {
        // The child may stop reading early (e.g. once every license is answered)
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("/sdk/cmdline-tools/latest/bin/sdkmanager")
            .arg("--sdk_root=/sdk")
            .arg("ndk;25.2.9519653");
        assert_eq!(inv.tool_name(), "sdkmanager");
        assert_eq!(
            inv.to_string(),
            "/sdk/cmdline-tools/latest/bin/sdkmanager --sdk_root=/sdk ndk;25.2.9519653"
        );
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let out = ToolOutput {
            code: Some(2),
            stdout: String::new(),
            stderr: "warning: x\nE: Unable to locate package foo\n\n".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(out.diagnostic(), "exit status 2: E: Unable to locate package foo");

        let silent = ToolOutput {
            stderr: String::new(),
            ..out
        };
        assert_eq!(silent.diagnostic(), "exit status 2");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_host_captures_output_and_stdin() {
        let host = SystemHost;
        let out = host
            .run(&Invocation::new("sh").arg("-c").arg("read line; echo got:$line; exit 3").stdin("y\n"))
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "got:y");
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let err = SystemHost
            .run(&Invocation::new("apkforge-definitely-not-a-real-tool"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
