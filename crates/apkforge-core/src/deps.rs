//! Native and Python dependency installation.
//!
//! Idempotency is left to the package managers: reinstalling an installed
//! package is a no-op for apt, yum, brew, and pip alike.

use apkforge_schema::{EnvironmentReport, PackageManager};

use crate::config::Settings;
use crate::error::StageError;
use crate::host::{Host, Invocation};
use crate::Reporter;

const APT_PACKAGES: &[&str] = &[
    "git",
    "zip",
    "unzip",
    "openjdk-17-jdk",
    "python3-pip",
    "autoconf",
    "libtool",
    "pkg-config",
    "zlib1g-dev",
    "libncurses5-dev",
    "libncursesw5-dev",
    "cmake",
    "libffi-dev",
    "libssl-dev",
];

const YUM_PACKAGES: &[&str] = &[
    "git",
    "zip",
    "unzip",
    "java-17-openjdk-devel",
    "python3-pip",
    "autoconf",
    "libtool",
    "pkgconfig",
    "zlib-devel",
    "ncurses-devel",
    "cmake",
    "libffi-devel",
    "openssl-devel",
];

const BREW_PACKAGES: &[&str] = &[
    "openjdk@17",
    "autoconf",
    "automake",
    "libtool",
    "pkg-config",
    "cmake",
];

/// Pinned Python packages for the packaging tool.
pub const PYTHON_PACKAGES: &[&str] = &["buildozer==1.5.0", "cython==0.29.36"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub package_manager: PackageManager,
    pub native_packages: Vec<String>,
    pub python_packages: Vec<String>,
}

/// Native package list for a manager; empty for [`PackageManager::None`].
pub fn native_packages(pm: PackageManager) -> &'static [&'static str] {
    match pm {
        PackageManager::Apt => APT_PACKAGES,
        PackageManager::Yum => YUM_PACKAGES,
        PackageManager::Brew => BREW_PACKAGES,
        PackageManager::None => &[],
    }
}

pub fn install_dependencies<H, R>(
    host: &H,
    report: &EnvironmentReport,
    settings: &Settings,
    reporter: &R,
) -> Result<InstallOutcome, StageError>
where
    H: Host + ?Sized,
    R: Reporter + ?Sized,
{
    let pm = report.package_manager;
    let Some(exe) = pm.executable() else {
        return Err(StageError::UnsupportedPackageManager);
    };
    let packages = native_packages(pm);

    let sudo = pm.needs_root() && settings.use_sudo && host.which("sudo").is_some();
    let command = |args: &[&str]| {
        let base = if sudo {
            Invocation::new("sudo").arg(exe)
        } else {
            Invocation::new(exe)
        };
        base.args(args.iter().copied()).passthrough()
    };

    if pm == PackageManager::Apt {
        reporter.info("Refreshing package lists");
        run_checked(host, &command(&["update"]), exe)?;
    }

    reporter.info(&format!("Installing {} system packages with {pm}", packages.len()));
    let mut install_args = vec!["install"];
    if pm != PackageManager::Brew {
        install_args.push("-y");
    }
    install_args.extend_from_slice(packages);
    run_checked(host, &command(&install_args), exe)?;

    reporter.info("Installing Python build tooling");
    let pip = Invocation::new(&settings.python)
        .args(["-m", "pip", "install", "--user", "--upgrade"])
        .args(PYTHON_PACKAGES.iter().copied())
        .passthrough();
    run_checked(host, &pip, "pip")?;

    Ok(InstallOutcome {
        package_manager: pm,
        native_packages: packages.iter().map(|p| (*p).to_string()).collect(),
        python_packages: PYTHON_PACKAGES.iter().map(|p| (*p).to_string()).collect(),
    })
}

fn run_checked<H: Host + ?Sized>(
    host: &H,
    invocation: &Invocation,
    tool: &str,
) -> Result<(), StageError> {
    let output = host
        .run(invocation)
        .map_err(|e| StageError::tool(tool, e.to_string()))?;
    if output.success() {
        Ok(())
    } else {
        Err(StageError::tool(tool, output.diagnostic()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::ScriptedHost;
    use crate::sdk::tests::report_for;
    use crate::NullReporter;
    use apkforge_schema::{FailureKind, OsFamily};

    fn report(pm: PackageManager) -> EnvironmentReport {
        EnvironmentReport {
            package_manager: pm,
            ..report_for(OsFamily::Linux)
        }
    }

    #[test]
    fn test_apt_updates_then_installs_with_sudo() {
        let host = ScriptedHost::new(OsFamily::Linux).with_tools(&["sudo"]);
        let outcome = install_dependencies(
            &host,
            &report(PackageManager::Apt),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap();

        let commands = host.commands();
        assert_eq!(commands[0], "sudo apt-get update");
        assert!(commands[1].starts_with("sudo apt-get install -y git zip unzip openjdk-17-jdk"));
        assert_eq!(
            commands[2],
            "python3 -m pip install --user --upgrade buildozer==1.5.0 cython==0.29.36"
        );
        assert!(outcome.native_packages.contains(&"libssl-dev".to_string()));
    }

    #[test]
    fn test_yum_without_sudo() {
        let host = ScriptedHost::new(OsFamily::Linux);
        install_dependencies(
            &host,
            &report(PackageManager::Yum),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap();

        let commands = host.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("yum install -y git zip unzip java-17-openjdk-devel"));
    }

    #[test]
    fn test_brew_never_uses_sudo() {
        let host = ScriptedHost::new(OsFamily::Macos).with_tools(&["sudo"]);
        let report = EnvironmentReport {
            package_manager: PackageManager::Brew,
            ..report_for(OsFamily::Macos)
        };
        install_dependencies(&host, &report, &Settings::default(), &NullReporter).unwrap();
        assert_eq!(
            host.commands()[0],
            "brew install openjdk@17 autoconf automake libtool pkg-config cmake"
        );
    }

    #[test]
    fn test_use_sudo_false() {
        let host = ScriptedHost::new(OsFamily::Linux).with_tools(&["sudo"]);
        let settings = Settings {
            use_sudo: false,
            ..Settings::default()
        };
        install_dependencies(&host, &report(PackageManager::Apt), &settings, &NullReporter)
            .unwrap();
        assert_eq!(host.commands()[0], "apt-get update");
    }

    #[test]
    fn test_no_package_manager() {
        let host = ScriptedHost::new(OsFamily::Linux);
        let err = install_dependencies(
            &host,
            &report(PackageManager::None),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap_err();
        assert!(matches!(err, StageError::UnsupportedPackageManager));
        assert_eq!(err.kind(), FailureKind::PrerequisiteMissing);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_failed_install_names_tool() {
        let host = ScriptedHost::new(OsFamily::Linux).respond("apt-get", Some("install"), 100, "");
        let err = install_dependencies(
            &host,
            &report(PackageManager::Apt),
            &Settings::default(),
            &NullReporter,
        )
        .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExternalToolFailure);
        assert!(err.to_string().starts_with("apt-get failed: exit status 100"));
        // pip never ran
        assert_eq!(host.calls().len(), 2);
    }
}
