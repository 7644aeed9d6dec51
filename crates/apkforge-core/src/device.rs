//! Deploy the built APK to attached devices over `adb`.

use std::path::Path;

use apkforge_schema::StageOutcome;

use crate::config::Settings;
use crate::error::StageError;
use crate::host::{Host, Invocation};
use crate::Reporter;

const USB_GUIDANCE: &str = "Enable USB debugging in Developer options, connect the device, \
and accept the authorization prompt; `adb devices` should list it as `device`";

/// One `adb devices` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDevice {
    pub serial: String,
    /// `device`, `unauthorized`, `offline`, ...
    pub state: String,
}

impl AttachedDevice {
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResult {
    pub serial: String,
    pub succeeded: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInstallOutcome {
    /// The bridge is not on `PATH`.
    BridgeMissing,
    /// Nothing in `device` state; lists serials waiting for authorization.
    NoDevices { unauthorized: Vec<String> },
    Installed(Vec<DeviceResult>),
}

impl DeviceInstallOutcome {
    /// Skipped when there was nothing to install to, Failed only when every
    /// target failed.
    pub fn stage_outcome(&self) -> StageOutcome {
        match self {
            Self::BridgeMissing | Self::NoDevices { .. } => StageOutcome::Skipped,
            Self::Installed(results) if results.iter().any(|r| r.succeeded) => {
                StageOutcome::Success
            }
            Self::Installed(_) => StageOutcome::Failed,
        }
    }

    /// One-line explanation for the run summary.
    pub fn detail(&self) -> String {
        match self {
            Self::BridgeMissing => "adb not found".to_string(),
            Self::NoDevices { unauthorized } if unauthorized.is_empty() => {
                "no devices attached".to_string()
            }
            Self::NoDevices { unauthorized } => {
                format!("{} device(s) unauthorized", unauthorized.len())
            }
            Self::Installed(results) => {
                let ok = results.iter().filter(|r| r.succeeded).count();
                format!("{ok}/{} device(s)", results.len())
            }
        }
    }
}

/// Parse `adb devices` output.
pub fn parse_devices(stdout: &str) -> Vec<AttachedDevice> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('*') && !l.starts_with("List of devices"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(AttachedDevice {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

pub fn install_to_device<H, R>(
    host: &H,
    artifact: &Path,
    settings: &Settings,
    reporter: &R,
) -> Result<DeviceInstallOutcome, StageError>
where
    H: Host + ?Sized,
    R: Reporter + ?Sized,
{
    let bridge = &settings.bridge_tool;
    let Some(adb) = host.which(bridge) else {
        reporter.warning(&format!(
            "{bridge} not found; install the Android platform tools to deploy to a device"
        ));
        return Ok(DeviceInstallOutcome::BridgeMissing);
    };
    let adb = adb.display().to_string();

    let listing = host
        .run(&Invocation::new(&adb).arg("devices"))
        .map_err(|e| StageError::tool(format!("{bridge} devices"), e.to_string()))?;
    if !listing.success() {
        return Err(StageError::tool(
            format!("{bridge} devices"),
            listing.diagnostic(),
        ));
    }

    let devices = parse_devices(&listing.stdout);
    let (ready, waiting): (Vec<_>, Vec<_>) = devices.into_iter().partition(AttachedDevice::is_ready);

    if ready.is_empty() {
        let unauthorized: Vec<String> = waiting
            .into_iter()
            .filter(|d| d.state == "unauthorized")
            .map(|d| d.serial)
            .collect();
        reporter.warning(&format!("No device ready for install. {USB_GUIDANCE}"));
        return Ok(DeviceInstallOutcome::NoDevices { unauthorized });
    }

    let artifact_arg = artifact.display().to_string();
    let mut results = Vec::with_capacity(ready.len());
    for device in ready {
        let invocation = Invocation::new(&adb).args([
            "-s",
            device.serial.as_str(),
            "install",
            "-r",
            artifact_arg.as_str(),
        ]);
        let result = match host.run(&invocation) {
            Ok(output) if output.success() => {
                reporter.success(&format!("Installed on {}", device.serial));
                DeviceResult {
                    serial: device.serial,
                    succeeded: true,
                    detail: "installed".to_string(),
                }
            }
            Ok(output) => failed_device(reporter, device.serial, output.diagnostic()),
            Err(e) => failed_device(reporter, device.serial, e.to_string()),
        };
        results.push(result);
    }

    Ok(DeviceInstallOutcome::Installed(results))
}

fn failed_device<R: Reporter + ?Sized>(reporter: &R, serial: String, detail: String) -> DeviceResult {
    tracing::warn!(serial = %serial, detail = %detail, "device install failed");
    reporter.error(&format!("Install on {serial} failed: {detail}"));
    DeviceResult {
        serial,
        succeeded: false,
        detail,
    }
}
