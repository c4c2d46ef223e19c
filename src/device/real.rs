//! `adb` subprocess implementation of [`DeviceBridge`].
//!
//! Each operation is one invocation of the bridge binary with discrete argv
//! entries; nothing is interpolated through a shell on the host side.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument, trace, warn};

use super::info::{DeviceSummary, parse_devices_output};
use super::{CommandStatus, DeviceBridge};
use crate::error::{Result, TapError};

/// Launcher intent category used to start a package.
pub const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";

/// Generic VIEW intent action used to open URLs.
pub const VIEW_ACTION: &str = "android.intent.action.VIEW";

/// Device bridge backed by the `adb` command-line tool.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: PathBuf,
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new("adb")
    }
}

impl AdbBridge {
    /// Create a bridge that invokes `program` (a name on `PATH` or a path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path or name of the bridge binary.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the bridge with `args` and report the exit status.
    fn run(&self, args: &[String]) -> CommandStatus {
        trace!(program = %self.program.display(), ?args, "Invoking device bridge");
        match Command::new(&self.program).args(args).output() {
            Ok(output) if output.status.success() => CommandStatus::Success,
            Ok(output) => {
                let code = output.status.code();
                debug!(
                    ?code,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Device bridge exited with failure"
                );
                CommandStatus::Failed { code }
            }
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "Failed to start device bridge");
                CommandStatus::SpawnFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Argument vector for a command run inside `adb -s SERIAL shell`.
pub(crate) fn shell_args(serial: &str, command: &[&str]) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string(), "shell".to_string()];
    args.extend(command.iter().map(|s| (*s).to_string()));
    args
}

pub(crate) fn launch_args(serial: &str, package: &str) -> Vec<String> {
    shell_args(
        serial,
        &["monkey", "-p", package, "-c", LAUNCHER_CATEGORY, "1"],
    )
}

pub(crate) fn open_url_args(serial: &str, url: &str) -> Vec<String> {
    shell_args(serial, &["am", "start", "-a", VIEW_ACTION, "-d", url])
}

pub(crate) fn screencap_args(serial: &str, remote_path: &str) -> Vec<String> {
    shell_args(serial, &["screencap", "-p", remote_path])
}

pub(crate) fn pull_args(serial: &str, remote_path: &str, local_path: &Path) -> Vec<String> {
    vec![
        "-s".to_string(),
        serial.to_string(),
        "pull".to_string(),
        remote_path.to_string(),
        local_path.display().to_string(),
    ]
}

pub(crate) fn tap_args(serial: &str, x: u32, y: u32) -> Vec<String> {
    shell_args(serial, &["input", "tap", &x.to_string(), &y.to_string()])
}

impl DeviceBridge for AdbBridge {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        let output = Command::new(&self.program)
            .arg("devices")
            .output()
            .map_err(|e| TapError::BridgeSpawn {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(TapError::BridgeCommand(format!(
                "'{} devices' exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let devices = parse_devices_output(&String::from_utf8_lossy(&output.stdout));
        debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    fn launch_app(&self, serial: &str, package: &str) -> CommandStatus {
        debug!(serial, package, "Launching app");
        self.run(&launch_args(serial, package))
    }

    fn open_url(&self, serial: &str, url: &str) -> CommandStatus {
        debug!(serial, url, "Opening URL");
        self.run(&open_url_args(serial, url))
    }

    fn capture_screen(&self, serial: &str, remote_path: &str) -> CommandStatus {
        self.run(&screencap_args(serial, remote_path))
    }

    fn pull(&self, serial: &str, remote_path: &str, local_path: &Path) -> CommandStatus {
        self.run(&pull_args(serial, remote_path, local_path))
    }

    fn tap(&self, serial: &str, x: u32, y: u32) -> CommandStatus {
        debug!(serial, x, y, "Tapping");
        self.run(&tap_args(serial, x, y))
    }
}
