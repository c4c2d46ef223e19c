//! Device bridge abstraction for Android devices.
//!
//! This module provides a trait-based abstraction over the `adb` command-line
//! tool and a recording mock, so the automation loop can be exercised without
//! hardware.

mod info;
pub mod mock;
mod real;

pub use info::{DeviceState, DeviceSummary, parse_devices_output};
pub use real::AdbBridge;

use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Outcome of a single bridge command, by process exit status only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    /// Exit status zero.
    Success,
    /// Non-zero exit, or killed by a signal (`code` is `None`).
    Failed { code: Option<i32> },
    /// The bridge binary could not be started at all.
    SpawnFailed { reason: String },
}

impl CommandStatus {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Core device bridge operations.
///
/// Every method except [`list_devices`](DeviceBridge::list_devices) reports
/// only an exit status; callers in the automation loop ignore it.
///
/// # Implementation Notes
///
/// - Serials are passed through unchanged; sanitize them with
///   [`sanitize_serial`] before calling.
/// - Implementations must be shareable across run threads.
pub trait DeviceBridge: Send + Sync {
    /// List devices known to the bridge, in any state.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge cannot be started or exits non-zero.
    fn list_devices(&self) -> Result<Vec<DeviceSummary>>;

    /// Launch a package through its launcher intent.
    fn launch_app(&self, serial: &str, package: &str) -> CommandStatus;

    /// Open a URL through a generic VIEW intent.
    fn open_url(&self, serial: &str, url: &str) -> CommandStatus;

    /// Capture the screen into a file on the device.
    fn capture_screen(&self, serial: &str, remote_path: &str) -> CommandStatus;

    /// Copy a file from the device to the local filesystem.
    fn pull(&self, serial: &str, remote_path: &str, local_path: &Path) -> CommandStatus;

    /// Send a tap at screen coordinates.
    fn tap(&self, serial: &str, x: u32, y: u32) -> CommandStatus;

    /// Capture the screen and pull it to `local_path`.
    ///
    /// Returns the status of the pull; a failed capture is logged and the
    /// pull is still attempted.
    fn screenshot(&self, serial: &str, remote_path: &str, local_path: &Path) -> CommandStatus {
        let capture = self.capture_screen(serial, remote_path);
        if !capture.is_success() {
            tracing::warn!(serial, ?capture, "Screen capture failed");
        }
        self.pull(serial, remote_path, local_path)
    }

    /// Serials of devices in the `device` state.
    ///
    /// # Errors
    ///
    /// Propagates [`list_devices`](DeviceBridge::list_devices) errors.
    fn attached_serials(&self) -> Result<Vec<String>> {
        Ok(self
            .list_devices()?
            .into_iter()
            .filter(|d| d.state == DeviceState::Device)
            .map(|d| d.serial)
            .collect())
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// The result is safe to embed in local and on-device file names.
pub fn sanitize_serial(serial: &str) -> String {
    serial
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
