//! Mock device bridge for testing.
//!
//! Records every operation and serves a scripted sequence of screen images
//! on `pull`, so the automation loop can run end to end without a device.
//!
//! # Example
//!
//! ```rust,ignore
//! use tapbot::device::mock::{MockBridge, Operation};
//! use tapbot::device::DeviceBridge;
//!
//! let bridge = MockBridge::new().with_screens(vec![screen]);
//! bridge.tap("emulator-5554", 120, 220);
//!
//! bridge.assert_operations(&[Operation::Tap {
//!     serial: "emulator-5554".to_string(),
//!     x: 120,
//!     y: 220,
//! }]);
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use tracing::{debug, trace};

use super::info::{DeviceState, DeviceSummary};
use super::{CommandStatus, DeviceBridge};
use crate::error::{Result, TapError};

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListDevices,
    LaunchApp {
        serial: String,
        package: String,
    },
    OpenUrl {
        serial: String,
        url: String,
    },
    CaptureScreen {
        serial: String,
        remote_path: String,
    },
    Pull {
        serial: String,
        remote_path: String,
        local_path: PathBuf,
    },
    Tap {
        serial: String,
        x: u32,
        y: u32,
    },
}

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Devices returned by `list_devices`.
    pub devices: Vec<DeviceSummary>,
    /// Make `list_devices` fail as if the bridge binary were missing.
    pub fail_listing: bool,
    /// Report every command as a non-zero exit (recorded all the same).
    pub fail_commands: bool,
}

/// Mock bridge for testing without real devices.
///
/// `pull` writes the next scripted screen to the local path as PNG; once
/// the script is exhausted the last screen is repeated. With no screens
/// configured, `pull` writes nothing and reports failure.
pub struct MockBridge {
    config: MockConfig,
    screens: Mutex<VecDeque<DynamicImage>>,
    last_screen: Mutex<Option<DynamicImage>>,
    operation_log: Mutex<Vec<Operation>>,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBridge {
    /// Create a mock with no devices and no screens.
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating mock bridge");
        Self {
            config: MockConfig::default(),
            screens: Mutex::new(VecDeque::new()),
            last_screen: Mutex::new(None),
            operation_log: Mutex::new(Vec::new()),
        }
    }

    /// Configure mock behavior.
    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Report these serials as attached (`device` state).
    #[must_use]
    pub fn with_devices(mut self, serials: &[&str]) -> Self {
        self.config.devices = serials
            .iter()
            .map(|s| DeviceSummary {
                serial: (*s).to_string(),
                state: DeviceState::Device,
            })
            .collect();
        self
    }

    /// Script the screens served by successive pulls.
    #[must_use]
    pub fn with_screens(self, screens: Vec<DynamicImage>) -> Self {
        *self.screens.lock().unwrap() = screens.into();
        self
    }

    // === Assertions ===

    /// All operations recorded so far.
    pub fn operations(&self) -> Vec<Operation> {
        self.operation_log.lock().unwrap().clone()
    }

    /// Only the taps recorded so far, as `(x, y)`.
    pub fn taps(&self) -> Vec<(u32, u32)> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::Tap { x, y, .. } => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    /// Number of `pull` operations recorded.
    pub fn pull_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, Operation::Pull { .. }))
            .count()
    }

    /// Assert the exact operation sequence.
    ///
    /// # Panics
    ///
    /// Panics if the recorded operations differ from `expected`.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(
            actual, expected,
            "operation log mismatch\n  actual: {actual:#?}\nexpected: {expected:#?}"
        );
    }

    fn record(&self, op: Operation) -> CommandStatus {
        trace!(?op, "Mock bridge operation");
        self.operation_log.lock().unwrap().push(op);
        self.status()
    }

    fn status(&self) -> CommandStatus {
        if self.config.fail_commands {
            CommandStatus::Failed { code: Some(1) }
        } else {
            CommandStatus::Success
        }
    }

    fn next_screen(&self) -> Option<DynamicImage> {
        let mut last = self.last_screen.lock().unwrap();
        if let Some(screen) = self.screens.lock().unwrap().pop_front() {
            *last = Some(screen);
        }
        last.clone()
    }
}

impl DeviceBridge for MockBridge {
    fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        self.operation_log
            .lock()
            .unwrap()
            .push(Operation::ListDevices);
        if self.config.fail_listing {
            return Err(TapError::BridgeSpawn {
                program: "mock".to_string(),
                reason: "listing disabled".to_string(),
            });
        }
        Ok(self.config.devices.clone())
    }

    fn launch_app(&self, serial: &str, package: &str) -> CommandStatus {
        self.record(Operation::LaunchApp {
            serial: serial.to_string(),
            package: package.to_string(),
        })
    }

    fn open_url(&self, serial: &str, url: &str) -> CommandStatus {
        self.record(Operation::OpenUrl {
            serial: serial.to_string(),
            url: url.to_string(),
        })
    }

    fn capture_screen(&self, serial: &str, remote_path: &str) -> CommandStatus {
        self.record(Operation::CaptureScreen {
            serial: serial.to_string(),
            remote_path: remote_path.to_string(),
        })
    }

    fn pull(&self, serial: &str, remote_path: &str, local_path: &Path) -> CommandStatus {
        let status = self.record(Operation::Pull {
            serial: serial.to_string(),
            remote_path: remote_path.to_string(),
            local_path: local_path.to_path_buf(),
        });
        if self.config.fail_commands {
            return status;
        }
        let Some(screen) = self.next_screen() else {
            return CommandStatus::Failed { code: Some(1) };
        };
        match screen.save_with_format(local_path, image::ImageFormat::Png) {
            Ok(()) => status,
            Err(e) => {
                debug!(path = %local_path.display(), error = %e, "Mock pull could not write screen");
                CommandStatus::Failed { code: Some(1) }
            }
        }
    }

    fn tap(&self, serial: &str, x: u32, y: u32) -> CommandStatus {
        self.record(Operation::Tap {
            serial: serial.to_string(),
            x,
            y,
        })
    }
}
