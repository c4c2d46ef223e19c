//! Device listing types for the `adb devices` output.

use serde::Serialize;

/// Connection state reported by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Online and ready for commands.
    Device,
    /// Connected but debugging not yet authorized.
    Unauthorized,
    /// Known to the server but not responding.
    Offline,
    /// Any other state string (`recovery`, `sideload`, ...).
    Other(String),
}

impl DeviceState {
    fn parse(state: &str) -> Self {
        match state {
            "device" => Self::Device,
            "unauthorized" => Self::Unauthorized,
            "offline" => Self::Offline,
            other => Self::Other(other.to_string()),
        }
    }

    /// State as printed by `adb devices`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Device => "device",
            Self::Unauthorized => "unauthorized",
            Self::Offline => "offline",
            Self::Other(state) => state,
        }
    }
}

/// One row of `adb devices` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    /// Device serial as reported by the bridge (not sanitized).
    pub serial: String,
    /// Connection state.
    pub state: DeviceState,
}

/// Parse the output of `adb devices`.
///
/// Skips the header line, daemon start-up chatter (`* daemon ...`) and blank
/// lines.
pub fn parse_devices_output(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('*'))
        .filter(|line| !line.to_lowercase().starts_with("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?;
            let state = tokens.next()?;
            Some(DeviceSummary {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}
