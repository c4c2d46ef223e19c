//! Error types for tapbot operations.

use thiserror::Error;

/// Primary error type for tapbot operations.
#[derive(Error, Debug)]
pub enum TapError {
    // Device bridge errors
    #[error("Failed to run device bridge '{program}': {reason}")]
    BridgeSpawn { program: String, reason: String },

    #[error("Device bridge command failed: {0}")]
    BridgeCommand(String),

    // Image errors
    #[error("Image file not found: {path}")]
    ImageNotFound { path: String },

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Invalid match threshold {value}: must be in (0, 1]")]
    InvalidThreshold { value: f32 },

    // Automation errors
    #[error("Automation run failed on device {serial}")]
    RunFailed { serial: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Ledger errors
    #[error("Package list not found: {path}")]
    PackagesNotFound { path: String },

    #[error("Device not in ledger: {device}")]
    DeviceNotFound { device: String },

    #[error("Package '{package}' is not in the package list")]
    UnknownPackage { package: String },

    #[error("Ledger store is corrupt ({path}): {reason}")]
    StoreCorrupt { path: String, reason: String },

    // Web server errors
    #[error("Web server failed to start on {addr}: {reason}")]
    WebServerFailed { addr: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TapError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BridgeSpawn { .. }
                | Self::ImageNotFound { .. }
                | Self::InvalidThreshold { .. }
                | Self::ConfigNotFound { .. }
                | Self::PackagesNotFound { .. }
                | Self::DeviceNotFound { .. }
                | Self::UnknownPackage { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BridgeSpawn { .. } => {
                Some("Install Android platform-tools or set automation.adb_path")
            }
            Self::ImageNotFound { .. } => Some("Check the image path"),
            Self::InvalidThreshold { .. } => Some("Use a value such as 0.8"),
            Self::RunFailed { .. } => Some("Re-run with -v to see which step failed"),
            Self::ConfigNotFound { .. } => Some("Create tapbot.toml or pass --config"),
            Self::PackagesNotFound { .. } => {
                Some("Create packages.txt with one package name per line")
            }
            Self::DeviceNotFound { .. } => Some("Run: tapbot ledger refresh"),
            Self::UnknownPackage { .. } => Some("Add the package to packages.txt"),
            Self::WebServerFailed { .. } => Some("Choose another port with --port"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using TapError.
pub type Result<T> = std::result::Result<T, TapError>;
