//! Application configuration loaded from YAML or TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use super::path::{PathResolver, validate_image_path};
use crate::error::{Result, TapError};
use crate::locator::DEFAULT_THRESHOLD;
use crate::server::DEFAULT_RUN_HISTORY;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tapbot.toml";

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// HTTP trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Finished runs kept in memory for `/runs`.
    pub run_history: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            run_history: DEFAULT_RUN_HISTORY,
        }
    }
}

/// Automation loop settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutomationConfig {
    /// Device bridge binary.
    pub adb_path: PathBuf,
    /// Directory holding the icon templates.
    pub template_dir: PathBuf,
    /// Directory receiving screenshots and debug images.
    pub work_dir: PathBuf,
    /// Icon template file names, in priority order.
    pub icons: Vec<String>,
    /// Minimum correlation score for a match (inclusive).
    pub threshold: f32,
    pub launch_wait_ms: u64,
    pub open_wait_ms: u64,
    pub tap_wait_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            template_dir: PathBuf::from("templates"),
            work_dir: PathBuf::from("."),
            icons: vec![
                "gioHang.png".to_string(),
                "moRong.png".to_string(),
                "them.png".to_string(),
            ],
            threshold: DEFAULT_THRESHOLD,
            launch_wait_ms: 3000,
            open_wait_ms: 8000,
            tap_wait_ms: 2000,
        }
    }
}

/// Settle delays inserted after device actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub launch_wait: Duration,
    pub open_wait: Duration,
    pub tap_wait: Duration,
}

impl Timings {
    /// No waiting at all (tests, dry environments).
    pub const fn none() -> Self {
        Self {
            launch_wait: Duration::ZERO,
            open_wait: Duration::ZERO,
            tap_wait: Duration::ZERO,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        AutomationConfig::default().timings()
    }
}

impl AutomationConfig {
    pub const fn timings(&self) -> Timings {
        Timings {
            launch_wait: Duration::from_millis(self.launch_wait_ms),
            open_wait: Duration::from_millis(self.open_wait_ms),
            tap_wait: Duration::from_millis(self.tap_wait_ms),
        }
    }

    /// Full paths of the icon templates, in priority order.
    pub fn template_paths(&self) -> Vec<PathBuf> {
        self.icons.iter().map(|i| self.template_dir.join(i)).collect()
    }

    /// Templates that are missing or not readable as images.
    pub fn missing_templates(&self) -> Vec<PathBuf> {
        self.template_paths()
            .into_iter()
            .filter(|p| validate_image_path(p).is_err())
            .collect()
    }
}

/// Device/package ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// JSON document store file.
    pub store: PathBuf,
    /// Package list, one name per line.
    pub packages: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from("device_data.json"),
            packages: PathBuf::from("packages.txt"),
        }
    }
}

/// Complete application configuration.
///
/// # Example TOML
///
/// ```toml
/// [server]
/// port = 5000
///
/// [automation]
/// template_dir = "templates"
/// icons = ["gioHang.png", "moRong.png", "them.png"]
/// threshold = 0.8
///
/// [ledger]
/// store = "device_data.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub automation: AutomationConfig,
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Validate value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is outside `(0, 1]`, the icon list
    /// is empty, or the port is zero.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.automation.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(TapError::InvalidThreshold { value: threshold });
        }
        if self.automation.icons.is_empty() {
            return Err(TapError::ConfigInvalid(
                "automation.icons must list at least one template".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(TapError::ConfigInvalid(
                "server.port must be non-zero".to_string(),
            ));
        }
        debug!("Configuration validated");
        Ok(())
    }

    /// Rewrite relative paths against `resolver`'s base directory.
    ///
    /// `adb_path` is only rewritten when it names a path (contains a
    /// separator), so a bare `adb` is still looked up on `PATH`.
    fn resolve_paths(&mut self, resolver: &PathResolver) -> Result<()> {
        let auto = &mut self.automation;
        auto.template_dir = resolver.resolve(&auto.template_dir)?;
        auto.work_dir = resolver.resolve(&auto.work_dir)?;
        if auto.adb_path.components().count() > 1 || auto.adb_path.starts_with("~") {
            auto.adb_path = resolver.resolve(&auto.adb_path)?;
        }
        self.ledger.store = resolver.resolve(&self.ledger.store)?;
        self.ledger.packages = resolver.resolve(&self.ledger.packages)?;
        Ok(())
    }

    /// Load the configuration for this invocation.
    ///
    /// With `explicit` set, that file must exist. Otherwise
    /// [`DEFAULT_CONFIG_FILE`] is used if present, else built-in defaults.
    /// Returns the config and the file it came from.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or any file fails to
    /// parse or validate.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((load_config(path)?, Some(path.to_path_buf())));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Ok((load_config(default_path)?, Some(default_path.to_path_buf())));
        }
        debug!("No configuration file, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok((config, None))
    }
}

/// Load a configuration file, resolving relative paths against its
/// directory.
///
/// # Errors
///
/// Returns an error if:
/// - The format cannot be detected from the extension
/// - The file cannot be read
/// - The file content cannot be parsed
/// - Validation fails
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        TapError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })?;

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TapError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            TapError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), format = ?format, "Read config file");

    let mut config = load_config_from_str(&content, format)?;
    config.resolve_paths(&PathResolver::new(path)?)?;
    Ok(config)
}

/// Parse and validate configuration content. Paths are left as written.
///
/// # Errors
///
/// Returns an error if parsing or validation fails.
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<AppConfig> {
    let config: AppConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| TapError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| TapError::ConfigParse(format!("TOML: {e}")))?
        }
    };
    config.validate()?;
    Ok(config)
}
