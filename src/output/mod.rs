//! Output mode abstraction for robot and human output.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::automation::{AutomationRequest, RunReport};
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::device::DeviceSummary;
use crate::error::TapError;
use crate::ledger::{DeviceRecord, LedgerRow, RefreshSummary};
use crate::locator::IconMatch;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Result of a `locate` command.
#[derive(Debug, Clone, Serialize)]
pub struct LocateResult {
    pub screen: PathBuf,
    pub template: PathBuf,
    pub threshold: f32,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<(u32, u32)>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matched: Option<IconMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_image: Option<PathBuf>,
}

impl LocateResult {
    #[must_use]
    pub fn new(screen: &Path, template: &Path, threshold: f32, matched: Option<IconMatch>) -> Self {
        Self {
            screen: screen.to_path_buf(),
            template: template.to_path_buf(),
            threshold,
            found: matched.is_some(),
            center: matched.as_ref().map(IconMatch::center),
            matched,
            debug_image: None,
        }
    }

    #[must_use]
    pub fn with_debug_image(mut self, path: Option<&Path>) -> Self {
        if self.found {
            self.debug_image = path.map(Path::to_path_buf);
        }
        self
    }
}

/// Startup details of the trigger server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub addr: String,
    pub template_dir: PathBuf,
    pub missing_templates: Vec<PathBuf>,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug)]
pub enum OutputMode {
    /// JSON output for AI agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human { color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                color: !cli.no_color,
            }
        }
    }

    /// Returns true if output should be JSON.
    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color } => Box::new(HumanOutput::new(color)),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &TapError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    // Devices
    fn device_list(&self, devices: &[DeviceSummary]);

    // Automation
    fn locate_result(&self, result: &LocateResult);
    fn run_report(&self, request: &AutomationRequest, report: &RunReport);
    fn server_started(&self, info: &ServerInfo);

    // Ledger
    fn ledger_refreshed(&self, summary: &RefreshSummary);
    fn ledger_table(&self, record: &DeviceRecord, rows: &[LedgerRow]);
    /// Every device's table as one document.
    fn ledger_tables(&self, tables: &[(&DeviceRecord, Vec<LedgerRow>)]);
    fn ledger_records(&self, records: &[DeviceRecord]);

    // Configuration and metadata
    fn config_info(&self, config: &AppConfig, source: Option<&Path>);
    fn config_path(&self, source: Option<&Path>);
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>);

    fn newline(&self);
}
