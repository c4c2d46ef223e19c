//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::automation::{AutomationRequest, RunReport};
use crate::config::AppConfig;
use crate::device::DeviceSummary;
use crate::error::TapError;
use crate::ledger::{DeviceRecord, LedgerRow, RefreshSummary};

use super::{LocateResult, Output, RobotFormat, ServerInfo};

/// JSON output implementation for AI agents and scripting.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn encode<T: Serialize + ?Sized>(&self, data: &T, pretty: bool) -> String {
        let encoded = if pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        encoded.unwrap_or_else(|e| {
            serde_json::json!({ "error": true, "message": format!("serialization failed: {e}") })
                .to_string()
        })
    }

    /// Output any serializable data as JSON to stdout.
    #[instrument(skip(self, data), fields(format = ?self.format))]
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = self.encode(data, matches!(self.format, RobotFormat::Json));
        trace!(json_len = json.len(), "JSON serialized");
        println!("{json}");
    }

    /// Output pretty JSON to stderr.
    #[instrument(skip(self, data))]
    fn output_json_pretty_stderr<T: Serialize>(&self, data: &T) {
        let json = self.encode(data, true);
        trace!(json_len = json.len(), "JSON error serialized");
        eprintln!("{json}");
    }
}

/// JSON body describing an error.
pub fn error_json(error: &TapError) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

impl Output for RobotOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Robot: success");
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &TapError) {
        debug!(error = %error, "Robot: error");
        self.output_json_pretty_stderr(&error_json(error));
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Robot: warning");
        self.output_json(&serde_json::json!({
            "warning": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Robot: info");
        self.output_json(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    #[instrument(skip(self, devices), fields(count = devices.len()))]
    fn device_list(&self, devices: &[DeviceSummary]) {
        debug!("Robot: device_list");
        self.output_json(devices);
    }

    #[instrument(skip(self, result), fields(found = result.found))]
    fn locate_result(&self, result: &LocateResult) {
        debug!("Robot: locate_result");
        self.output_json(result);
    }

    #[instrument(skip(self, request, report), fields(serial = %report.serial))]
    fn run_report(&self, request: &AutomationRequest, report: &RunReport) {
        debug!("Robot: run_report");
        self.output_json(&serde_json::json!({
            "ok": true,
            "device": request.serial,
            "report": report,
        }));
    }

    #[instrument(skip(self, info), fields(addr = %info.addr))]
    fn server_started(&self, info: &ServerInfo) {
        debug!("Robot: server_started");
        self.output_json(&serde_json::json!({
            "listening": info.addr,
            "template_dir": info.template_dir,
            "missing_templates": info.missing_templates,
        }));
    }

    #[instrument(skip(self, summary), fields(added = summary.added.len()))]
    fn ledger_refreshed(&self, summary: &RefreshSummary) {
        debug!("Robot: ledger_refreshed");
        self.output_json(summary);
    }

    #[instrument(skip(self, record, rows), fields(device = %record.device_id))]
    fn ledger_table(&self, record: &DeviceRecord, rows: &[LedgerRow]) {
        debug!("Robot: ledger_table");
        self.output_json(&serde_json::json!({
            "device_id": record.device_id,
            "device_name": record.device_name,
            "rows": rows,
        }));
    }

    #[instrument(skip(self, tables), fields(count = tables.len()))]
    fn ledger_tables(&self, tables: &[(&DeviceRecord, Vec<LedgerRow>)]) {
        debug!("Robot: ledger_tables");
        let tables: Vec<serde_json::Value> = tables
            .iter()
            .map(|(record, rows)| {
                serde_json::json!({
                    "device_id": record.device_id,
                    "device_name": record.device_name,
                    "rows": rows,
                })
            })
            .collect();
        self.output_json(&tables);
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    fn ledger_records(&self, records: &[DeviceRecord]) {
        debug!("Robot: ledger_records");
        self.output_json(records);
    }

    #[instrument(skip(self, config))]
    fn config_info(&self, config: &AppConfig, source: Option<&Path>) {
        debug!("Robot: config_info");
        self.output_json(&serde_json::json!({
            "source": source.map(|p| p.display().to_string()),
            "config": config,
        }));
    }

    #[instrument(skip(self))]
    fn config_path(&self, source: Option<&Path>) {
        debug!("Robot: config_path");
        self.output_json(&serde_json::json!({
            "path": source.map(|p| p.display().to_string()),
        }));
    }

    #[instrument(skip(self))]
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        debug!(version, ?git_sha, ?build_time, "Robot: version_info");
        self.output_json(&serde_json::json!({
            "version": version,
            "git_sha": git_sha,
            "build_time": build_time
        }));
    }

    #[instrument(skip(self))]
    fn newline(&self) {
        trace!("Robot: newline (no-op)");
    }
}
