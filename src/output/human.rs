//! Human-friendly output implementation using console.

use std::path::Path;

use console::Term;
use tracing::{debug, instrument, trace};

use crate::automation::{AutomationRequest, IconOutcome, RunReport};
use crate::config::AppConfig;
use crate::device::{DeviceState, DeviceSummary};
use crate::error::TapError;
use crate::ledger::{DeviceRecord, LedgerRow, RefreshSummary};
use crate::theme::TapTheme;

use super::{LocateResult, Output, ServerInfo};

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    out: Term,
    err: Term,
    theme: TapTheme,
}

impl HumanOutput {
    #[instrument]
    pub fn new(color: bool) -> Self {
        debug!("Creating HumanOutput");
        if !color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: TapTheme::default(),
        }
    }

    fn line(&self, text: &str) {
        if let Err(e) = self.out.write_line(text) {
            trace!(error = %e, "stdout write failed");
        }
    }

    fn err_line(&self, text: &str) {
        if let Err(e) = self.err.write_line(text) {
            trace!(error = %e, "stderr write failed");
        }
    }

    fn field(&self, name: &str, value: &str) {
        self.line(&format!(
            "  {}{}",
            self.theme.label.apply_to(format!("{name:<14}")),
            self.theme.value.apply_to(value)
        ));
    }

    fn header(&self, text: &str) {
        self.line(&self.theme.header.apply_to(text).to_string());
    }
}

impl Output for HumanOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Outputting success");
        self.line(&format!(
            "{} {message}",
            self.theme.success.clone().bold().apply_to("[OK]")
        ));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &TapError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        self.err_line("");
        self.err_line(&format!(
            "  {} {}",
            self.theme.error.clone().bold().apply_to("[ERR]"),
            console::style(error.to_string()).bold()
        ));
        if let Some(suggestion) = error.suggestion() {
            trace!(suggestion, "Adding suggestion");
            self.err_line("");
            self.err_line(&format!("  {}", self.theme.label.apply_to("Suggestion:")));
            self.err_line(&format!("  {}", self.theme.muted.apply_to(suggestion)));
        }
        self.err_line("");
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Outputting warning");
        self.line(&format!(
            "{} {message}",
            self.theme.warning.clone().bold().apply_to("[WARN]")
        ));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Outputting info");
        self.line(&format!(
            "{} {message}",
            self.theme.accent.clone().bold().apply_to("[INFO]")
        ));
    }

    #[instrument(skip(self, devices), fields(device_count = devices.len()))]
    fn device_list(&self, devices: &[DeviceSummary]) {
        debug!("Outputting device list");
        if devices.is_empty() {
            self.warning("No Android devices attached");
            return;
        }
        self.header("Attached Devices:");
        for device in devices {
            let state = match device.state {
                DeviceState::Device => self.theme.success.apply_to(device.state.as_str()),
                _ => self.theme.warning.apply_to(device.state.as_str()),
            };
            self.line(&format!(
                "  {:<24} {state}",
                self.theme.device_serial.apply_to(&device.serial)
            ));
        }
    }

    #[instrument(skip(self, result), fields(found = result.found))]
    fn locate_result(&self, result: &LocateResult) {
        debug!("Outputting locate result");
        let Some(found) = result.matched else {
            self.warning(&format!(
                "Icon {} not found (threshold {})",
                result.template.display(),
                result.threshold
            ));
            return;
        };
        let (cx, cy) = found.center();
        self.success(&format!(
            "Found {} at {}",
            result.template.display(),
            self.theme.coordinate.apply_to(format!("({cx}, {cy})"))
        ));
        self.field("Box", &format!("{}x{} at ({}, {})", found.width, found.height, found.x, found.y));
        self.field("Score", &format!("{:.4}", found.score));
        if let Some(debug_image) = &result.debug_image {
            self.field("Debug image", &debug_image.display().to_string());
        }
    }

    #[instrument(skip(self, request, report), fields(serial = %report.serial))]
    fn run_report(&self, request: &AutomationRequest, report: &RunReport) {
        debug!("Outputting run report");
        self.header(&format!("Run on {}", request.serial));
        if report.launched {
            self.field("Launched", &report.package);
        }
        self.field("Opened", &report.url);
        for icon in &report.icons {
            let outcome = match icon.outcome {
                IconOutcome::Tapped { x, y, score } => format!(
                    "tapped {} (score {score:.3})",
                    self.theme.coordinate.apply_to(format!("({x}, {y})"))
                ),
                IconOutcome::Missed => self.theme.missed.apply_to("not found").to_string(),
            };
            self.line(&format!("  {:<16}{outcome}", icon.icon));
        }
        self.field("Screenshots", &report.screenshots.to_string());
        self.success(&format!("{} of {} icons tapped", report.taps(), report.icons.len()));
    }

    #[instrument(skip(self, info), fields(addr = %info.addr))]
    fn server_started(&self, info: &ServerInfo) {
        debug!("Outputting server start");
        self.success(&format!("Listening on http://{}", info.addr));
        self.field("Templates", &info.template_dir.display().to_string());
        for missing in &info.missing_templates {
            self.warning(&format!("Template missing: {}", missing.display()));
        }
        self.line(&format!(
            "  {}",
            self.theme.muted.apply_to("POST /run_bot {device_name, package_name, video_url}")
        ));
    }

    #[instrument(skip(self, summary))]
    fn ledger_refreshed(&self, summary: &RefreshSummary) {
        debug!("Outputting ledger refresh");
        for device in &summary.added {
            self.info(&format!("Added {device}"));
        }
        for device in &summary.stale {
            self.line(&format!(
                "  {} {}",
                self.theme.device_serial.apply_to(device),
                self.theme.muted.apply_to("(not attached)")
            ));
        }
        self.success(&format!(
            "Ledger refreshed: {} new, {} not attached",
            summary.added.len(),
            summary.stale.len()
        ));
    }

    #[instrument(skip(self, record, rows), fields(device = %record.device_id))]
    fn ledger_table(&self, record: &DeviceRecord, rows: &[LedgerRow]) {
        debug!("Outputting ledger table");
        self.header(&format!("{} ({})", record.device_name, record.device_id));
        let package_width = rows.iter().map(|r| r.package.len()).max().unwrap_or(0);
        for row in rows {
            let user = if row.username.is_empty() {
                self.theme.missed.apply_to("-").to_string()
            } else {
                self.theme.value.apply_to(&row.username).to_string()
            };
            self.line(&format!("  {:<package_width$}  {user}", row.package));
        }
    }

    #[instrument(skip(self, tables), fields(count = tables.len()))]
    fn ledger_tables(&self, tables: &[(&DeviceRecord, Vec<LedgerRow>)]) {
        if tables.is_empty() {
            self.warning("Ledger is empty; run `tapbot ledger refresh`");
            return;
        }
        for (record, rows) in tables {
            self.ledger_table(record, rows);
            self.newline();
        }
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    fn ledger_records(&self, records: &[DeviceRecord]) {
        debug!("Outputting ledger records");
        if records.is_empty() {
            self.warning("Ledger is empty; run `tapbot ledger refresh`");
            return;
        }
        for record in records {
            let assigned = record.packages.values().filter(|u| !u.is_empty()).count();
            self.line(&format!(
                "  {:<24} {:<24} {}",
                self.theme.device_serial.apply_to(&record.device_id),
                record.device_name,
                self.theme
                    .muted
                    .apply_to(format!("{assigned}/{} assigned", record.packages.len()))
            ));
        }
    }

    #[instrument(skip(self, config))]
    fn config_info(&self, config: &AppConfig, source: Option<&Path>) {
        debug!("Outputting config");
        let source = source.map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());
        self.header(&format!("Configuration: {source}"));
        self.field("Listen", &format!("{}:{}", config.server.bind, config.server.port));
        self.field("Run history", &config.server.run_history.to_string());
        self.field("adb", &config.automation.adb_path.display().to_string());
        self.field("Templates", &config.automation.template_dir.display().to_string());
        self.field("Icons", &config.automation.icons.join(", "));
        self.field("Threshold", &config.automation.threshold.to_string());
        self.field("Work dir", &config.automation.work_dir.display().to_string());
        self.field(
            "Waits (ms)",
            &format!(
                "launch {}, open {}, tap {}",
                config.automation.launch_wait_ms,
                config.automation.open_wait_ms,
                config.automation.tap_wait_ms
            ),
        );
        self.field("Ledger", &config.ledger.store.display().to_string());
        self.field("Packages", &config.ledger.packages.display().to_string());
    }

    #[instrument(skip(self))]
    fn config_path(&self, source: Option<&Path>) {
        match source {
            Some(path) => self.line(&path.display().to_string()),
            None => self.info("No configuration file; using defaults"),
        }
    }

    #[instrument(skip(self))]
    fn version_info(&self, version: &str, git_sha: Option<&str>, build_time: Option<&str>) {
        debug!(version, ?git_sha, ?build_time, "Outputting version info");
        self.header("tapbot");
        self.field("Version", version);
        if let Some(sha) = git_sha {
            let dirty =
                sha.contains("dirty") || matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"));
            let clean_sha = sha.replace("(dirty)", "").trim().to_string();
            if dirty {
                self.field("Git SHA", &format!("{clean_sha} (dirty)"));
            } else {
                self.field("Git SHA", &clean_sha);
            }
        }
        if let Some(time) = build_time {
            self.field("Built", time);
        }
        if let Some(rustc) = option_env!("VERGEN_RUSTC_SEMVER") {
            self.field("Rust", rustc);
        }
        if let Some(target) = option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
            self.field("Target", target);
        }
    }

    #[instrument(skip(self))]
    fn newline(&self) {
        self.line("");
    }
}
