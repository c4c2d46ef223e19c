//! The icon-tap automation loop.
//!
//! One run drives one device through a fixed, linear sequence:
//!
//! 1. launch the package (skipped when the package name is empty), wait
//! 2. open the URL through a VIEW intent, wait
//! 3. take a screenshot
//! 4. for each icon template in priority order: locate it; on a hit tap the
//!    center, wait and take a fresh screenshot; on a miss keep the current
//!    screenshot and move on
//!
//! Bridge exit statuses are ignored. Any error inside the run is logged with
//! the device serial and reported as `false`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::{error, info, info_span, instrument, warn};

use crate::config::{AutomationConfig, Timings};
use crate::device::{DeviceBridge, sanitize_serial};
use crate::error::Result;
use crate::locator::IconLocator;

/// What to run and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationRequest {
    /// Device serial as given by the caller.
    pub serial: String,
    /// Package to launch first; empty skips the launch.
    pub package: String,
    /// URL opened through the VIEW intent.
    pub url: String,
}

/// Result of trying one icon template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IconOutcome {
    Tapped { x: u32, y: u32, score: f32 },
    Missed,
}

/// Per-template entry of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconReport {
    pub icon: String,
    #[serde(flatten)]
    pub outcome: IconOutcome,
}

/// Step-by-step account of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Sanitized serial.
    pub serial: String,
    pub package: String,
    pub url: String,
    pub launched: bool,
    pub screenshots: u32,
    pub icons: Vec<IconReport>,
}

impl RunReport {
    /// Number of icons that were tapped.
    pub fn taps(&self) -> usize {
        self.icons
            .iter()
            .filter(|i| matches!(i.outcome, IconOutcome::Tapped { .. }))
            .count()
    }
}

/// A single automation run against one device.
///
/// The screenshot counter lives on the run, so two concurrent runs for the
/// same serial write the same file names.
pub struct AutomationRun {
    bridge: Arc<dyn DeviceBridge>,
    serial: String,
    package: String,
    url: String,
    template_dir: PathBuf,
    work_dir: PathBuf,
    icons: Vec<String>,
    locator: IconLocator,
    timings: Timings,
    screenshot_count: u32,
}

impl AutomationRun {
    /// Prepare a run. The serial is sanitized here and used sanitized for
    /// both bridge calls and file names.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured threshold is invalid.
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        request: &AutomationRequest,
        config: &AutomationConfig,
    ) -> Result<Self> {
        Ok(Self {
            bridge,
            serial: sanitize_serial(&request.serial),
            package: request.package.clone(),
            url: request.url.clone(),
            template_dir: config.template_dir.clone(),
            work_dir: config.work_dir.clone(),
            icons: config.icons.clone(),
            locator: IconLocator::new(config.threshold)?,
            timings: config.timings(),
            screenshot_count: 0,
        })
    }

    /// Override the settle delays.
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Sanitized serial used by this run.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Run to completion, reporting only success or failure.
    pub fn run(&mut self) -> bool {
        self.run_with_report().is_some()
    }

    /// Run to completion; `None` when the run failed (already logged).
    pub fn run_with_report(&mut self) -> Option<RunReport> {
        let span = info_span!("run", serial = %self.serial);
        let _enter = span.enter();

        match self.execute() {
            Ok(report) => {
                info!(taps = report.taps(), screenshots = report.screenshots, "Run complete");
                Some(report)
            }
            Err(e) => {
                error!(serial = %self.serial, error = format!("{e:#}"), "Run failed");
                None
            }
        }
    }

    fn execute(&mut self) -> anyhow::Result<RunReport> {
        let launched = !self.package.is_empty();
        if launched {
            info!(package = %self.package, "Launching app");
            self.bridge.launch_app(&self.serial, &self.package);
            pause(self.timings.launch_wait);
        }

        info!(url = %self.url, "Opening URL");
        self.bridge.open_url(&self.serial, &self.url);
        pause(self.timings.open_wait);

        let mut screenshot = self.take_screenshot()?;
        let mut icons = Vec::with_capacity(self.icons.len());

        for icon in self.icons.clone() {
            let template = self.template_dir.join(&icon);
            info!(icon = %icon, "Looking for icon");

            let outcome = match self.locator.locate_files(
                &screenshot,
                &template,
                Some(&self.debug_path()),
            ) {
                Some(found) => {
                    let (x, y) = found.center();
                    info!(icon = %icon, x, y, score = found.score, "Tapping icon");
                    self.bridge.tap(&self.serial, x, y);
                    pause(self.timings.tap_wait);
                    screenshot = self.take_screenshot()?;
                    IconOutcome::Tapped {
                        x,
                        y,
                        score: found.score,
                    }
                }
                None => IconOutcome::Missed,
            };
            icons.push(IconReport { icon, outcome });
        }

        Ok(RunReport {
            serial: self.serial.clone(),
            package: self.package.clone(),
            url: self.url.clone(),
            launched,
            screenshots: self.screenshot_count,
            icons,
        })
    }

    /// Capture and pull the next numbered screenshot; returns its local path.
    #[instrument(skip(self), fields(n = self.screenshot_count + 1))]
    fn take_screenshot(&mut self) -> anyhow::Result<PathBuf> {
        self.screenshot_count += 1;
        let filename = screenshot_name(&self.serial, self.screenshot_count);
        let remote = format!("/sdcard/{filename}");

        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("creating work dir {}", self.work_dir.display()))?;
        let local = self.work_dir.join(&filename);

        let status = self.bridge.screenshot(&self.serial, &remote, &local);
        if !status.is_success() {
            warn!(?status, path = %local.display(), "Screenshot pull failed");
        }
        Ok(local)
    }

    fn debug_path(&self) -> PathBuf {
        self.work_dir.join(format!("debug_{}.png", self.serial))
    }

    /// Directory receiving screenshots and debug images.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// File name of the `n`th screenshot of a run.
pub fn screenshot_name(serial: &str, n: u32) -> String {
    format!("screen_{serial}_{n}.png")
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
