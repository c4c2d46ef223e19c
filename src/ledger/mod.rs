//! Device/package username ledger.
//!
//! A table of attached devices × a fixed package list, with a free-text
//! username per cell and a display name per device. Every change rewrites
//! the whole store. Records for devices that are no longer attached are
//! kept.

mod packages;
mod store;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{Result, TapError};

pub use packages::{load_packages, parse_packages};
pub use store::{DeviceRecord, JsonStore};

/// One row of the per-device table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRow {
    /// Device display name on the first row, empty after.
    pub device_name: String,
    pub package: String,
    pub username: String,
}

/// What a refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Devices seen for the first time.
    pub added: Vec<String>,
    /// Known devices that are not currently attached.
    pub stale: Vec<String>,
}

/// The ledger: package list, records, and their store.
#[derive(Debug)]
pub struct Ledger {
    store: JsonStore,
    packages: Vec<String>,
    records: Vec<DeviceRecord>,
}

impl Ledger {
    /// Load the package list and the stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the package list is missing or the store is
    /// unreadable.
    #[instrument(skip_all, fields(store = %store_path.display()))]
    pub fn open(store_path: &Path, packages_path: &Path) -> Result<Self> {
        let packages = load_packages(packages_path)?;
        let store = JsonStore::new(store_path);
        let records = store.load()?;
        Ok(Self::from_parts(store, packages, records))
    }

    /// Build a ledger from already-loaded parts.
    pub fn from_parts(store: JsonStore, packages: Vec<String>, records: Vec<DeviceRecord>) -> Self {
        Self {
            store,
            packages,
            records,
        }
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn record(&self, device: &str) -> Option<&DeviceRecord> {
        self.records.iter().find(|r| r.device_id == device)
    }

    fn record_mut(&mut self, device: &str) -> Result<&mut DeviceRecord> {
        self.records
            .iter_mut()
            .find(|r| r.device_id == device)
            .ok_or_else(|| TapError::DeviceNotFound {
                device: device.to_string(),
            })
    }

    /// Ensure a record with every package cell exists for each attached
    /// device, then persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn refresh(&mut self, devices: &[String]) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();

        for device in devices {
            if self.record(device).is_none() {
                self.records.push(DeviceRecord::new(device.clone()));
                summary.added.push(device.clone());
            }
            let packages = self.packages.clone();
            let record = self.record_mut(device)?;
            for package in packages {
                record.packages.entry(package).or_default();
            }
        }

        summary.stale = self
            .records
            .iter()
            .filter(|r| !devices.contains(&r.device_id))
            .map(|r| r.device_id.clone())
            .collect();

        info!(
            attached = devices.len(),
            added = summary.added.len(),
            stale = summary.stale.len(),
            "Ledger refreshed"
        );
        self.save()?;
        Ok(summary)
    }

    /// Store a trimmed username for (`device`, `package`).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or a package outside the
    /// list, or if the store cannot be written.
    pub fn set_user(&mut self, device: &str, package: &str, user: &str) -> Result<()> {
        if !self.packages.iter().any(|p| p == package) {
            return Err(TapError::UnknownPackage {
                package: package.to_string(),
            });
        }
        let user = user.trim().to_string();
        debug!(device, package, user = %user, "Setting user");
        self.record_mut(device)?
            .packages
            .insert(package.to_string(), user);
        self.save()
    }

    /// Set the display name; an empty (after trimming) name resets it to the
    /// device id.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device or if the store cannot be
    /// written.
    pub fn set_device_name(&mut self, device: &str, name: &str) -> Result<()> {
        let record = self.record_mut(device)?;
        let name = name.trim();
        record.device_name = if name.is_empty() {
            record.device_id.clone()
        } else {
            name.to_string()
        };
        debug!(device, name = %record.device_name, "Setting device name");
        self.save()
    }

    /// Table rows for `device`, in package-list order.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown device.
    pub fn rows(&self, device: &str) -> Result<Vec<LedgerRow>> {
        let record = self.record(device).ok_or_else(|| TapError::DeviceNotFound {
            device: device.to_string(),
        })?;
        Ok(self
            .packages
            .iter()
            .enumerate()
            .map(|(i, package)| LedgerRow {
                device_name: if i == 0 {
                    record.device_name.clone()
                } else {
                    String::new()
                },
                package: package.clone(),
                username: record.user(package).to_string(),
            })
            .collect())
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.records)
    }
}
