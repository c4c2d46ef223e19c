//! JSON document store for device records.
//!
//! The whole table is one JSON array. Every save rewrites the file: the new
//! content goes to a temporary file beside the target, which is then renamed
//! over it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, TapError};

/// One device row group: display name plus a username per package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub device_name: String,
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

impl DeviceRecord {
    /// New record named after its id, with no package cells.
    pub fn new(device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        Self {
            device_name: device_id.clone(),
            device_id,
            packages: BTreeMap::new(),
        }
    }

    /// Username for `package`, empty if unset.
    pub fn user(&self, package: &str) -> &str {
        self.packages.get(package).map_or("", String::as_str)
    }
}

/// File-backed record store.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::StoreCorrupt`] if the file is not a JSON array of
    /// records.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<DeviceRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store file absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<DeviceRecord> =
            serde_json::from_str(&content).map_err(|e| TapError::StoreCorrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(count = records.len(), "Loaded records");
        Ok(records)
    }

    /// Replace the stored table with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or renamed.
    #[instrument(skip(self, records), fields(path = %self.path.display(), count = records.len()))]
    pub fn save(&self, records: &[DeviceRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| TapError::Other(format!("Failed to encode records: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        debug!("Saved records");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
