//! The fixed package list, one package name per line.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, TapError};

/// Parse package-list text: lines are trimmed, blank lines skipped.
pub fn parse_packages(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load the package list from `path`.
///
/// # Errors
///
/// Returns [`TapError::PackagesNotFound`] if the file does not exist.
pub fn load_packages(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TapError::PackagesNotFound {
                path: path.display().to_string(),
            }
        } else {
            TapError::Io(e)
        }
    })?;
    let packages = parse_packages(&content);
    debug!(path = %path.display(), count = packages.len(), "Loaded package list");
    Ok(packages)
}
