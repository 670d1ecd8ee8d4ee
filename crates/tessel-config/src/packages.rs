//! Discovery of local packages under the packages directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A local package built alongside (or instead of) the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    /// Declared `name` from the package's `package.json`
    pub name: String,
    /// Package root directory
    pub root_path: PathBuf,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_path: root_path.into(),
        }
    }

    /// The package's declared source root.
    pub fn source_root(&self, source_dir: &Path) -> PathBuf {
        self.root_path.join(source_dir)
    }
}

#[derive(Deserialize)]
struct PackageManifest {
    name: Option<String>,
}

/// Discover every package directory that carries a named `package.json`.
///
/// Results are sorted by directory name so builds are reproducible. A missing
/// packages directory yields an empty list.
///
/// # Errors
///
/// Returns `ConfigError::Json` when a manifest is not valid JSON.
pub fn discover_packages(packages_root: &Path) -> Result<Vec<PackageInfo>> {
    if !packages_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(packages_root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut packages = Vec::new();
    for dir in dirs {
        let manifest_path = dir.join("package.json");
        if !manifest_path.is_file() {
            continue;
        }
        let content = fs::read_to_string(&manifest_path)?;
        let manifest: PackageManifest =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: manifest_path.clone(),
                source,
            })?;

        match manifest.name {
            Some(name) if !name.is_empty() => packages.push(PackageInfo::new(name, dir)),
            _ => tracing::debug!(dir = %dir.display(), "skipping package without a name"),
        }
    }

    Ok(packages)
}
