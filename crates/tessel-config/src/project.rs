//! The project configuration model.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Project-wide build configuration.
///
/// Every path is relative to the project root unless it is absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Distribution directory
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Source subdirectory of the project root and of every package
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Directory holding local packages
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,

    /// Scratch directory for the production flow
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Bundle every compiled stylesheet into one file
    #[serde(default)]
    pub css_extract: bool,

    /// File name of the extracted stylesheet bundle
    #[serde(default = "default_out_css_file_name")]
    pub out_css_file_name: String,

    /// Named component entry points (name -> script entry path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_entries: Option<IndexMap<String, PathBuf>>,

    /// Emit `lib`/`es` next to the sources instead of `main`/`module`/`esm5`
    #[serde(default)]
    pub material_component: bool,

    /// Object injected into production entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_env: Option<Map<String, Value>>,

    /// Stylesheet source extension (without dot)
    #[serde(default = "default_style_extension")]
    pub style_extension: String,

    /// Compiled stylesheet extension (without dot)
    #[serde(default = "default_compiled_style_extension")]
    pub compiled_style_extension: String,

    /// Per-environment overrides, keyed by environment name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub profiles: IndexMap<String, Value>,
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from("packages")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from(".temp")
}

fn default_out_css_file_name() -> String {
    "index.css".to_string()
}

fn default_style_extension() -> String {
    "scss".to_string()
}

fn default_compiled_style_extension() -> String {
    "css".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            source_dir: default_source_dir(),
            packages_dir: default_packages_dir(),
            temp_dir: default_temp_dir(),
            css_extract: false,
            out_css_file_name: default_out_css_file_name(),
            component_entries: None,
            material_component: false,
            custom_env: None,
            style_extension: default_style_extension(),
            compiled_style_extension: default_compiled_style_extension(),
            profiles: IndexMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Absolute distribution directory.
    pub fn dist_root(&self, project_root: &Path) -> PathBuf {
        resolve(project_root, &self.dist_dir)
    }

    /// Absolute source directory of the project itself.
    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        resolve(project_root, &self.source_dir)
    }

    /// Absolute directory holding local packages.
    pub fn packages_root(&self, project_root: &Path) -> PathBuf {
        resolve(project_root, &self.packages_dir)
    }

    /// Absolute scratch directory.
    pub fn temp_root(&self, project_root: &Path) -> PathBuf {
        resolve(project_root, &self.temp_dir)
    }

    /// Component entries resolved against the project root, in declaration order.
    pub fn resolved_component_entries(&self, project_root: &Path) -> Vec<(String, PathBuf)> {
        self.component_entries
            .iter()
            .flatten()
            .map(|(name, path)| (name.clone(), resolve(project_root, path)))
            .collect()
    }

    /// Whether the project declares named component entries.
    pub fn has_component_entries(&self) -> bool {
        self.component_entries.is_some()
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
