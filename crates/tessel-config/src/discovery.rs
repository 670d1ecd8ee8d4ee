//! Multi-source configuration loading.
//!
//! Priority, lowest to highest: built-in defaults, `tessel.config.json`,
//! the `tessel` field of `package.json`, the `profiles.<env>` override and
//! finally `TESSEL_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::project::ProjectConfig;

/// Default configuration file name at the project root.
pub const CONFIG_FILE_NAME: &str = "tessel.config.json";

/// Field of `package.json` that may carry the configuration.
pub const PACKAGE_JSON_FIELD: &str = "tessel";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "TESSEL_";

/// Locates and loads the configuration of one project.
///
/// # Example
///
/// ```no_run
/// use tessel_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load("prod").unwrap();
/// println!("dist: {}", config.dist_dir.display());
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
    explicit: Option<PathBuf>,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            explicit: None,
        }
    }

    /// Use an explicit config file instead of `tessel.config.json`.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Path of the config file that would be loaded, if any.
    pub fn find(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        let default_path = self.root.join(CONFIG_FILE_NAME);
        default_path.exists().then_some(default_path)
    }

    /// Load configuration for the given environment (`"dev"`, `"prod"`, ...).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` when an explicit config file is missing,
    /// and `ConfigError::InvalidValue` when the merged sources do not describe a
    /// valid [`ProjectConfig`].
    pub fn load(&self, env: &str) -> Result<ProjectConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(ProjectConfig::default()));
        let mut profiles = Vec::new();

        if let Some(path) = self.find() {
            if !path.exists() {
                return Err(ConfigError::NotFound(path));
            }
            tracing::debug!(path = %path.display(), "loading config file");
            profiles.push(profile_of(&read_json(&path)?, env));
            figment = figment.merge(Json::file(&path));
        }

        let package_json = self.root.join("package.json");
        if package_json.exists() {
            if let Some(section) = read_package_section(&package_json)? {
                tracing::debug!("merging '{}' field of package.json", PACKAGE_JSON_FIELD);
                profiles.push(profile_of(&section, env));
                figment = figment.merge(Serialized::defaults(section));
            }
        }

        for profile in profiles.into_iter().flatten() {
            figment = figment.merge(Serialized::defaults(profile));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .lowercase(false)
                .map(|key| env_key_to_field(key.as_str()).into()),
        );

        figment
            .extract::<ProjectConfig>()
            .map_err(|e| ConfigError::invalid("configuration", e.to_string()))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_package_section(path: &Path) -> Result<Option<Value>> {
    let value = read_json(path)?;
    match value.get(PACKAGE_JSON_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(section @ Value::Object(_)) => Ok(Some(strip_profiles(section.clone()))),
        Some(_) => Err(ConfigError::invalid(
            PACKAGE_JSON_FIELD,
            "the package.json field must be an object",
        )),
    }
}

fn profile_of(section: &Value, env: &str) -> Option<Value> {
    section
        .get("profiles")
        .and_then(|profiles| profiles.get(env))
        .filter(|profile| profile.is_object())
        .cloned()
}

fn strip_profiles(mut section: Value) -> Value {
    if let Value::Object(map) = &mut section {
        map.remove("profiles");
    }
    section
}

/// `DIST_DIR` -> `distDir`
fn env_key_to_field(key: &str) -> String {
    let mut field = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = !field.is_empty();
        } else if upper_next {
            field.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            field.extend(ch.to_lowercase());
        }
    }
    field
}
