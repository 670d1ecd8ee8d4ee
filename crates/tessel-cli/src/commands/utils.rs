//! Shared utilities for command implementations.

use std::path::{Path, PathBuf};

use tessel_config::{CONFIG_FILE_NAME, ConfigDiscovery, ProjectConfig};

use crate::cli::GlobalArgs;
use crate::error::{CliError, Result, ResultExt};

/// Resolve a path relative to a working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Find the project root.
///
/// An explicit `--cwd` must be an existing directory. Otherwise the nearest
/// ancestor of the current directory holding a config file wins, then the
/// nearest one holding a `package.json`, then the current directory itself.
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;

    if let Some(dir) = explicit {
        let dir = resolve_path(dir, &current);
        let meta = std::fs::metadata(&dir).with_path(&dir)?;
        if !meta.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "--cwd is not a directory: {}",
                dir.display()
            )));
        }
        return Ok(dir);
    }

    Ok(find_upwards(&current, CONFIG_FILE_NAME)
        .or_else(|| find_upwards(&current, "package.json"))
        .unwrap_or(current))
}

fn find_upwards(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .map(Path::to_path_buf)
}

/// Load the project configuration for `env`, honouring `--config`.
pub fn load_config(root: &Path, global: &GlobalArgs, env: &str) -> Result<ProjectConfig> {
    let mut discovery = ConfigDiscovery::new(root);
    if let Some(file) = &global.config {
        discovery = discovery.with_config_file(resolve_path(file, root));
    }
    let config = discovery.load(env)?;
    tracing::debug!(root = %root.display(), env, "configuration loaded");
    Ok(config)
}
