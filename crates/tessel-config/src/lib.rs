//! Project configuration for tessel builds.
//!
//! This crate owns the configuration model consumed by the build pipeline:
//! the [`ProjectConfig`] value, its multi-source loading, validation, and
//! discovery of the local packages living next to the project sources.

pub mod discovery;
pub mod error;
pub mod packages;
pub mod project;
pub mod validation;

pub use discovery::{CONFIG_FILE_NAME, ENV_PREFIX, PACKAGE_JSON_FIELD, ConfigDiscovery};
pub use error::{ConfigError, Result};
pub use packages::{PackageInfo, discover_packages};
pub use project::ProjectConfig;
