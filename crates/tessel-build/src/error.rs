//! Error types for build operations.

use std::path::{Path, PathBuf};

use tessel_config::ConfigError;

/// Errors raised while building a project.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The build was asked to do something the layout does not allow.
    #[error("Invalid build configuration: {0}")]
    Configuration(String),

    /// Loading or validating the project configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A script or stylesheet failed to compile.
    #[error("Failed to compile {}: {message}", .file.display())]
    Compilation { file: PathBuf, message: String },

    /// Reading or writing a file failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A registered hook rejected its input.
    #[error("Hook '{hook}' failed: {message}")]
    Pipeline { hook: String, message: String },

    /// The bundler backing component styles or the production build failed.
    #[error("Bundler error: {0}")]
    Bundler(String),

    /// The file watcher could not be started.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Wrap an I/O error with the path it happened at.
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn compilation(file: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Compilation {
            file: file.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a bundler error from a Rolldown diagnostic batch.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Self::Bundler(format!("{error:?}"))
    }

    /// Stable machine-readable code of the error category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Compilation { .. } => "COMPILATION_ERROR",
            Self::Filesystem { .. } => "FILESYSTEM_ERROR",
            Self::Pipeline { .. } => "PIPELINE_ERROR",
            Self::Bundler(_) => "BUNDLER_ERROR",
            Self::Watch(_) => "WATCH_ERROR",
        }
    }

    /// Whether the error comes from configuration rather than from the sources.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Config(_))
    }
}
