use std::path::PathBuf;

use async_trait::async_trait;
use tokio::task;

use super::{StyleCompiler, StyleInput};
use crate::error::{BuildError, Result};

/// Compiles Sass sources with `grass`.
///
/// `grass` is synchronous, so compilation runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SassStyleCompiler;

impl SassStyleCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StyleCompiler for SassStyleCompiler {
    async fn compile(&self, input: StyleInput<'_>) -> Result<String> {
        let path = input.path.to_path_buf();
        let load_paths: Vec<PathBuf> = input.include_paths.to_vec();

        task::spawn_blocking(move || {
            let options = load_paths
                .iter()
                .fold(grass::Options::default(), |options, p| options.load_path(p));
            grass::from_path(&path, &options)
                .map_err(|e| BuildError::compilation(&path, e.to_string()))
        })
        .await
        .map_err(|e| BuildError::compilation(input.path, format!("compiler task failed: {e}")))?
    }
}
