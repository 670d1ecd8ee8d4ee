//! Writing bundler output to disk.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;
use serde::Serialize;

use crate::error::{BuildError, Result};

/// One file written by a bundler pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedFile {
    /// Path relative to the output directory
    pub name: String,
    pub size: u64,
    pub is_entry: bool,
}

impl EmittedFile {
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Write every chunk and asset of `output` below `dir`.
pub(crate) async fn write_bundle(output: &BundleOutput, dir: &Path) -> Result<Vec<EmittedFile>> {
    let dir = dir.clean();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| BuildError::fs(&dir, e))?;

    let mut written = Vec::with_capacity(output.assets.len());
    for item in &output.assets {
        let (filename, bytes, is_entry) = match item {
            Output::Chunk(chunk) => (chunk.filename.as_str(), chunk.code.as_bytes(), chunk.is_entry),
            Output::Asset(asset) => (asset.filename.as_str(), asset.source.as_bytes(), false),
        };
        let target = validate_output_path(&dir, filename)?;
        write_file(&target, bytes).await?;
        written.push(EmittedFile {
            name: filename.to_string(),
            size: bytes.len() as u64,
            is_entry,
        });
    }
    Ok(written)
}

/// Create parent directories and write `bytes` to `path`.
pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BuildError::fs(parent, e))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| BuildError::fs(path, e))
}

/// Join `filename` onto `base_dir`, rejecting names that escape it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(BuildError::Bundler(format!(
            "output name contains a null byte: {filename:?}"
        )));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) {
        return Err(BuildError::Bundler(format!(
            "output '{}' escapes output directory '{}'",
            filename,
            base_dir.display()
        )));
    }
    Ok(full_path)
}
