use std::path::Path;

use rustc_hash::FxHashSet;
use walkdir::WalkDir;

use super::{StreamKind, StreamSummary};
use crate::compilers::ComponentBundleRequest;
use crate::context::BuildContext;
use crate::error::{BuildError, Result};

/// Build one stylesheet per component entry.
///
/// Runs the component bundler into `primary`, deletes everything there except
/// `<entry>.css`, then copies what is left into `secondary`.
pub async fn build_component_styles(
    ctx: &BuildContext,
    primary: &Path,
    secondary: &Path,
) -> Result<StreamSummary> {
    let config = ctx.config();
    let entries = config.resolved_component_entries(ctx.project_root());
    if entries.is_empty() {
        return Err(BuildError::Configuration(
            "component styles requested without component entries".to_string(),
        ));
    }

    let include_paths = vec![ctx.dependency_dir()];
    let written = ctx
        .engines()
        .components
        .bundle(ComponentBundleRequest {
            project_root: ctx.project_root(),
            entries: &entries,
            out_dir: primary,
            include_paths: &include_paths,
            style_extension: &config.style_extension,
        })
        .await?;
    tracing::debug!(entries = entries.len(), files = written.len(), "component bundle finished");

    let expected: FxHashSet<String> = entries
        .iter()
        .map(|(name, _)| format!("{name}.{}", config.compiled_style_extension))
        .collect();

    let kept = retain_only(primary, &expected).await?;
    for name in expected.iter().filter(|name| !kept.contains(*name)) {
        tracing::warn!(file = %name, "component bundler produced no stylesheet");
    }

    copy_dir(primary, secondary).await?;

    Ok(StreamSummary {
        kind: StreamKind::ComponentStyles,
        out_dir: primary.to_path_buf(),
        files_written: kept.len(),
    })
}

/// Delete every top-level entry of `dir` not named in `keep`.
async fn retain_only(dir: &Path, keep: &FxHashSet<String>) -> Result<FxHashSet<String>> {
    let mut kept = FxHashSet::default();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(kept),
        Err(e) => return Err(BuildError::fs(dir, e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(|e| BuildError::fs(dir, e))? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = entry.file_type().await.map_err(|e| BuildError::fs(&path, e))?;

        if file_type.is_file() && keep.contains(&name) {
            kept.insert(name);
            continue;
        }

        let removed = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        removed.map_err(|e| BuildError::fs(&path, e))?;
        tracing::trace!(path = %path.display(), "removed component bundle artifact");
    }
    Ok(kept)
}

/// Copy the contents of `from` into `to`, preserving relative paths.
async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::create_dir_all(to)
        .await
        .map_err(|e| BuildError::fs(to, e))?;

    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| from.to_path_buf(), Path::to_path_buf);
            BuildError::fs(path, e.into_io_error().unwrap_or_else(|| std::io::Error::other("walk failed")))
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target)
                .await
                .map_err(|e| BuildError::fs(&target, e))?;
        } else {
            tokio::fs::copy(entry.path(), &target)
                .await
                .map_err(|e| BuildError::fs(entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn retain_only_removes_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("Button.css"), "a{}").unwrap();
        fs::write(root.join("Button.js"), "x").unwrap();
        fs::create_dir_all(root.join("chunks")).unwrap();
        fs::write(root.join("chunks/shared.js"), "y").unwrap();

        let keep: FxHashSet<String> = ["Button.css".to_string()].into_iter().collect();
        let kept = retain_only(root, &keep).await.unwrap();

        assert_eq!(kept, keep);
        let names: Vec<_> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["Button.css"]);
    }

    #[tokio::test]
    async fn copy_dir_mirrors_contents() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("main");
        let to = dir.path().join("module");
        fs::create_dir_all(from.join("nested")).unwrap();
        fs::write(from.join("A.css"), "a{}").unwrap();
        fs::write(from.join("nested/B.css"), "b{}").unwrap();

        copy_dir(&from, &to).await.unwrap();
        assert_eq!(fs::read_to_string(to.join("A.css")).unwrap(), "a{}");
        assert_eq!(fs::read_to_string(to.join("nested/B.css")).unwrap(), "b{}");
    }
}
