use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::{BuildStream, PASS_CONCURRENCY, StreamKind};
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::fileset::{FileSet, RESOURCE_EXTENSIONS, STYLE_SOURCE_EXTENSIONS, SourceFile, SourceScope};

/// Copies static assets byte for byte.
pub struct ResourceStream {
    files: FileSet,
    out_dir: PathBuf,
}

impl ResourceStream {
    /// `include_style_sources` adds raw stylesheet sources to the selection,
    /// for targets whose consumers recompile styles themselves.
    pub fn new(
        ctx: &BuildContext,
        out_dir: impl Into<PathBuf>,
        whole_project: bool,
        source_path: Option<&Path>,
        scope_override: Option<&str>,
        include_style_sources: bool,
    ) -> Self {
        let scope = SourceScope::for_resources(whole_project, source_path, scope_override, ctx);
        let extensions = resource_extensions(ctx, include_style_sources);
        Self {
            files: FileSet::new(&scope, ctx, extensions.as_slice()),
            out_dir: out_dir.into(),
        }
    }

    async fn copy_file(&self, file: SourceFile) -> Result<()> {
        let target = self.out_dir.join(&file.relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::fs(parent, e))?;
        }
        tokio::fs::copy(&file.path, &target)
            .await
            .map_err(|e| BuildError::fs(&file.path, e))?;
        Ok(())
    }
}

/// Extensions selected by the resource mover.
pub fn resource_extensions(ctx: &BuildContext, include_style_sources: bool) -> Vec<String> {
    let mut extensions: Vec<String> = RESOURCE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
    if include_style_sources {
        let style = ctx.config().style_extension.as_str();
        for ext in STYLE_SOURCE_EXTENSIONS.iter().copied().chain([style]) {
            if !extensions.iter().any(|e| e == ext) {
                extensions.push(ext.to_string());
            }
        }
    }
    extensions
}

#[async_trait]
impl BuildStream for ResourceStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Resources
    }

    fn file_set(&self) -> &FileSet {
        &self.files
    }

    fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    async fn run_pass(&self, files: Vec<SourceFile>) -> Result<usize> {
        stream::iter(files)
            .map(|file| self.copy_file(file))
            .buffer_unordered(PASS_CONCURRENCY)
            .try_fold(0, |copied, ()| async move { Ok(copied + 1) })
            .await
    }
}
