use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::{BuildStream, PASS_CONCURRENCY, StreamKind};
use crate::compilers::{ScriptCompiler, ScriptInput};
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::fileset::{FileSet, SCRIPT_EXTENSIONS, SourceFile, SourceScope};
use crate::options::ScriptOptions;
use crate::output::write_file;

/// Compiles every selected script to `<out_dir>/<relative>.js`.
pub struct ScriptStream {
    files: FileSet,
    out_dir: PathBuf,
    options: ScriptOptions,
    compiler: Arc<dyn ScriptCompiler>,
}

impl ScriptStream {
    pub fn new(
        ctx: &BuildContext,
        out_dir: impl Into<PathBuf>,
        options: ScriptOptions,
        whole_project: bool,
        source_path: Option<&Path>,
    ) -> Self {
        let scope = SourceScope::for_scripts(whole_project, source_path, ctx);
        Self {
            files: FileSet::new(&scope, ctx, SCRIPT_EXTENSIONS),
            out_dir: out_dir.into(),
            options,
            compiler: Arc::clone(&ctx.engines().script),
        }
    }

    async fn compile_file(&self, file: SourceFile) -> Result<()> {
        let source = tokio::fs::read_to_string(&file.path)
            .await
            .map_err(|e| BuildError::fs(&file.path, e))?;

        let compiled = self
            .compiler
            .compile(
                ScriptInput {
                    path: &file.path,
                    relative: &file.relative,
                    source: &source,
                },
                &self.options,
            )
            .await?;

        let target = self.out_dir.join(&file.relative).with_extension("js");
        write_file(&target, compiled.code.as_bytes()).await?;
        tracing::trace!(file = %file.relative.display(), "compiled script");
        Ok(())
    }
}

#[async_trait]
impl BuildStream for ScriptStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Script
    }

    fn file_set(&self) -> &FileSet {
        &self.files
    }

    fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    async fn run_pass(&self, files: Vec<SourceFile>) -> Result<usize> {
        stream::iter(files)
            .map(|file| self.compile_file(file))
            .buffer_unordered(PASS_CONCURRENCY)
            .try_fold(0, |written, ()| async move { Ok(written + 1) })
            .await
    }
}
