use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::{BuildStream, PASS_CONCURRENCY, StreamKind};
use crate::compilers::{StyleCompiler, StyleInput, strip_comments};
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::fileset::{FileSet, SourceFile, SourceScope};
use crate::output::write_file;

/// Compiles stylesheet sources, optionally concatenated into one bundle.
///
/// Partials (`_name.scss`) are only compiled through the files importing them.
pub struct StyleStream {
    files: FileSet,
    out_dir: PathBuf,
    compiler: Arc<dyn StyleCompiler>,
    include_paths: Vec<PathBuf>,
    compiled_extension: String,
    /// Bundle file name when extraction is enabled
    extract_to: Option<String>,
}

impl StyleStream {
    pub fn new(
        ctx: &BuildContext,
        out_dir: impl Into<PathBuf>,
        whole_project: bool,
        source_path: Option<&Path>,
    ) -> Self {
        let config = ctx.config();
        let scope = SourceScope::for_styles(whole_project, source_path, ctx);
        Self {
            files: FileSet::new(&scope, ctx, &[config.style_extension.as_str()]),
            out_dir: out_dir.into(),
            compiler: Arc::clone(&ctx.engines().style),
            include_paths: vec![ctx.dependency_dir()],
            compiled_extension: config.compiled_style_extension.clone(),
            extract_to: config.css_extract.then(|| config.out_css_file_name.clone()),
        }
    }

    async fn compile_file(&self, file: &SourceFile) -> Result<String> {
        let css = self
            .compiler
            .compile(StyleInput {
                path: &file.path,
                include_paths: &self.include_paths,
            })
            .await?;
        strip_comments(&css, &file.path)
    }
}

fn is_partial(file: &SourceFile) -> bool {
    file.path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('_'))
}

#[async_trait]
impl BuildStream for StyleStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Style
    }

    fn file_set(&self) -> &FileSet {
        &self.files
    }

    fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    // A changed partial affects files that were not changed themselves, and
    // the extracted bundle aggregates everything.
    fn rebuilds_all(&self) -> bool {
        true
    }

    async fn run_pass(&self, files: Vec<SourceFile>) -> Result<usize> {
        let files: Vec<SourceFile> = files.into_iter().filter(|f| !is_partial(f)).collect();

        // Ordered so the extracted bundle is deterministic.
        let compiled: Vec<(SourceFile, String)> = stream::iter(files)
            .map(|file| async move {
                let css = self.compile_file(&file).await?;
                Ok::<_, BuildError>((file, css))
            })
            .buffered(PASS_CONCURRENCY)
            .try_collect()
            .await?;

        match &self.extract_to {
            Some(bundle_name) if compiled.is_empty() => {
                tracing::debug!(bundle = %bundle_name, "no stylesheet sources, bundle not written");
                Ok(0)
            }
            Some(bundle_name) => {
                let bundle = compiled
                    .iter()
                    .map(|(_, css)| css.trim_end())
                    .filter(|css| !css.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                write_file(&self.out_dir.join(bundle_name), bundle.as_bytes()).await?;
                tracing::debug!(bundle = %bundle_name, sources = compiled.len(), "extracted stylesheet bundle");
                Ok(1)
            }
            None => {
                for (file, css) in &compiled {
                    let target = self
                        .out_dir
                        .join(&file.relative)
                        .with_extension(&self.compiled_extension);
                    write_file(&target, css.as_bytes()).await?;
                }
                Ok(compiled.len())
            }
        }
    }
}
