//! The per-target transform streams.
//!
//! Each stream selects its files through a [`FileSet`], runs one pass over
//! them and, in watch mode, keeps re-running passes in the background.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::fileset::{FileSet, SourceFile};
use crate::watch::{WatchHandle, WatchOptions, spawn_watch};

mod components;
mod resources;
mod script;
mod style;

pub use components::build_component_styles;
pub use resources::ResourceStream;
pub use script::ScriptStream;
pub use style::StyleStream;

/// Files compiled concurrently within one pass.
pub(crate) const PASS_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    Script,
    Style,
    Resources,
    ComponentStyles,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Script => "script",
            Self::Style => "style",
            Self::Resources => "resources",
            Self::ComponentStyles => "component-styles",
        })
    }
}

/// Result of a stream's first pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub kind: StreamKind,
    pub out_dir: PathBuf,
    pub files_written: usize,
}

/// A stream after its first pass, with its watch handle in watch mode.
#[derive(Debug)]
pub struct StreamRun {
    pub summary: StreamSummary,
    pub watch: Option<WatchHandle>,
}

/// A transform stream.
#[async_trait]
pub trait BuildStream: Send + Sync + 'static {
    fn kind(&self) -> StreamKind;

    fn file_set(&self) -> &FileSet;

    fn out_dir(&self) -> &Path;

    /// Re-run over the whole file set on any change instead of only the
    /// changed files.
    fn rebuilds_all(&self) -> bool {
        false
    }

    /// Process `files`, returning how many output files were written.
    async fn run_pass(&self, files: Vec<SourceFile>) -> Result<usize>;
}

/// Run the first pass of `stream` and, with `watch`, keep watching it.
pub async fn drive<S: BuildStream>(stream: Arc<S>, watch: Option<WatchOptions>) -> Result<StreamRun> {
    let files = stream.file_set().collect()?;
    tracing::debug!(
        stream = %stream.kind(),
        out_dir = %stream.out_dir().display(),
        files = files.len(),
        "starting pass"
    );

    let files_written = stream.run_pass(files).await?;
    let summary = StreamSummary {
        kind: stream.kind(),
        out_dir: stream.out_dir().to_path_buf(),
        files_written,
    };

    let watch = match watch {
        Some(options) => Some(spawn_watch(Arc::clone(&stream), options)?),
        None => None,
    };

    Ok(StreamRun { summary, watch })
}
