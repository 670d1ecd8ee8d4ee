//! Compiler seams used by the streams.
//!
//! Streams never talk to Rolldown or the Sass compiler directly; they go
//! through these traits so the pipeline can run against any implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::options::ScriptOptions;

mod css;
mod rolldown_components;
mod rolldown_script;
mod sass;

pub use css::strip_comments;
pub use rolldown_components::RolldownComponentBundler;
pub use rolldown_script::{ImportRewritePlugin, RolldownScriptCompiler};
pub use sass::SassStyleCompiler;

/// A script file handed to the compiler.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInput<'a> {
    pub path: &'a Path,
    /// Path relative to the stream's base directory
    pub relative: &'a Path,
    pub source: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub code: String,
}

/// Compiles one script file to one output file.
#[async_trait]
pub trait ScriptCompiler: Send + Sync {
    async fn compile(&self, input: ScriptInput<'_>, options: &ScriptOptions) -> Result<CompiledScript>;
}

/// A stylesheet source handed to the compiler.
#[derive(Debug, Clone, Copy)]
pub struct StyleInput<'a> {
    pub path: &'a Path,
    /// Directories searched for `@use`/`@import`
    pub include_paths: &'a [PathBuf],
}

/// Compiles one stylesheet source to CSS.
#[async_trait]
pub trait StyleCompiler: Send + Sync {
    async fn compile(&self, input: StyleInput<'_>) -> Result<String>;
}

/// A bundler pass over the named component entries.
#[derive(Debug, Clone, Copy)]
pub struct ComponentBundleRequest<'a> {
    pub project_root: &'a Path,
    /// Entry name and script entry path, in declaration order
    pub entries: &'a [(String, PathBuf)],
    pub out_dir: &'a Path,
    pub include_paths: &'a [PathBuf],
    /// Stylesheet source extension, without the dot
    pub style_extension: &'a str,
}

/// Bundles component entries, writing `<name>.js` and `<name>.css` per entry.
#[async_trait]
pub trait ComponentBundler: Send + Sync {
    /// Returns the files written, relative to `out_dir`.
    async fn bundle(&self, request: ComponentBundleRequest<'_>) -> Result<Vec<PathBuf>>;
}

/// The compilers a build runs with.
#[derive(Clone)]
pub struct Engines {
    pub script: Arc<dyn ScriptCompiler>,
    pub style: Arc<dyn StyleCompiler>,
    pub components: Arc<dyn ComponentBundler>,
}

impl Engines {
    pub fn new(
        script: Arc<dyn ScriptCompiler>,
        style: Arc<dyn StyleCompiler>,
        components: Arc<dyn ComponentBundler>,
    ) -> Self {
        Self {
            script,
            style,
            components,
        }
    }
}

impl Default for Engines {
    /// Rolldown for scripts and components, grass for stylesheets.
    fn default() -> Self {
        let style: Arc<dyn StyleCompiler> = Arc::new(SassStyleCompiler::new());
        Self {
            script: Arc::new(RolldownScriptCompiler::new()),
            components: Arc::new(RolldownComponentBundler::new(Arc::clone(&style))),
            style,
        }
    }
}
