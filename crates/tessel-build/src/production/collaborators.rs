//! Contracts of the steps the production flow delegates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tessel_config::ProjectConfig;

use super::defaults::{DirectoryAnalyzer, HtmlSiteGenerator, RolldownProductionBundler, TemplateEntryGenerator};
use crate::context::{BuildContext, BuildMode};
use crate::error::Result;
use crate::output::EmittedFile;

/// One routable page found in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// URL path, `/` for the index page
    pub route: String,
    pub file: PathBuf,
}

/// What the analyzer learned about the project structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyseInfo {
    pub pages: Vec<PageInfo>,
    pub layout: Option<PathBuf>,
    /// Service worker template to publish after the build
    pub service_worker: Option<PathBuf>,
}

/// Statistics of a production bundler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    pub out_dir: PathBuf,
    pub assets: Vec<EmittedFile>,
    #[serde(skip)]
    pub duration: Duration,
}

impl BuildStats {
    pub fn total_size(&self) -> u64 {
        self.assets.iter().map(|a| a.size).sum()
    }

    pub fn entry_chunks(&self) -> impl Iterator<Item = &EmittedFile> {
        self.assets.iter().filter(|a| a.is_entry)
    }

    pub fn assets_with_extension<'a>(&'a self, ext: &'a str) -> impl Iterator<Item = &'a EmittedFile> {
        self.assets.iter().filter(move |a| a.extension() == Some(ext))
    }
}

/// Reads the project structure.
#[async_trait]
pub trait ProjectAnalyzer: Send + Sync {
    async fn analyse(&self, ctx: &BuildContext) -> Result<AnalyseInfo>;
}

/// Writes the production entry file, applying the registered entry hooks.
#[async_trait]
pub trait EntryGenerator: Send + Sync {
    /// Returns the path of the written entry.
    async fn create_entry(&self, ctx: &BuildContext, info: &AnalyseInfo) -> Result<PathBuf>;
}

/// Input of a production bundler pass.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    pub mode: BuildMode,
    pub project_root: &'a Path,
    pub env: &'a str,
    pub entry: &'a Path,
    pub out_dir: &'a Path,
    pub config: &'a ProjectConfig,
}

/// Bundles the production entry.
#[async_trait]
pub trait ProductionBundler: Send + Sync {
    async fn bundle(&self, request: BundleRequest<'_>) -> Result<BuildStats>;
}

/// Generates the static site from the bundler output.
#[async_trait]
pub trait SiteGenerator: Send + Sync {
    async fn generate(&self, ctx: &BuildContext, info: &AnalyseInfo, stats: &BuildStats) -> Result<()>;
}

/// The collaborators of one production build.
#[derive(Clone)]
pub struct Collaborators {
    pub analyzer: Arc<dyn ProjectAnalyzer>,
    pub entry: Arc<dyn EntryGenerator>,
    pub bundler: Arc<dyn ProductionBundler>,
    pub site: Arc<dyn SiteGenerator>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            analyzer: Arc::new(DirectoryAnalyzer::default()),
            entry: Arc::new(TemplateEntryGenerator),
            bundler: Arc::new(RolldownProductionBundler),
            site: Arc::new(HtmlSiteGenerator),
        }
    }
}
