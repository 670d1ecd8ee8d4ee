//! Production build orchestrator.
//!
//! A linear flow: clean the output, analyse the project, write the entry,
//! bundle it, generate the static site, run post-build callbacks and finally
//! publish the service worker if the site generator staged one. Any failing
//! step aborts the flow; nothing is retried.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::context::{BuildContext, BuildMode};
use crate::error::{BuildError, Result};
use crate::output::write_file;
use crate::registry::SERVICE_WORKER_PIPE;

mod collaborators;
mod defaults;
mod entry;
mod format;

pub use collaborators::{
    AnalyseInfo, BuildStats, BundleRequest, Collaborators, EntryGenerator, PageInfo,
    ProductionBundler, ProjectAnalyzer, SiteGenerator,
};
pub use defaults::{
    DirectoryAnalyzer, ENTRY_FILE_NAME, HtmlSiteGenerator, RolldownProductionBundler,
    SERVICE_WORKER_TEMPLATE, TemplateEntryGenerator,
};
pub use entry::{
    ENV_RUNTIME_MODULE, EntryBuilder, EntryHookContext, PROD_ENTRY_HOOK, decorate_entry,
    register_prod_entry_hook,
};
pub use format::format_script;

/// Published service worker name below the distribution root.
pub const SERVICE_WORKER_FILE: &str = "sw.js";

/// Steps of the production flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductionStep {
    CleanDist,
    CleanTemp,
    Analyse,
    CreateEntry,
    Bundle,
    GenerateSite,
    PostBuild,
    ServiceWorker,
}

impl ProductionStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::CleanDist => "Clean dist",
            Self::CleanTemp => "Clean temp",
            Self::Analyse => "Analyse project",
            Self::CreateEntry => "Create entry file",
            Self::Bundle => "Bundle",
            Self::GenerateSite => "Generate static files",
            Self::PostBuild => "Run post-build hooks",
            Self::ServiceWorker => "Publish service worker",
        }
    }
}

impl fmt::Display for ProductionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress callbacks, e.g. for a spinner.
pub trait ProductionObserver: Send + Sync {
    fn step_started(&self, _step: ProductionStep) {}

    fn step_finished(&self, _step: ProductionStep) {}

    fn step_failed(&self, _step: ProductionStep, _error: &BuildError) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl ProductionObserver for SilentObserver {}

/// Outcome of a successful production build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionReport {
    pub info: AnalyseInfo,
    pub entry: PathBuf,
    pub stats: BuildStats,
    /// Published service worker, if a template was staged
    pub service_worker: Option<PathBuf>,
    /// Steps that ran, in order
    pub steps: Vec<ProductionStep>,
}

/// Runs the production flow with a set of collaborators.
#[derive(Clone)]
pub struct ProductionBuild {
    collaborators: Collaborators,
    observer: Arc<dyn ProductionObserver>,
}

impl Default for ProductionBuild {
    fn default() -> Self {
        Self::new(Collaborators::default())
    }
}

impl ProductionBuild {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProductionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn run(&self, ctx: &BuildContext) -> Result<ProductionReport> {
        let mut steps = Vec::with_capacity(8);
        let dist = ctx.dist_root();
        let temp = ctx.temp_root();

        self.step(&mut steps, ProductionStep::CleanDist, remove_dir(&dist))
            .await?;
        self.step(&mut steps, ProductionStep::CleanTemp, remove_dir(&temp))
            .await?;

        let c = &self.collaborators;
        let info = self
            .step(&mut steps, ProductionStep::Analyse, c.analyzer.analyse(ctx))
            .await?;
        let entry = self
            .step(&mut steps, ProductionStep::CreateEntry, c.entry.create_entry(ctx, &info))
            .await?;

        let request = BundleRequest {
            mode: BuildMode::Production,
            project_root: ctx.project_root(),
            env: ctx.env(),
            entry: &entry,
            out_dir: &dist,
            config: ctx.config(),
        };
        let stats = self
            .step(&mut steps, ProductionStep::Bundle, c.bundler.bundle(request))
            .await?;

        self.step(
            &mut steps,
            ProductionStep::GenerateSite,
            c.site.generate(ctx, &info, &stats),
        )
        .await?;

        self.step(&mut steps, ProductionStep::PostBuild, async {
            ctx.hooks().run_post_build(&stats)
        })
        .await?;

        let template = temp.join(SERVICE_WORKER_TEMPLATE);
        let service_worker = if tokio::fs::try_exists(&template).await.unwrap_or(false) {
            let target = dist.join(SERVICE_WORKER_FILE);
            self.step(
                &mut steps,
                ProductionStep::ServiceWorker,
                publish_service_worker(ctx, &template, &target),
            )
            .await?;
            Some(target)
        } else {
            tracing::debug!(path = %template.display(), "no service worker staged");
            None
        };

        tracing::info!(
            assets = stats.assets.len(),
            bytes = stats.total_size(),
            "production build finished"
        );
        Ok(ProductionReport {
            info,
            entry,
            stats,
            service_worker,
            steps,
        })
    }

    async fn step<T>(
        &self,
        steps: &mut Vec<ProductionStep>,
        step: ProductionStep,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tracing::debug!(%step, "production step started");
        self.observer.step_started(step);
        match work.await {
            Ok(value) => {
                self.observer.step_finished(step);
                steps.push(step);
                Ok(value)
            }
            Err(e) => {
                tracing::error!(%step, error = %e, "production step failed");
                self.observer.step_failed(step, &e);
                Err(e)
            }
        }
    }
}

/// Run the production flow with the default collaborators.
pub async fn run_production_build(ctx: &BuildContext) -> Result<ProductionReport> {
    ProductionBuild::default().run(ctx).await
}

async fn remove_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::fs(dir, e)),
    }
}

async fn publish_service_worker(ctx: &BuildContext, template: &Path, target: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(template)
        .await
        .map_err(|e| BuildError::fs(template, e))?;
    let piped = ctx.hooks().apply_pipe(SERVICE_WORKER_PIPE, raw)?;
    let formatted = format_script(&piped, target)?;
    write_file(target, formatted.as_bytes()).await
}
