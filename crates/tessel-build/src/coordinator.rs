//! Multi-target build coordinator.
//!
//! Plans the streams of every target, validates that no two streams of a
//! target select the same inputs, builds component stylesheets first when the
//! project declares component entries, then races every remaining stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tessel_config::PackageInfo;
use tokio::sync::mpsc;

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::fileset::{Selector, validate_partitions};
use crate::options::{ScriptOptions, build_options};
use crate::streams::{
    BuildStream, ResourceStream, ScriptStream, StreamRun, StreamSummary, StyleStream,
    build_component_styles, drive,
};
use crate::targets::{BuildTarget, TargetKind, TargetLayout};
use crate::watch::{PassEvent, WatchHandle, WatchOptions};

/// What to build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildRequest<'a> {
    /// Keep watching sources after the first pass
    pub watch: bool,
    /// Select sources from the project and every package
    pub whole_project: bool,
    /// Build only this package
    pub package: Option<&'a PackageInfo>,
}

impl<'a> BuildRequest<'a> {
    pub fn whole_project() -> Self {
        Self {
            whole_project: true,
            ..Self::default()
        }
    }

    pub fn package(package: &'a PackageInfo) -> Self {
        Self {
            package: Some(package),
            ..Self::default()
        }
    }

    pub fn watching(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// First-pass results of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub kind: TargetKind,
    pub out_dir: PathBuf,
    pub streams: Vec<StreamSummary>,
}

impl TargetReport {
    pub fn files_written(&self) -> usize {
        self.streams.iter().map(|s| s.files_written).sum()
    }
}

/// Result of [`build`].
#[derive(Debug)]
pub struct BuildReport {
    pub targets: Vec<TargetReport>,
    /// Present in watch mode
    pub watch: Option<WatchSession>,
}

/// Result of one target in [`build_settled`].
#[derive(Debug)]
pub struct TargetOutcome {
    pub kind: TargetKind,
    pub out_dir: PathBuf,
    pub result: Result<TargetReport>,
}

/// Result of [`build_settled`].
#[derive(Debug)]
pub struct SettledBuild {
    pub targets: Vec<TargetOutcome>,
    pub watch: Option<WatchSession>,
}

impl SettledBuild {
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|t| t.result.is_ok())
    }
}

/// The background side of a watch-mode build.
///
/// Every later pass is reported through [`WatchSession::next_event`].
/// Dropping the session stops every watcher.
#[derive(Debug)]
pub struct WatchSession {
    handles: Vec<WatchHandle>,
    events: mpsc::UnboundedReceiver<PassEvent>,
}

impl WatchSession {
    pub fn handles(&self) -> &[WatchHandle] {
        &self.handles
    }

    /// Wait for the next watch-triggered pass. `None` once every watcher stopped.
    pub async fn next_event(&mut self) -> Option<PassEvent> {
        self.events.recv().await
    }

    /// Stop every watcher and wait for them to exit.
    pub async fn stop(self) {
        join_all(self.handles.into_iter().map(WatchHandle::shutdown)).await;
    }
}

enum PlannedStream {
    Script(Arc<ScriptStream>),
    Style(Arc<StyleStream>),
    Resources(Arc<ResourceStream>),
}

impl PlannedStream {
    fn selector(&self) -> Selector {
        let (stream, extensions) = match self {
            Self::Script(s) => (s.kind(), s.file_set().extensions()),
            Self::Style(s) => (s.kind(), s.file_set().extensions()),
            Self::Resources(s) => (s.kind(), s.file_set().extensions()),
        };
        Selector {
            stream: stream.to_string(),
            extensions: extensions.to_vec(),
        }
    }

    async fn drive(&self, watch: Option<WatchOptions>) -> Result<StreamRun> {
        match self {
            Self::Script(s) => drive(Arc::clone(s), watch).await,
            Self::Style(s) => drive(Arc::clone(s), watch).await,
            Self::Resources(s) => drive(Arc::clone(s), watch).await,
        }
    }
}

struct TargetPlan {
    target: BuildTarget,
    streams: Vec<PlannedStream>,
}

struct BuildPlan {
    layout: TargetLayout,
    targets: Vec<TargetPlan>,
}

fn plan(ctx: &BuildContext, request: &BuildRequest<'_>) -> Result<BuildPlan> {
    let layout = TargetLayout::resolve(ctx, request.package, request.whole_project);
    let source_path: Option<&Path> = request.package.map(|p| p.root_path.as_path());
    let scope_override = request.package.map(|p| p.name.as_str());
    let component_mode = ctx.config().has_component_entries();

    let mut targets = Vec::with_capacity(layout.targets().len());
    for target in layout.targets() {
        let options = build_options(
            ScriptOptions::for_target(ctx, target)?,
            ctx.hooks().option_mutators(),
        )?;

        let mut streams = vec![PlannedStream::Script(Arc::new(ScriptStream::new(
            ctx,
            &target.out_dir,
            options,
            request.whole_project,
            source_path,
        )))];

        if target.kind.compiles_styles() && !component_mode {
            streams.push(PlannedStream::Style(Arc::new(StyleStream::new(
                ctx,
                &target.out_dir,
                request.whole_project,
                source_path,
            ))));
        }

        streams.push(PlannedStream::Resources(Arc::new(ResourceStream::new(
            ctx,
            &target.out_dir,
            request.whole_project,
            source_path,
            scope_override,
            target.kind.carries_style_sources(),
        ))));

        let selectors: Vec<Selector> = streams.iter().map(PlannedStream::selector).collect();
        validate_partitions(target.kind.dir_name(), &selectors)?;

        targets.push(TargetPlan {
            target: target.clone(),
            streams,
        });
    }

    Ok(BuildPlan { layout, targets })
}

async fn run_component_styles(ctx: &BuildContext, layout: &TargetLayout) -> Result<Option<StreamSummary>> {
    if !ctx.config().has_component_entries() {
        return Ok(None);
    }
    let (primary, secondary) = layout.component_style_dirs().ok_or_else(|| {
        BuildError::Configuration("component styles need two output targets".to_string())
    })?;
    tracing::info!(out_dir = %primary.display(), "building component stylesheets");
    build_component_styles(ctx, &primary, &secondary).await.map(Some)
}

fn watch_channel(
    ctx: &BuildContext,
    watch: bool,
) -> (Option<WatchOptions>, Option<mpsc::UnboundedReceiver<PassEvent>>) {
    if !watch {
        return (None, None);
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let options = WatchOptions {
        debounce: ctx.watch_debounce(),
        events: tx,
    };
    (Some(options), Some(rx))
}

fn session(handles: Vec<WatchHandle>, events: Option<mpsc::UnboundedReceiver<PassEvent>>) -> Option<WatchSession> {
    events.map(|events| WatchSession { handles, events })
}

/// Build every target, failing as soon as any stream fails.
///
/// Component stylesheets are built to completion before any other stream
/// starts. The returned error is the failing stream's own error.
pub async fn build(ctx: &BuildContext, request: BuildRequest<'_>) -> Result<BuildReport> {
    let plan = plan(ctx, &request)?;
    let component = run_component_styles(ctx, &plan.layout).await?;

    let (watch, events) = watch_channel(ctx, request.watch);
    let launches = plan.targets.iter().enumerate().flat_map(|(index, target)| {
        target.streams.iter().map(move |stream| (index, stream))
    });
    let runs = try_join_all(launches.map(|(index, stream)| {
        let watch = watch.clone();
        async move { stream.drive(watch).await.map(|run| (index, run)) }
    }))
    .await?;
    drop(watch);

    let mut reports: Vec<TargetReport> = plan
        .targets
        .iter()
        .map(|t| TargetReport {
            kind: t.target.kind,
            out_dir: t.target.out_dir.clone(),
            streams: Vec::new(),
        })
        .collect();
    if let (Some(summary), Some(first)) = (component, reports.first_mut()) {
        first.streams.push(summary);
    }

    let mut handles = Vec::new();
    for (index, run) in runs {
        reports[index].streams.push(run.summary);
        handles.extend(run.watch);
    }

    for report in &reports {
        tracing::info!(build_target = %report.kind, files = report.files_written(), "target built");
    }

    Ok(BuildReport {
        targets: reports,
        watch: session(handles, events),
    })
}

/// Build every target and report each target's outcome separately.
///
/// Configuration errors and component stylesheet failures still fail the
/// whole invocation, since no target can be built without them.
pub async fn build_settled(ctx: &BuildContext, request: BuildRequest<'_>) -> Result<SettledBuild> {
    let plan = plan(ctx, &request)?;
    let component = run_component_styles(ctx, &plan.layout).await?;

    let (watch, events) = watch_channel(ctx, request.watch);
    let launches = plan.targets.iter().enumerate().flat_map(|(index, target)| {
        target.streams.iter().map(move |stream| (index, stream))
    });
    let runs = join_all(launches.map(|(index, stream)| {
        let watch = watch.clone();
        async move { (index, stream.drive(watch).await) }
    }))
    .await;
    drop(watch);

    let mut results: Vec<Result<TargetReport>> = plan
        .targets
        .iter()
        .map(|t| {
            Ok(TargetReport {
                kind: t.target.kind,
                out_dir: t.target.out_dir.clone(),
                streams: Vec::new(),
            })
        })
        .collect();
    if let (Some(summary), Some(Ok(first))) = (component, results.first_mut()) {
        first.streams.push(summary);
    }

    let mut handles = Vec::new();
    for (index, run) in runs {
        let slot = &mut results[index];
        match run {
            Ok(run) => {
                if let Ok(report) = slot {
                    report.streams.push(run.summary);
                }
                handles.extend(run.watch);
            }
            Err(e) if slot.is_ok() => *slot = Err(e),
            Err(e) => tracing::error!(error = %e, "additional stream failure in failed target"),
        }
    }

    let targets = plan
        .targets
        .iter()
        .zip(results)
        .map(|(t, result)| {
            match &result {
                Ok(report) => tracing::info!(build_target = %t.target.kind, files = report.files_written(), "target built"),
                Err(e) => tracing::error!(build_target = %t.target.kind, error = %e, "target failed"),
            }
            TargetOutcome {
                kind: t.target.kind,
                out_dir: t.target.out_dir.clone(),
                result,
            }
        })
        .collect();

    Ok(SettledBuild {
        targets,
        watch: session(handles, events),
    })
}
