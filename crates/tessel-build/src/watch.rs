//! Watch mode: re-running stream passes when their sources change.
//!
//! A watched stream runs its first pass to completion before the caller gets
//! control back. Later passes run on a background task that reports each
//! outcome as a [`PassEvent`] and stops when its [`WatchHandle`] is stopped or
//! dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::fileset::SourceFile;
use crate::streams::{BuildStream, StreamKind};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Outcome of one watch-triggered pass.
#[derive(Debug)]
pub struct PassEvent {
    pub stream: StreamKind,
    pub out_dir: PathBuf,
    /// Files whose change triggered the pass
    pub changed: Vec<PathBuf>,
    /// Number of files written, or the error that aborted the pass
    pub outcome: Result<usize>,
}

/// Settings shared by every watched stream of one build.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub debounce: Duration,
    pub events: mpsc::UnboundedSender<PassEvent>,
}

/// Recursive watcher over a set of roots.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch every existing directory in `roots`.
    ///
    /// Changes below `node_modules` or hidden directories are dropped, as are
    /// repeated events for the same file within `debounce`.
    pub fn new(roots: &[PathBuf], debounce: Duration) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let roots: Vec<PathBuf> = roots.iter().filter(|r| r.is_dir()).cloned().collect();
        let (tx, rx) = mpsc::channel(100);

        let mut last_event: Option<(PathBuf, Instant)> = None;
        let roots_clone = roots.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if Self::should_ignore(path, &roots_clone) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Receiver gone means the watch was stopped.
                let _ = tx.blocking_send(change);
            }
        })?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            rx,
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn should_ignore(path: &Path, roots: &[PathBuf]) -> bool {
        let Some(rel_path) = roots.iter().find_map(|root| path.strip_prefix(root).ok()) else {
            return true;
        };

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name == "node_modules" || (name.starts_with('.') && name != "." && name != ".."))
        })
    }
}

/// Stops a watched stream.
///
/// Dropping the handle stops the watch as well.
pub struct WatchHandle {
    stream: StreamKind,
    out_dir: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the background task to stop after its current pass.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "watch task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("stream", &self.stream)
            .field("out_dir", &self.out_dir)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Start re-running `stream` on changes to its file set.
pub(crate) fn spawn_watch<S: BuildStream>(stream: Arc<S>, options: WatchOptions) -> Result<WatchHandle> {
    let (watcher, mut changes) = FileWatcher::new(stream.file_set().roots(), options.debounce)?;
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let kind = stream.kind();
    let out_dir = stream.out_dir().to_path_buf();

    tracing::debug!(stream = %kind, roots = ?watcher.roots(), "watching");

    let task = tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            let first = tokio::select! {
                _ = &mut stop_rx => break,
                change = changes.recv() => match change {
                    Some(change) => change,
                    None => break,
                },
            };

            // Let bursts of events (editor saves, branch switches) settle.
            let mut batch = vec![first];
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = tokio::time::sleep(options.debounce) => {}
            }
            while let Ok(change) = changes.try_recv() {
                batch.push(change);
            }

            let Some((changed, files)) = select_files(stream.as_ref(), &batch) else {
                continue;
            };

            tracing::info!(stream = %stream.kind(), files = changed.len(), "change detected, rebuilding");
            let outcome = match files {
                Ok(files) => stream.run_pass(files).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                tracing::error!(stream = %stream.kind(), error = %e, "watch pass failed");
            }

            let event = PassEvent {
                stream: stream.kind(),
                out_dir: stream.out_dir().to_path_buf(),
                changed,
                outcome,
            };
            if options.events.send(event).is_err() {
                tracing::debug!("pass event receiver dropped");
            }
        }
        tracing::debug!(stream = %stream.kind(), "watch stopped");
    });

    Ok(WatchHandle {
        stream: kind,
        out_dir,
        stop: Some(stop_tx),
        task: Some(task),
    })
}

/// Changed paths relevant to `stream` and the files its next pass should see.
fn select_files<S: BuildStream>(
    stream: &S,
    batch: &[FileChange],
) -> Option<(Vec<PathBuf>, Result<Vec<SourceFile>>)> {
    let set = stream.file_set();
    let mut changed: Vec<PathBuf> = batch
        .iter()
        .map(FileChange::path)
        .filter(|path| set.matches(path))
        .map(Path::to_path_buf)
        .collect();
    changed.sort();
    changed.dedup();
    if changed.is_empty() {
        return None;
    }

    if stream.rebuilds_all() {
        return Some((changed, set.collect()));
    }

    let files: Vec<SourceFile> = changed
        .iter()
        .filter(|path| path.is_file())
        .filter_map(|path| set.relativize(path))
        .collect();
    if files.is_empty() {
        return None;
    }
    Some((changed, Ok(files)))
}
