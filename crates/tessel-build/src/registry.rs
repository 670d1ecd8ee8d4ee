//! Hook registry with separate registration and read phases.
//!
//! Plugins register option mutators, content pipes, post-build callbacks and
//! entry hooks on a mutable [`HookRegistry`]. [`HookRegistry::freeze`] turns it
//! into an immutable [`Hooks`] value that is shared with every build; nothing
//! can be registered once a build has started.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{BuildError, Result};
use crate::options::ScriptOptions;
use crate::production::{BuildStats, EntryBuilder, EntryHookContext};

/// Content pipe applied to the generated service worker after a production build.
pub const SERVICE_WORKER_PIPE: &str = "serviceWorkerAfterProdBuild";

type OptionMutatorFn = dyn Fn(ScriptOptions) -> anyhow::Result<ScriptOptions> + Send + Sync;
type ContentPipeFn = dyn Fn(String) -> anyhow::Result<String> + Send + Sync;
type PostBuildFn = dyn Fn(&BuildStats) -> anyhow::Result<()> + Send + Sync;
type EntryHookFn =
    dyn Fn(&EntryHookContext<'_>, &mut EntryBuilder) -> anyhow::Result<()> + Send + Sync;

/// A registered hook together with the name it was registered under.
pub struct Named<F: ?Sized> {
    name: String,
    hook: Arc<F>,
}

impl<F: ?Sized> Named<F> {
    fn new(name: impl Into<String>, hook: Arc<F>) -> Self {
        Self {
            name: name.into(),
            hook,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F: ?Sized> Clone for Named<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            hook: Arc::clone(&self.hook),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Named<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Named").field(&self.name).finish()
    }
}

/// Transforms script compiler options.
pub type OptionMutator = Named<OptionMutatorFn>;
/// Rewrites text content, e.g. the generated service worker.
pub type ContentPipe = Named<ContentPipeFn>;
/// Runs after a production build with its statistics.
pub type PostBuildCallback = Named<PostBuildFn>;
/// Decorates the generated production entry.
pub type EntryHook = Named<EntryHookFn>;

impl Named<OptionMutatorFn> {
    pub fn call(&self, options: ScriptOptions) -> anyhow::Result<ScriptOptions> {
        (self.hook)(options)
    }
}

impl Named<ContentPipeFn> {
    pub fn apply(&self, content: String) -> anyhow::Result<String> {
        (self.hook)(content)
    }
}

impl Named<PostBuildFn> {
    pub fn run(&self, stats: &BuildStats) -> anyhow::Result<()> {
        (self.hook)(stats)
    }
}

impl Named<EntryHookFn> {
    pub fn decorate(&self, ctx: &EntryHookContext<'_>, entry: &mut EntryBuilder) -> anyhow::Result<()> {
        (self.hook)(ctx, entry)
    }
}

/// Registration phase: collects hooks in registration order.
#[derive(Debug, Default)]
pub struct HookRegistry {
    option_mutators: Vec<OptionMutator>,
    content_pipes: IndexMap<String, Vec<ContentPipe>>,
    post_build: Vec<PostBuildCallback>,
    entry_hooks: Vec<EntryHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script option mutator. Mutators run in registration order.
    pub fn add_option_mutator<F>(&mut self, name: impl Into<String>, mutator: F) -> &mut Self
    where
        F: Fn(ScriptOptions) -> anyhow::Result<ScriptOptions> + Send + Sync + 'static,
    {
        self.option_mutators.push(Named::new(name, Arc::new(mutator)));
        self
    }

    /// Register a content pipe under `key` (see [`SERVICE_WORKER_PIPE`]).
    pub fn add_content_pipe<F>(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        pipe: F,
    ) -> &mut Self
    where
        F: Fn(String) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.content_pipes
            .entry(key.into())
            .or_default()
            .push(Named::new(name, Arc::new(pipe)));
        self
    }

    pub fn add_post_build<F>(&mut self, name: impl Into<String>, callback: F) -> &mut Self
    where
        F: Fn(&BuildStats) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.post_build.push(Named::new(name, Arc::new(callback)));
        self
    }

    pub fn add_entry_hook<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&EntryHookContext<'_>, &mut EntryBuilder) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.entry_hooks.push(Named::new(name, Arc::new(hook)));
        self
    }

    /// End the registration phase.
    pub fn freeze(self) -> Arc<Hooks> {
        tracing::debug!(
            option_mutators = self.option_mutators.len(),
            content_pipes = self.content_pipes.len(),
            post_build = self.post_build.len(),
            entry_hooks = self.entry_hooks.len(),
            "hook registry frozen"
        );
        Arc::new(Hooks {
            option_mutators: self.option_mutators,
            content_pipes: self.content_pipes,
            post_build: self.post_build,
            entry_hooks: self.entry_hooks,
        })
    }
}

/// Read phase: the immutable hooks a build runs with.
#[derive(Debug, Default)]
pub struct Hooks {
    option_mutators: Vec<OptionMutator>,
    content_pipes: IndexMap<String, Vec<ContentPipe>>,
    post_build: Vec<PostBuildCallback>,
    entry_hooks: Vec<EntryHook>,
}

impl Hooks {
    /// No hooks at all.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn option_mutators(&self) -> &[OptionMutator] {
        &self.option_mutators
    }

    pub fn entry_hooks(&self) -> &[EntryHook] {
        &self.entry_hooks
    }

    pub fn has_pipe(&self, key: &str) -> bool {
        self.content_pipes.get(key).is_some_and(|pipes| !pipes.is_empty())
    }

    /// Run `content` through every pipe registered under `key`.
    ///
    /// Unknown keys return the content unchanged.
    pub fn apply_pipe(&self, key: &str, content: String) -> Result<String> {
        let Some(pipes) = self.content_pipes.get(key) else {
            return Ok(content);
        };
        pipes.iter().try_fold(content, |content, pipe| {
            pipe.apply(content).map_err(|e| BuildError::Pipeline {
                hook: format!("{key}/{}", pipe.name()),
                message: format!("{e:#}"),
            })
        })
    }

    /// Invoke post-build callbacks in registration order.
    pub fn run_post_build(&self, stats: &BuildStats) -> Result<()> {
        for callback in &self.post_build {
            tracing::debug!(hook = callback.name(), "running post-build callback");
            callback.run(stats).map_err(|e| BuildError::Pipeline {
                hook: callback.name().to_string(),
                message: format!("{e:#}"),
            })?;
        }
        Ok(())
    }
}
