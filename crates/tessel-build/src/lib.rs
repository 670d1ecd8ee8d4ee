//! Multi-target build pipeline for tessel projects.
//!
//! A build compiles one source tree into several output targets
//! (`main`/`module`/`esm5`, or `lib`/`es` for material component projects).
//! Every target runs a script stream, a stylesheet stream and a resource
//! stream concurrently; [`coordinator::build`] joins them. Projects that
//! declare component entries get their stylesheets from a bundler pass
//! instead, run once before anything else.
//!
//! ```no_run
//! use tessel_build::{BuildContext, BuildRequest, build};
//! use tessel_config::ConfigDiscovery;
//!
//! # async fn run() -> tessel_build::Result<()> {
//! let root = std::path::Path::new(".");
//! let config = ConfigDiscovery::new(root).load("dev")?;
//! let ctx = BuildContext::builder(root, config).build()?;
//! let report = build(&ctx, BuildRequest::whole_project()).await?;
//! println!("{} targets built", report.targets.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`production`] wraps the bundler in the full production flow.

pub mod compilers;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod fileset;
pub mod options;
pub mod output;
pub mod production;
pub mod registry;
pub mod rewrite;
pub mod streams;
pub mod targets;
pub mod watch;

pub use context::{BuildContext, BuildContextBuilder, BuildMode, SelectedSource};
pub use coordinator::{
    BuildReport, BuildRequest, SettledBuild, TargetOutcome, TargetReport, WatchSession, build,
    build_settled,
};
pub use error::{BuildError, Result};
pub use options::{ModuleSystem, ScriptOptions, ScriptTarget, build_options};
pub use production::{
    ProductionBuild, ProductionObserver, ProductionReport, ProductionStep,
    register_prod_entry_hook, run_production_build,
};
pub use registry::{HookRegistry, Hooks, SERVICE_WORKER_PIPE};
pub use rewrite::{ImportRecord, ImportRewriter};
pub use streams::{StreamKind, StreamSummary};
pub use targets::{BuildTarget, TargetKind, TargetLayout};
pub use watch::{PassEvent, WatchHandle};
