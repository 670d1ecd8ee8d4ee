//! `tessel build`: the production site build.

use std::sync::Arc;
use std::time::Instant;

use tessel_build::{
    BuildContext, BuildMode, HookRegistry, ProductionBuild, ProductionReport, register_prod_entry_hook,
};

use crate::cli::{BuildArgs, GlobalArgs};
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// Loads the configuration for `--env`, registers the prod-entry hook and
/// runs every production step. Progress goes to stderr; with `--json` the
/// report is printed on stdout.
pub async fn execute(args: BuildArgs, global: &GlobalArgs) -> Result<()> {
    let start = Instant::now();
    let root = utils::resolve_project_root(global.cwd.as_deref())?;
    let config = utils::load_config(&root, global, &args.env)?;

    let mut registry = HookRegistry::new();
    register_prod_entry_hook(&mut registry);

    let ctx = BuildContext::builder(&root, config)
        .mode(BuildMode::Production)
        .env(args.env.as_str())
        .hooks(registry.freeze())
        .build()?;

    tracing::info!(root = %root.display(), env = %args.env, "starting production build");
    let report = ProductionBuild::default()
        .with_observer(Arc::new(ui::SpinnerObserver::new()))
        .run(&ctx)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::print_build_summary(&report.stats);
    for warning in site_warnings(&report) {
        ui::warning(&warning);
    }
    if let Some(sw) = &report.service_worker {
        ui::info(&format!("Service worker published to {}", sw.display()));
    }
    ui::success(&format!(
        "Built {} page(s) into {} in {}",
        report.info.pages.len(),
        ctx.dist_root().display(),
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}

/// Suspicious but non-fatal outcomes of a production build.
fn site_warnings(report: &ProductionReport) -> Vec<String> {
    let mut warnings = Vec::new();
    if report.info.pages.is_empty() {
        warnings.push("No pages found; only the root route was generated".to_string());
    }
    if report.stats.entry_chunks().next().is_none() {
        warnings.push("The bundler emitted no entry chunk; pages load no script".to_string());
    }
    warnings
}
