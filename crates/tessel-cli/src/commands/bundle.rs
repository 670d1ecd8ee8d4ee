//! `tessel bundle`: compile sources into every output target.

use std::time::Instant;

use tessel_build::{
    BuildContext, BuildRequest, PassEvent, SelectedSource, WatchSession, build, build_settled,
};

use crate::cli::{BundleArgs, GlobalArgs};
use crate::commands::utils;
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the bundle command.
///
/// Without `--keep-going` the first failing target stops the command with
/// that target's error. With it, every target settles and failures are
/// listed before exiting non-zero.
pub async fn execute(args: BundleArgs, global: &GlobalArgs) -> Result<()> {
    let start = Instant::now();
    let root = utils::resolve_project_root(global.cwd.as_deref())?;
    let config = utils::load_config(&root, global, &args.env)?;

    let selected = match &args.package {
        Some(name) => SelectedSource::Package(name.clone()),
        None => SelectedSource::Root,
    };
    let ctx = BuildContext::builder(&root, config)
        .env(args.env.as_str())
        .selected_source(selected)
        .build()?;

    let mut request = match &args.package {
        Some(name) => {
            let package = ctx
                .package(name)
                .ok_or_else(|| CliError::InvalidArgument(format!("unknown package '{name}'")))?;
            BuildRequest::package(package)
        }
        None if args.whole_project => BuildRequest::whole_project(),
        None => BuildRequest::default(),
    };
    request = request.watching(args.watch);

    let spinner = ui::Spinner::new("Bundling targets...");
    let watch = if args.keep_going {
        let settled = match build_settled(&ctx, request).await {
            Ok(settled) => settled,
            Err(e) => {
                spinner.fail("Bundle failed");
                return Err(e.into());
            }
        };
        let failed = settled.targets.iter().filter(|t| t.result.is_err()).count();
        if failed == 0 {
            spinner.finish(&format!("Bundled in {}", ui::format_duration(start.elapsed())));
        } else {
            spinner.fail(&format!("{failed} of {} targets failed", settled.targets.len()));
        }
        for outcome in &settled.targets {
            match &outcome.result {
                Ok(report) => ui::print_target_summary(std::slice::from_ref(report)),
                Err(e) => ui::error(&format!("{}: {e}", outcome.kind)),
            }
        }
        if failed > 0 && settled.watch.is_none() {
            return Err(CliError::Custom(format!(
                "{failed} of {} targets failed",
                settled.targets.len()
            )));
        }
        settled.watch
    } else {
        let report = match build(&ctx, request).await {
            Ok(report) => report,
            Err(e) => {
                spinner.fail("Bundle failed");
                return Err(e.into());
            }
        };
        spinner.finish(&format!("Bundled in {}", ui::format_duration(start.elapsed())));
        ui::print_target_summary(&report.targets);
        report.watch
    };

    match watch {
        Some(session) => watch_until_interrupted(session).await,
        None => Ok(()),
    }
}

/// Print rebuild passes until Ctrl+C or until every watcher has stopped.
async fn watch_until_interrupted(mut session: WatchSession) -> Result<()> {
    ui::info("Watching for changes. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => report_pass(&event),
                None => break,
            },
            signal = &mut ctrl_c => {
                signal?;
                break;
            }
        }
    }

    session.stop().await;
    ui::info("Stopped watching");
    Ok(())
}

fn report_pass(event: &PassEvent) {
    match &event.outcome {
        Ok(written) => ui::success(&format!(
            "{} rebuilt {} file(s) in {}",
            event.stream,
            written,
            event.out_dir.display()
        )),
        Err(e) => ui::error(&format!("{} pass failed: {e}", event.stream)),
    }
}
