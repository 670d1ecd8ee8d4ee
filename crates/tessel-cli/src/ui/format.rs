//! Formatting utilities for sizes, durations and build summaries.

use std::time::Duration;

use console::{Term, style};
use tessel_build::TargetReport;
use tessel_build::production::BuildStats;

/// Human-readable byte size: `"0 B"`, `"512 B"`, `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Human-readable duration: `"250ms"`, `"1.50s"`, `"2m 5s"`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn rule() -> String {
    let width = Term::stderr().size().1 as usize;
    "─".repeat(width.clamp(20, 80))
}

/// Table of emitted assets, entry chunks first.
pub fn print_build_summary(stats: &BuildStats) {
    eprintln!("\n{}", style("Build Summary").bold().underlined());
    eprintln!("{}", rule());

    let mut assets: Vec<_> = stats.assets.iter().collect();
    assets.sort_by(|a, b| b.is_entry.cmp(&a.is_entry).then_with(|| a.name.cmp(&b.name)));
    for asset in assets {
        let marker = if asset.is_entry { style("▸").green() } else { style("▸").blue() };
        eprintln!(
            "  {} {} {}",
            marker,
            style(&asset.name).bold(),
            style(format_size(asset.size)).dim()
        );
    }

    eprintln!("{}", rule());
    eprintln!(
        "  {} {} in {}",
        style("Total:").bold(),
        style(format_size(stats.total_size())).green(),
        style(format_duration(stats.duration)).green()
    );
}

/// One line per target with the files each stream wrote.
pub fn print_target_summary(targets: &[TargetReport]) {
    for target in targets {
        let streams = target
            .streams
            .iter()
            .map(|s| format!("{} {}", s.kind, s.files_written))
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!(
            "  {} {} {} {}",
            style("▸").blue(),
            style(target.kind).bold(),
            style(target.out_dir.display()).dim(),
            style(format!("({streams})")).dim()
        );
    }
}
