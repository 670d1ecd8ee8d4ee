//! Terminal UI: spinners, status messages and formatted summaries.
//!
//! Everything writes to stderr so `--json` output on stdout stays clean.
//!
//! ```no_run
//! use tessel_cli::ui;
//!
//! ui::init_colors(false);
//! let spinner = ui::Spinner::new("Bundling...");
//! spinner.finish("Bundled");
//! ui::success("Build successful");
//! ```

mod format;
mod messages;
mod observer;
mod spinner;

pub use format::{format_duration, format_size, print_build_summary, print_target_summary};
pub use messages::{error, info, success, warning};
pub use observer::SpinnerObserver;
pub use spinner::Spinner;

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Check if color output should be enabled.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise colors are used when stderr
/// is attended by a user.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply the color decision to spinner and summary styling.
pub fn init_colors(no_color: bool) {
    console::set_colors_enabled_stderr(!no_color && should_use_color());
}

/// Whether to animate progress; spinners are noise in CI logs.
pub fn interactive() -> bool {
    !is_ci() && console::user_attended_stderr()
}
