//! Logging setup built on `tracing-subscriber`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `--verbose` turns on debug output for the tessel crates, `--quiet` leaves
/// only errors. Otherwise `RUST_LOG` is honoured, falling back to info.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("tessel_cli=debug,tessel_build=debug,tessel_config=debug")
    } else if quiet {
        EnvFilter::new("tessel_cli=error,tessel_build=error,tessel_config=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tessel_cli=info,tessel_build=info,tessel_config=warn"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .with_writer(std::io::stderr)
        .compact();

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
