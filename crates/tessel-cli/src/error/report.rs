//! Miette diagnostic conversion for CLI errors.

use miette::Report;

use crate::error::{BuildError, CliError};

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!(
            code = "CONFIGURATION_ERROR",
            help = "Check tessel.config.json and the \"tessel\" field of package.json",
            "Configuration error: {e}"
        ),
        other => miette::miette!("{other}"),
    }
}

/// Convert BuildError to miette Report, tagged with its stable code.
pub fn build_error_to_miette(err: BuildError) -> Report {
    let code = err.code();
    match &err {
        BuildError::Compilation { file, message } => miette::miette!(
            code = code,
            help = "Fix the source file and run the command again",
            "Failed to compile {}\n{message}",
            file.display()
        ),
        BuildError::Pipeline { hook, message } => miette::miette!(
            code = code,
            help = format!("The hook registered as '{hook}' returned an error"),
            "Hook '{hook}' failed: {message}"
        ),
        _ => miette::miette!(code = code, "{err}"),
    }
}
