//! Command-line interface definition for tessel.
//!
//! # Command Structure
//!
//! - `tessel bundle` - Compile the project into the main, module and esm5 targets
//! - `tessel build` - Production site build: entry, bundle, static pages

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tessel - multi-target builds for front-end projects
#[derive(Parser, Debug)]
#[command(
    name = "tessel",
    version,
    about = "Multi-target builds for front-end projects",
    long_about = "Tessel compiles a project (or one of its local packages) into CommonJS,\n\
                  ES module and ES5-module targets, and builds production sites from\n\
                  the pages directory."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Project root (defaults to the nearest directory with a config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Explicit config file instead of tessel.config.json
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available tessel subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Production build of the site
    ///
    /// Cleans the output and temp directories, generates the entry file,
    /// bundles it, writes the static pages and publishes the service worker.
    Build(BuildArgs),

    /// Compile sources into every output target
    ///
    /// Writes scripts, stylesheets and resources for each target. With
    /// `--watch` the command keeps rebuilding until interrupted.
    Bundle(BundleArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Environment name used for config profiles and the entry hooks
    #[arg(short, long, default_value = "prod")]
    pub env: String,

    /// Print the build report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the bundle command
#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    /// Environment name used for config profiles
    #[arg(short, long, default_value = "dev")]
    pub env: String,

    /// Build only this local package
    #[arg(short, long, value_name = "NAME", conflicts_with = "whole_project")]
    pub package: Option<String>,

    /// Build the project and every local package together
    #[arg(long)]
    pub whole_project: bool,

    /// Keep watching sources and rebuild on change
    #[arg(short, long)]
    pub watch: bool,

    /// Let every target finish and report each outcome instead of stopping
    /// at the first failure
    #[arg(long)]
    pub keep_going: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bundle_defaults_to_dev() {
        let cli = Cli::parse_from(["tessel", "bundle"]);
        match cli.command {
            Command::Bundle(args) => {
                assert_eq!(args.env, "dev");
                assert!(!args.watch);
                assert!(args.package.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn build_defaults_to_prod() {
        let cli = Cli::parse_from(["tessel", "build", "--cwd", "site"]);
        assert_eq!(cli.global.cwd, Some(PathBuf::from("site")));
        match cli.command {
            Command::Build(args) => assert_eq!(args.env, "prod"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn package_conflicts_with_whole_project() {
        let result = Cli::try_parse_from(["tessel", "bundle", "--package", "ui", "--whole-project"]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["tessel", "-v", "-q", "bundle"]).is_err());
    }
}
