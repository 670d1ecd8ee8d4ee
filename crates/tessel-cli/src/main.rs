use clap::Parser;
use tessel_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &args.global).await,
        cli::Command::Bundle(bundle_args) => commands::bundle_execute(bundle_args, &args.global).await,
    };

    result.map_err(error::cli_error_to_miette)
}
