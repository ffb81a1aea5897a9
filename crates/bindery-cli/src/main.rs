//! Bindery CLI entry point: argument parsing, logging setup and command
//! dispatch.

use bindery_cli::{cli, commands, error, logger};
use clap::Parser;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Deps(deps_args) => commands::deps_execute(deps_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
