//! servicho CLI entry point.
//!
//! Parses arguments, sets up logging and runs the server. Fatal errors are
//! reported through miette and exit with status 1.

use clap::Parser;
use miette::Result;
use servicho::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    commands::execute(args).await.map_err(error::into_report)
}
