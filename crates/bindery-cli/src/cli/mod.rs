//! Command-line interface definition.
//!
//! - `bindery build` - build and write bundles
//! - `bindery deps` - print the dependency index as JSON

mod commands;
pub mod enums;

use clap::Parser;

pub use commands::{BuildArgs, Command, DepsArgs, ProjectArgs};
pub use enums::*;

/// Bindery - a document linker for HTML imports
#[derive(Parser, Debug)]
#[command(
    name = "bindery",
    version,
    about = "Link HTML imports, scripts and styles into bundles",
    long_about = "Bindery follows HTML imports, scripts and stylesheets from one or more\n\
                  entrypoint documents, assigns every file to a bundle and writes one\n\
                  self-contained output per bundle."
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

    #[command(subcommand)]
    pub command: Command,
}
