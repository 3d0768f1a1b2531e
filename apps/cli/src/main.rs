//! reactorconf CLI: render container build plugin configurations.
//!
//! Reads a plugins template and a build spec and prints the plugin
//! configuration the build executor should run.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
