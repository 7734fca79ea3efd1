//! docchunk CLI: structure partitioned PDF elements into embedding chunks.
//!
//! Reads the element JSON produced by an external PDF partitioner and writes
//! either per-block audit records or the chunks to embed.

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
