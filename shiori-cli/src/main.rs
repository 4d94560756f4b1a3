//! shiori command-line entry point

use clap::Parser;
use shiori_cli::commands::Commands;

/// Reading-position indexing and restoration for HTML chapters
#[derive(Debug, Parser)]
#[command(name = "shiori", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> anyhow::Result<()> {
    Cli::parse().command.execute()
}
