use anyhow::Result;
use clap::Parser;

use seapack::cli::{Cli, Commands};
use seapack::commands;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Build(args) => commands::build(&cli, args),
        Commands::Verify(args) => commands::verify(&cli, args),
        Commands::Rasterize(args) => commands::rasterize(&cli, args),
    }
}
