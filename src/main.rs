// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use character_rig::cli::args::{Cli, Commands};
use character_rig::cli::prepare::{run_prepare, run_probe};

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Prepare(args) => run_prepare(args),
        Commands::Probe(args) => run_probe(args),
    }
}
