// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Environment:
    CHARACTER_RIG_SERVICE_URL   Base URL of the detection/pose service
    CHARACTER_RIG_AUTO          Set to 1/true/yes/on to try the auto rig by default

Examples:
    character-rig prepare --input hero.png --output characters/hero
    character-rig prepare -i hero.png -o characters/hero --auto-rig
    character-rig prepare -i hero.png -o characters/hero --auto-rig --service-url http://10.0.0.5:8080
    character-rig probe --service-url http://localhost:8080"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn a character image into a rig bundle directory
    Prepare(PrepareArgs),
    /// Check whether the detection/pose service answers its liveness probe
    Probe(ProbeArgs),
}

/// Arguments for the prepare command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Input character image
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output bundle directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Try detection and pose estimation before the simple rig
    #[arg(long, default_value_t = false)]
    pub auto_rig: bool,

    /// Base URL of the detection/pose service
    #[arg(long)]
    pub service_url: Option<String>,

    /// Thumbnail side length in pixels
    #[arg(long)]
    pub thumbnail_size: Option<u32>,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the probe command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Base URL of the detection/pose service
    #[arg(long)]
    pub service_url: Option<String>,
}
