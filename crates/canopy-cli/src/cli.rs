use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Annual forest change statistics from event rasters.
#[derive(Parser)]
#[command(
    name = "canopy",
    version,
    about = "Annual forest change statistics over villages and administrative areas"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute and export per-region yearly statistics.
    Run(RunArgs),
    /// Print per-year forest cell counts as JSON.
    Series(SeriesArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "canopy.toml")]
    pub config: PathBuf,

    /// Override the output directory from config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct SeriesArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "canopy.toml")]
    pub config: PathBuf,
}
