use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mpretrain",
    about = "Molecular representation pretraining pipeline",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a configuration and resolve its datasets
    #[command(visible_alias = "c")]
    Check(CheckArgs),

    /// Dry-run one epoch of budget-bounded batch packing
    #[command(visible_alias = "p")]
    Plan(PlanArgs),

    /// Run the data -> graph -> encoder pipeline for one epoch
    #[command(visible_alias = "e")]
    Encode(EncodeArgs),
}

/// Options shared by all commands.
#[derive(Args)]
pub struct CommonArgs {
    /// Pipeline configuration (TOML)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Epoch index to plan (selects the shuffle permutation)
    #[arg(long, value_name = "N", default_value = "0")]
    pub epoch: usize,
}

#[derive(Args)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Epoch index to run (selects the shuffle permutation)
    #[arg(long, value_name = "N", default_value = "0")]
    pub epoch: usize,

    /// Stop after N batches (whole epoch if omitted)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Encoder weight initialization seed
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,
}

pub fn parse() -> Cli {
    Cli::parse()
}
