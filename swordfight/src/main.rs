//! # Swordfight
//!
//! Drives the sword-fight environment with a uniform random policy. Useful
//! for checking a simulator setup end to end before training against it.
//! Pass `--mock` to run without a simulator at all.

mod app;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swordfight", about = "Random-policy sword-fight episodes")]
pub struct Args {
    /// Environment config (JSON); defaults match the stock scene
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Simulator address
    #[arg(long, default_value = sim::DEFAULT_ADDR)]
    pub addr: String,

    /// Ask the simulator to open its window
    #[arg(long)]
    pub graphical: bool,

    /// Start this simulator program instead of attaching to a running one
    #[arg(long)]
    pub launch: Option<PathBuf>,

    /// Extra argument for the launched simulator; repeat for more
    #[arg(long = "launch-arg", allow_hyphen_values = true)]
    pub launch_args: Vec<String>,

    /// How long a launched simulator gets to start listening
    #[arg(long, default_value_t = sim::DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    #[arg(long, default_value_t = 3)]
    pub episodes: u32,

    /// Steps per episode
    #[arg(long, default_value_t = 30)]
    pub steps: u32,

    /// Draw a new random action every N steps
    #[arg(long, default_value_t = 5)]
    pub resample_every: u32,

    /// Seed for both the opponent stance and the policy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write every camera frame to this directory as PNG
    #[arg(long)]
    pub dump_frames: Option<PathBuf>,

    /// Use the in-process mock simulator
    #[arg(long)]
    pub mock: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    app::run(&Args::parse())
}
