#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Phalanx battle scenarios headlessly.

mod runner;
mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "phalanx")]
#[command(about = "Play a rank-and-file battle scenario without a renderer", version)]
struct Cli {
    /// Scenario file to load
    #[arg(short, long)]
    scenario: PathBuf,

    /// Number of ticks to simulate, overriding the scenario
    #[arg(long)]
    ticks: Option<u64>,

    /// Simulated milliseconds per tick, overriding the scenario
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Phalanx command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let scenario = Scenario::load(&cli.scenario)?;
    let ticks = cli.ticks.unwrap_or(scenario.ticks);
    let tick_ms = cli.tick_ms.unwrap_or(scenario.tick_ms).max(1);

    let report = runner::run(&scenario, ticks, tick_ms)?;
    print!("{report}");
    Ok(())
}
