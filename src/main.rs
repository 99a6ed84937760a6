use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use gated_traffic::simulation::{draw_map, Pipeline, RoadNetwork, SimConfig};

#[derive(Parser)]
#[command(name = "gated_traffic")]
#[command(about = "Pedestrian flow simulation with gate-controlled intersections")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Population at which spawning stops
    #[arg(long, default_value = "30")]
    max_population: usize,

    /// Blocked ticks before an agent replans
    #[arg(long, default_value = "4")]
    stall_threshold: u32,

    /// Chance that an agent cleared to move actually moves
    #[arg(long, default_value = "0.8")]
    advance_probability: f64,

    /// Spawn agents that never replan
    #[arg(long)]
    dumb_agents: bool,

    /// Print the map every N ticks (0 disables)
    #[arg(long, default_value = "0")]
    draw_every: u64,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,gated_traffic=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(err) = run_headless(&cli) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    let config = SimConfig {
        seed: cli.seed,
        max_population: cli.max_population,
        stall_threshold: cli.stall_threshold,
        advance_probability: cli.advance_probability.clamp(0.0, 1.0),
        smart_agents: !cli.dumb_agents,
        ..SimConfig::default()
    };

    let network = Arc::new(RoadNetwork::campus().context("Building campus network")?);
    let pipeline = Pipeline::new(Arc::clone(&network), config)?;

    let report = pipeline.run(cli.ticks, |frame| {
        if cli.draw_every > 0 && frame.tick % cli.draw_every == 0 {
            println!("{}", draw_map(&network, frame));
        }
    })?;

    report.log();
    Ok(())
}
