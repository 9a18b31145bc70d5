//! # quiver_sim
//!
//! Drives a quiver world through a fixed-timestep frame loop: entities move,
//! lose health, stop, and are periodically despawned and replaced.

mod components;
mod tick;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tick::{SimConfig, SimLoop};

#[derive(Parser)]
#[command(name = "quiver_sim", about = "Fixed-timestep simulation over a quiver world")]
struct Args {
    /// Entities alive at startup
    #[arg(short, long, default_value_t = 1_000)]
    entities: usize,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Target frames per second (0 = unthrottled)
    #[arg(short, long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Frames between despawning the oldest entity (0 = never)
    #[arg(short, long, default_value_t = 10)]
    despawn_interval: u64,

    /// Log entity lifecycle and per-frame statistics
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut filter = EnvFilter::from_default_env().add_directive("quiver_sim=info".parse()?);
    if args.verbose {
        filter = filter
            .add_directive("quiver_sim=debug".parse()?)
            .add_directive("quiver=debug".parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("quiver simulation starting");

    let mut sim = SimLoop::new(SimConfig {
        entities: args.entities,
        tick_rate: args.tick_rate,
        max_frames: args.frames,
        despawn_interval: args.despawn_interval,
        log_lifecycle: args.verbose,
    })?;
    sim.run()?;

    info!(
        frames = sim.frame(),
        live = sim.world().entity_count(),
        "quiver simulation finished"
    );
    Ok(())
}
