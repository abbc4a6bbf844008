use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use tracing_subscriber::EnvFilter;
use wavegrid_bridge::{dispatch, DebugTextBridge};
use wavegrid_engine::{Engine, EngineConfig};
use wavegrid_kernel::WorldGrid;
use wavegrid_rules::TileRuleSet;
use wavegrid_stream::FrameTimer;

#[derive(Parser)]
#[command(name = "wavegrid-cli", about = "Headless driver for wavegrid world generation")]
struct Cli {
    /// Tracing filter (RUST_LOG syntax, e.g. `debug` or `wavegrid_stream=trace`)
    #[arg(long, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Validate a YAML rule profile
    Validate {
        /// Path to the rule profile
        rules: PathBuf,
    },
    /// Run a headless generation session with a scripted observer
    Run {
        /// Number of frames to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// RNG seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Window radius in cells (overrides the config file)
        #[arg(short, long)]
        radius: Option<i32>,
        /// Scheduled collapses per frame (overrides the config file)
        #[arg(short, long)]
        budget: Option<usize>,
        /// YAML rule profile (defaults to the built-in open-space rules)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// YAML engine config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Observer waypoints as `x,z` world positions, walked in order
        #[arg(long, default_value = "0,0 120,0 120,120")]
        observer_path: String,
        /// Observer speed in world units per second
        #[arg(long, default_value = "6.0")]
        speed: f32,
        /// Dump every world event as a JSON line
        #[arg(long)]
        json: bool,
        /// Print the debug bridge transcript after the run
        #[arg(long)]
        events: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    match cli.command {
        Commands::Info => {
            println!("wavegrid-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", wavegrid_common::crate_info());
            println!("rules: {}", wavegrid_rules::crate_info());
            println!("kernel: resident={}", WorldGrid::new().len());
            println!("collapse: {}", wavegrid_collapse::crate_info());
            println!("stream: {}", wavegrid_stream::crate_info());
            println!("bridge: {}", wavegrid_bridge::crate_info());
            println!("engine: {}", wavegrid_engine::crate_info());
        }
        Commands::Validate { rules } => {
            let profile = TileRuleSet::load(&rules)
                .with_context(|| format!("validating {}", rules.display()))?;
            println!(
                "profile `{}`: {} tiles",
                profile.name(),
                profile.alphabet().len()
            );
            for tile in profile.alphabet().iter() {
                println!("  {tile:?}: weight {}", profile.weight(tile));
            }
            println!("OK");
        }
        Commands::Run {
            ticks,
            seed,
            radius,
            budget,
            rules,
            config,
            observer_path,
            speed,
            json,
            events,
        } => {
            let mut engine_config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            if let Some(path) = rules {
                engine_config.rules = TileRuleSet::load(&path)
                    .with_context(|| format!("loading rules {}", path.display()))?;
            }
            if let Some(seed) = seed {
                engine_config.rng_seed = seed;
            }
            if let Some(radius) = radius {
                engine_config.window_radius = radius;
            }
            if let Some(budget) = budget {
                engine_config.max_collapses_per_frame = budget;
            }

            let waypoints = parse_observer_path(&observer_path)?;
            let mut engine = Engine::new(engine_config)?;
            let mut bridge = DebugTextBridge::new();
            let mut timer = FrameTimer::new(240);

            println!(
                "run: profile `{}`, seed {}, radius {}, budget {}, {} ticks",
                engine.config().rules.name(),
                engine.config().rng_seed,
                engine.config().window_radius,
                engine.config().max_collapses_per_frame,
                ticks,
            );

            // Fixed simulated timestep keeps runs reproducible regardless of
            // how fast the host executes them.
            let dt = Duration::from_millis(33);
            let mut observer = waypoints[0];
            let mut leg = 1;

            for _ in 0..ticks {
                let start = Instant::now();
                engine.advance(observer, dt)?;
                timer.record(start.elapsed());

                let drained = engine.drain_events();
                if json {
                    for event in &drained {
                        println!("{}", serde_json::to_string(event)?);
                    }
                }
                dispatch(&mut bridge, &drained);

                observer = step_along(observer, &waypoints, &mut leg, speed * dt.as_secs_f32());
            }

            if events {
                print!("{}", bridge.render());
            }

            let stats = engine.stats();
            println!("frames: {}", stats.frame);
            println!("resident cells: {}", stats.resident_cells);
            println!(
                "collapses: {} ({} contradictions resolved)",
                stats.collapse_count, stats.contradiction_count
            );
            println!("evictions: {}", stats.eviction_count);
            println!(
                "bridge: {} placements, {} releases",
                bridge.collapses(),
                bridge.evictions()
            );
            println!(
                "frame time: avg {:?}, max {:?} over {} samples",
                timer.average(),
                timer.max(),
                timer.count()
            );
        }
    }

    Ok(())
}

/// Parse a whitespace-separated list of `x,z` world-space waypoints.
fn parse_observer_path(text: &str) -> anyhow::Result<Vec<Vec3>> {
    let mut points = Vec::new();
    for pair in text.split_whitespace() {
        let (x, z) = pair
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("waypoint `{pair}` is not of the form x,z"))?;
        points.push(Vec3::new(x.trim().parse()?, 0.0, z.trim().parse()?));
    }
    anyhow::ensure!(!points.is_empty(), "observer path needs at least one waypoint");
    Ok(points)
}

/// Advance the observer `step` world units along the waypoint list. Legs are
/// walked in order; the observer stops at the final waypoint.
fn step_along(mut position: Vec3, waypoints: &[Vec3], leg: &mut usize, step: f32) -> Vec3 {
    let mut remaining = step;
    while remaining > 0.0 {
        let Some(&target) = waypoints.get(*leg) else {
            break;
        };
        let offset = target - position;
        let distance = offset.length();
        if distance <= remaining {
            position = target;
            remaining -= distance;
            *leg += 1;
        } else {
            position += offset * (remaining / distance);
            break;
        }
    }
    position
}
