//! # DiZzy FC
//!
//! Arena controller binary. Loads the arena config, opens a hardware
//! backend, and plays rounds until the requested count is reached or the
//! process is interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Simulated arena, prototype config if the file is missing
//! dizzy_fc --simulate
//!
//! # Three rounds from a given config, JSON summary on stdout
//! dizzy_fc -c config/arena.toml --rounds 3 --json
//!
//! # Play until Ctrl-C
//! dizzy_fc -s --rounds 0 -v
//! ```

use clap::Parser;
use dizzy_common::config::{ArenaConfig, ConfigError, load_arena_config};
use dizzy_common::consts::DEFAULT_CONFIG_PATH;
use dizzy_engine::session::{Session, SessionSummary};
use dizzy_hal::driver_registry::BackendRegistry;
use dizzy_hal::drivers::simulation;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// DiZzy FC - two-player robot combat arena controller
#[derive(Parser, Debug)]
#[command(name = "dizzy_fc")]
#[command(author = "DiZzy FC")]
#[command(version)]
#[command(about = "Two-player robot combat arena controller")]
#[command(long_about = None)]
struct Args {
    /// Path to the arena configuration (arena.toml).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation backend; a missing config file falls back to
    /// the prototype arena.
    #[arg(short = 's', long)]
    simulate: bool,

    /// Hardware backend to open.
    #[arg(short, long, default_value = simulation::NAME)]
    backend: String,

    /// Rounds to play (0 = until interrupted).
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and the session summary in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args);

    let level: Level = match &loaded {
        Ok((config, _)) => config.shared.log_level.into(),
        Err(_) => Level::INFO,
    };
    setup_tracing(&args, level);

    info!("DiZzy FC v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|(config, fallback)| {
            if fallback {
                warn!(
                    "Config '{}' not found, using the prototype arena",
                    args.config.display()
                );
            }
            run(&args, config)
        });

    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("DiZzy FC shutdown complete");
}

fn run(args: &Args, config: ArenaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backend_name = if args.simulate {
        info!("Simulation mode enabled");
        simulation::NAME
    } else {
        args.backend.as_str()
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let registry = BackendRegistry::with_builtin();
    let backend = registry.create(backend_name, &config)?;

    let summary = {
        let mut session = Session::open(config, backend, running)?;
        session.run(args.rounds)?
    };
    report(&summary, args.json)?;
    Ok(())
}

/// Load and validate the config; `--simulate` tolerates a missing file.
///
/// The flag in the result is set when the prototype arena was substituted.
fn load_config(args: &Args) -> Result<(ArenaConfig, bool), ConfigError> {
    match load_arena_config(&args.config) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::FileNotFound) if args.simulate => Ok((ArenaConfig::prototype(), true)),
        Err(e) => Err(e),
    }
}

fn report(summary: &SessionSummary, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }
    for result in &summary.rounds {
        println!(
            "Round {}: {} wins ({} hp vs {} hp, {:.1}s)",
            result.round,
            result.winner_name,
            result.final_hp[0],
            result.final_hp[1],
            result.duration_ms as f64 / 1000.0
        );
    }
    println!(
        "Sampler: {} ticks, {} overruns, {} hits, {} dropped",
        summary.sampler.ticks,
        summary.sampler.overruns,
        summary.sampler.events_emitted,
        summary.sampler.dropped_events
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, configured: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
