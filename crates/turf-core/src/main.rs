//! Turf Turn Runner
//!
//! Runs the turn coordinator over a scenario for a number of turns, printing
//! what each phase did and optionally saving the resulting store.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use turf_core::events::HistoryLogger;
use turf_core::setup::sample_world;
use turf_core::{EngineConfig, MemoryStore, Store, TurnCoordinator, TurnOutcome};

/// Command line arguments for the turn runner
#[derive(Parser, Debug)]
#[command(name = "turf_sim")]
#[command(about = "Resolve faction turns over a city of contested districts")]
struct Args {
    /// Random seed for reproducibility; defaults to the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of turns to run; defaults to the configured count
    #[arg(long)]
    turns: Option<u32>,

    /// Store snapshot (JSON) to start from instead of the sample city
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Tuning file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Settle pending conflicts as draws instead of stopping at the gate
    #[arg(long)]
    auto_resolve: bool,

    /// Write turn history as JSONL
    #[arg(long)]
    history_out: Option<PathBuf>,

    /// Save the final store snapshot (JSON)
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path).map_err(|e| e.to_string())?,
        None => EngineConfig::load_or_default(),
    };
    let seed = args.seed.unwrap_or(config.simulation.default_seed);
    let turns = args.turns.unwrap_or(config.simulation.default_turns);

    let store = match &args.scenario {
        Some(path) => MemoryStore::load(path).map_err(|e| e.to_string())?,
        None => sample_world().map_err(|e| e.to_string())?,
    };

    println!("Turf Turn Engine");
    println!("================");
    println!("Seed: {}", seed);
    println!("Turns: {}", turns);
    println!(
        "City: {} districts, {} factions, {} pieces",
        store.districts().map_err(|e| e.to_string())?.len(),
        store.factions().map_err(|e| e.to_string())?.len(),
        store.pieces().map_err(|e| e.to_string())?.len(),
    );
    println!();

    let mut coordinator = TurnCoordinator::new(store, config, seed);
    if let Some(path) = &args.history_out {
        let logger = HistoryLogger::new(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        coordinator = coordinator.with_logger(logger);
    }

    for _ in 0..turns {
        let turn = coordinator.turn_state().map_err(|e| e.to_string())?.turn;
        println!("Turn {}", turn);
        match coordinator.run_turn(args.auto_resolve).map_err(|e| e.to_string())? {
            TurnOutcome::Completed(result) => {
                for phase in &result.phases {
                    println!("  {:<28} {}", phase.phase.as_str(), phase.summary);
                }
            }
            TurnOutcome::ConflictsPending { conflicts } => {
                println!("  stopped at the conflict gate with {} pending:", conflicts.len());
                for conflict_id in conflicts {
                    println!("    {}", conflict_id);
                }
                break;
            }
        }
    }

    println!();
    println!("Final standings:");
    let store = coordinator.store();
    for district in store.districts().map_err(|e| e.to_string())? {
        let held: Vec<String> = district
            .present_factions()
            .map(|(faction, points)| format!("{} {}", faction, points))
            .collect();
        println!("  {:<16} pool {:>2}  {}", district.name, district.influence_pool, held.join(", "));
    }

    if let Some(path) = &args.save {
        coordinator.store().save(path).map_err(|e| e.to_string())?;
        println!();
        println!("Saved store to {}", path.display());
    }
    Ok(())
}
