//! Headless tactics runner.
//!
//! This binary resolves battles, offers and whole runs without any
//! presentation layer. Designed for CI determinism checks, balance batches
//! and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Resolve one battle against a catalog opponent
//! cargo run -p tactics_headless -- battle --seed 42 --opponent wolf_den --align fire
//!
//! # Show the three-way offer for a battle
//! cargo run -p tactics_headless -- choices --seed 42 --battle 3
//!
//! # Play a run on autopilot, saving it, then continue later
//! cargo run -p tactics_headless -- run --seed 42 --battles 3 --save run.ron
//! cargo run -p tactics_headless -- run --resume run.ron --battles 3
//!
//! # Run batch balance test
//! cargo run -p tactics_headless -- batch --count 1000 --output results/batch.json
//!
//! # Record and verify a replay
//! cargo run -p tactics_headless -- battle --seed 7 --opponent shadow_cult --record b.replay
//! cargo run -p tactics_headless -- replay --file b.replay --verify
//! ```
//!
//! # Output
//!
//! Results (stdout): pretty JSON
//! Logs (stderr): human-readable, `--verbose` for debug level

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_core::affinity::{AffinityState, Element};
use tactics_core::choice::{generate_choices_detailed, ChoiceConfig};
use tactics_core::combat::{resolve_battle_with, BattleConfig, BattleOutcome, Winner};
use tactics_core::replay::BattleReplay;
use tactics_core::rng::ForkRng;
use tactics_core::run::{battle_rng, choice_rng, Run};

use tactics_headless::{
    autopilot::{new_run, play, AutopilotConfig, PickPolicy},
    batch::{run_batch, BatchConfig},
    data_loader::{load_snapshot, save_snapshot, GameData},
    error::{parse_element, CliError},
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactics runner for determinism checks and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding opponents.ron, loot.ron and recruits.ron
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single battle
    Battle {
        /// Run seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Catalog id of the opponent
        #[arg(short, long, default_value = "slime_pack")]
        opponent: String,

        /// Battle index within the run
        #[arg(short, long, default_value = "0")]
        battle: u32,

        /// Alignment element (fire, water, earth, wind, light, dark)
        #[arg(short, long)]
        align: Option<String>,

        /// Turn on which the alignment is activated
        #[arg(long)]
        activate_at: Option<u32>,

        /// Write a replay file of the battle
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Show the opponent offer for a battle
    Choices {
        /// Run seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Battle index within the run
        #[arg(short, long, default_value = "0")]
        battle: u32,

        /// Maximum resampling attempts
        #[arg(long, default_value = "16")]
        attempts: u32,
    },

    /// Play a run on autopilot
    Run {
        /// Run seed (ignored with --resume)
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Battles to fight
        #[arg(short, long, default_value = "5")]
        battles: u32,

        /// How to pick among the three previews
        #[arg(long, value_enum, default_value = "first")]
        pick: PickPolicy,

        /// Alignment element (ignored with --resume)
        #[arg(short, long)]
        align: Option<String>,

        /// Restore MP after every battle
        #[arg(long)]
        rest: bool,

        /// Stop after the first battle not won
        #[arg(long)]
        stop_on_loss: bool,

        /// Continue the run saved in this snapshot
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Save the run snapshot here when done
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Verify determinism by playing the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Battles per run
        #[arg(short, long, default_value = "5")]
        battles: u32,

        /// Alignment element
        #[arg(short, long)]
        align: Option<String>,
    },

    /// Play many seeds in parallel for balance testing
    Batch {
        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Battles per run
        #[arg(short, long, default_value = "5")]
        battles: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// How to pick among the three previews
        #[arg(long, value_enum, default_value = "first")]
        pick: PickPolicy,

        /// Alignment element for every run
        #[arg(short, long)]
        align: Option<String>,

        /// Play each seed twice and compare
        #[arg(long)]
        verify: bool,

        /// Save full results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or verify a battle replay
    Replay {
        /// Replay file
        #[arg(short, long)]
        file: PathBuf,

        /// Re-resolve the battle and compare hashes
        #[arg(long)]
        verify: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    if let Err(e) = dispatch(cli) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let data = GameData::resolve(cli.data.as_deref())?;

    match cli.command {
        Commands::Battle {
            seed,
            opponent,
            battle,
            align,
            activate_at,
            record,
        } => cmd_battle(&data, seed, &opponent, battle, align, activate_at, record),
        Commands::Choices {
            seed,
            battle,
            attempts,
        } => cmd_choices(&data, seed, battle, attempts),
        Commands::Run {
            seed,
            battles,
            pick,
            align,
            rest,
            stop_on_loss,
            resume,
            save,
        } => {
            let config = AutopilotConfig::default()
                .with_battles(battles)
                .with_pick(pick)
                .with_rest(rest)
                .with_stop_on_loss(stop_on_loss);
            cmd_run(&data, seed, align, &config, resume, save)
        }
        Commands::Verify {
            seed,
            runs,
            battles,
            align,
        } => cmd_verify(&data, seed, runs, battles, align),
        Commands::Batch {
            count,
            seed,
            battles,
            parallel,
            pick,
            align,
            verify,
            output,
        } => {
            let config = BatchConfig {
                seed_start: seed,
                run_count: count,
                parallel_runs: parallel,
                alignment: parse_alignment(align)?,
                autopilot: AutopilotConfig::default()
                    .with_battles(battles)
                    .with_pick(pick),
                verify_determinism: verify,
            };
            cmd_batch(&data, config, output.as_deref())
        }
        Commands::Replay { file, verify } => cmd_replay(&file, verify),
    }
}

fn emit<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_alignment(align: Option<String>) -> Result<Option<Element>, CliError> {
    align.as_deref().map(parse_element).transpose()
}

#[derive(Serialize)]
struct BattleOutput<'a> {
    state_hash: u64,
    outcome: &'a BattleOutcome,
}

/// Resolve one battle of a fresh run against a named opponent
fn cmd_battle(
    data: &GameData,
    seed: u64,
    opponent: &str,
    battle_index: u32,
    align: Option<String>,
    activate_at: Option<u32>,
    record: Option<PathBuf>,
) -> Result<(), CliError> {
    let spec = data
        .catalog
        .get(opponent)
        .ok_or_else(|| CliError::UnknownOpponent(opponent.to_string()))?;
    let alignment = parse_alignment(align)?;

    let mut config = BattleConfig::default();
    if let Some(element) = alignment {
        config = config.with_affinity(AffinityState::aligned(element));
    }
    if let Some(turn) = activate_at {
        config = config.with_activation_turn(turn);
    }

    let player = new_run(seed, &data.recruits, alignment).team().to_vec();
    let enemy = spec.enemy_roster(battle_index);
    tracing::info!(
        seed,
        opponent,
        battle = battle_index,
        alignment = ?alignment,
        "Resolving battle"
    );

    let outcome = if let Some(path) = record {
        let (replay, outcome) =
            BattleReplay::record(seed, battle_index, opponent, player, enemy, config);
        replay.save(&path)?;
        tracing::info!(path = %path.display(), "Replay recorded");
        outcome
    } else {
        resolve_battle_with(
            &player,
            &enemy,
            battle_rng(&ForkRng::new(seed), battle_index),
            battle_index,
            opponent,
            &config,
        )
    };

    emit(&BattleOutput {
        state_hash: outcome.state_hash(),
        outcome: &outcome,
    })
}

/// Print the offer for one battle
fn cmd_choices(data: &GameData, seed: u64, battle_index: u32, attempts: u32) -> Result<(), CliError> {
    let config = ChoiceConfig::default().with_max_attempts(attempts);
    let outcome = generate_choices_detailed(
        &choice_rng(&ForkRng::new(seed), battle_index),
        battle_index,
        &data.catalog,
        None,
        &config,
    );
    if outcome.degraded {
        tracing::warn!(attempts = outcome.attempts, "Offer did not satisfy every rule");
    }
    emit(&outcome)
}

/// Play a run on autopilot, optionally resuming and saving a snapshot
fn cmd_run(
    data: &GameData,
    seed: u64,
    align: Option<String>,
    config: &AutopilotConfig,
    resume: Option<PathBuf>,
    save: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut run = match resume {
        Some(path) => {
            let run = Run::resume(load_snapshot(&path)?)?;
            tracing::info!(
                path = %path.display(),
                seed = run.run_seed(),
                battle = run.battle_index(),
                "Resumed run"
            );
            run
        }
        None => new_run(seed, &data.recruits, parse_alignment(align)?),
    };

    let summary = play(&mut run, data, config)?;
    if let Some(path) = save {
        save_snapshot(&path, &run.snapshot())?;
    }
    emit(&summary)
}

#[derive(Serialize)]
struct VerifyOutput {
    seed: u64,
    runs: u32,
    hashes: Vec<u64>,
    deterministic: bool,
}

/// Play the same seed several times and compare session hashes
fn cmd_verify(
    data: &GameData,
    seed: u64,
    runs: u32,
    battles: u32,
    align: Option<String>,
) -> Result<(), CliError> {
    let alignment = parse_alignment(align)?;
    let config = AutopilotConfig::default().with_battles(battles);
    tracing::info!(seed, runs, battles, "Verifying determinism");

    let mut hashes = Vec::with_capacity(runs as usize);
    for _ in 0..runs {
        let mut run = new_run(seed, &data.recruits, alignment);
        hashes.push(play(&mut run, data, &config)?.session_hash);
    }

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    emit(&VerifyOutput {
        seed,
        runs,
        hashes: hashes.clone(),
        deterministic,
    })?;

    if deterministic {
        tracing::info!(seed, "Determinism verified");
        Ok(())
    } else {
        Err(CliError::Nondeterministic {
            seed,
            detail: format!("session hashes {hashes:x?}"),
        })
    }
}

/// Play a batch and print its summary
fn cmd_batch(data: &GameData, config: BatchConfig, output: Option<&Path>) -> Result<(), CliError> {
    let verify = config.verify_determinism;
    let results = run_batch(config, data);

    if let Some(path) = output {
        results.save(path)?;
        tracing::info!(path = %path.display(), "Results saved");
    }
    emit(&results.summary)?;

    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Run {} (seed {}): {}",
            error.run_index, error.seed, error.message
        );
    }

    match results.summary.nondeterministic_seeds.first() {
        Some(&seed) if verify => Err(CliError::Nondeterministic {
            seed,
            detail: format!(
                "{} of {} runs diverged",
                results.summary.nondeterministic_seeds.len(),
                results.summary.runs
            ),
        }),
        _ => Ok(()),
    }
}

#[derive(Serialize)]
struct ReplayOutput {
    version: u32,
    run_seed: u64,
    battle_index: u32,
    opponent_id: String,
    winner: Winner,
    turns_taken: u32,
    final_hash: u64,
    verified: Option<bool>,
}

/// Load a replay, optionally re-resolving it
fn cmd_replay(file: &Path, verify: bool) -> Result<(), CliError> {
    let replay = BattleReplay::load(file)?;
    tracing::info!(
        path = %file.display(),
        seed = replay.run_seed,
        battle = replay.battle_index,
        "Loaded replay"
    );

    let resolved = verify.then(|| replay.resolve().state_hash());
    emit(&ReplayOutput {
        version: replay.version,
        run_seed: replay.run_seed,
        battle_index: replay.battle_index,
        opponent_id: replay.opponent_id.clone(),
        winner: replay.winner,
        turns_taken: replay.turns_taken,
        final_hash: replay.final_hash,
        verified: resolved.map(|hash| hash == replay.final_hash),
    })?;

    match resolved {
        Some(hash) if hash != replay.final_hash => Err(CliError::ReplayMismatch {
            recorded: replay.final_hash,
            resolved: hash,
        }),
        _ => Ok(()),
    }
}
