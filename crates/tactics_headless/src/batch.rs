//! Batch runner for balance testing.
//!
//! Plays many independent runs in parallel using rayon. Each run owns its
//! own root `ForkRng`, so results do not depend on scheduling or thread
//! count.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tactics_core::affinity::Element;
use tactics_core::combat::Winner;

use crate::autopilot::{new_run, play, AutopilotConfig, AutopilotSummary};
use crate::data_loader::GameData;

/// Configuration for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// First run seed; run `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Number of runs.
    pub run_count: u32,
    /// Maximum parallel runs (0 = rayon default).
    pub parallel_runs: u32,
    /// Alignment for every run.
    pub alignment: Option<Element>,
    /// How each run is played.
    pub autopilot: AutopilotConfig,
    /// Play each seed twice and flag runs whose sessions differ.
    pub verify_determinism: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            seed_start: 0,
            run_count: 100,
            parallel_runs: 0,
            alignment: None,
            autopilot: AutopilotConfig::default(),
            verify_determinism: false,
        }
    }
}

/// Metrics of one run in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Run seed.
    pub seed: u64,
    /// Battles fought.
    pub battles: u32,
    /// Player wins.
    pub wins: u32,
    /// Enemy wins.
    pub losses: u32,
    /// Draws.
    pub draws: u32,
    /// Turns summed over every battle.
    pub total_turns: u32,
    /// Experience earned.
    pub experience: i32,
    /// Opponent fought and winner, per battle.
    pub fights: Vec<(String, Winner)>,
    /// Session hash of the first play-through.
    pub session_hash: u64,
    /// Whether a second play-through matched (true when not checked).
    pub deterministic: bool,
}

impl RunMetrics {
    fn from_summary(summary: &AutopilotSummary, deterministic: bool) -> Self {
        let count = |winner: Winner| {
            summary
                .battles
                .iter()
                .filter(|b| b.winner == winner)
                .count() as u32
        };
        Self {
            seed: summary.run_seed,
            battles: summary.battles.len() as u32,
            wins: count(Winner::Player),
            losses: count(Winner::Enemy),
            draws: count(Winner::Draw),
            total_turns: summary.battles.iter().map(|b| b.turns_taken).sum(),
            experience: summary.total_experience,
            fights: summary
                .battles
                .iter()
                .map(|b| (b.opponent_id.clone(), b.winner))
                .collect(),
            session_hash: summary.session_hash,
            deterministic,
        }
    }
}

/// Error from one run of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index within the batch.
    pub run_index: u32,
    /// Run seed.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Per-opponent tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpponentStats {
    /// Times fought.
    pub fought: u32,
    /// Player wins against it.
    pub player_wins: u32,
    /// Player win rate against it.
    pub win_rate: f64,
}

/// Aggregates over every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs completed.
    pub runs: u32,
    /// Battles fought.
    pub battles: u32,
    /// Player wins.
    pub player_wins: u32,
    /// Enemy wins.
    pub enemy_wins: u32,
    /// Draws.
    pub draws: u32,
    /// Player wins over battles.
    pub win_rate: f64,
    /// Mean turns per battle.
    pub avg_turns: f64,
    /// Mean experience per run.
    pub avg_experience: f64,
    /// Tallies keyed by opponent id.
    pub opponents: BTreeMap<String, OpponentStats>,
    /// Seeds whose replays diverged.
    pub nondeterministic_seeds: Vec<u64>,
}

impl BatchSummary {
    /// Aggregate run metrics.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        let mut summary = Self {
            runs: runs.len() as u32,
            ..Self::default()
        };
        let mut turns = 0u64;
        let mut experience = 0i64;

        for run in runs {
            summary.battles += run.battles;
            summary.player_wins += run.wins;
            summary.enemy_wins += run.losses;
            summary.draws += run.draws;
            turns += u64::from(run.total_turns);
            experience += i64::from(run.experience);
            if !run.deterministic {
                summary.nondeterministic_seeds.push(run.seed);
            }
            for (opponent, winner) in &run.fights {
                let entry = summary.opponents.entry(opponent.clone()).or_default();
                entry.fought += 1;
                if *winner == Winner::Player {
                    entry.player_wins += 1;
                }
            }
        }

        for stats in summary.opponents.values_mut() {
            stats.win_rate = f64::from(stats.player_wins) / f64::from(stats.fought.max(1));
        }
        let battles = f64::from(summary.battles.max(1));
        summary.win_rate = f64::from(summary.player_wins) / battles;
        summary.avg_turns = turns as f64 / battles;
        summary.avg_experience = experience as f64 / f64::from(summary.runs.max(1));
        summary
    }

    /// Whether every checked run replayed identically.
    #[must_use]
    pub fn all_deterministic(&self) -> bool {
        self.nondeterministic_seeds.is_empty()
    }
}

/// Results of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-run metrics, ordered by seed.
    pub runs: Vec<RunMetrics>,
    /// Aggregates.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Runs that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn run_single(seed: u64, data: &GameData, config: &BatchConfig) -> Result<RunMetrics, String> {
    let session = || {
        let mut run = new_run(seed, &data.recruits, config.alignment);
        play(&mut run, data, &config.autopilot).map_err(|e| e.to_string())
    };

    let first = session()?;
    let deterministic = if config.verify_determinism {
        session()? == first
    } else {
        true
    };
    if !deterministic {
        warn!(seed, "Run diverged on replay");
    }
    Ok(RunMetrics::from_summary(&first, deterministic))
}

/// Play every run of the batch.
#[must_use]
pub fn run_batch(config: BatchConfig, data: &GameData) -> BatchResults {
    let start = Instant::now();
    info!(
        runs = config.run_count,
        seed_start = config.seed_start,
        battles = config.autopilot.battles,
        "Starting batch"
    );

    let play_all = || -> Vec<Result<RunMetrics, BatchError>> {
        (0..config.run_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_single(seed, data, &config).map_err(|message| {
                    warn!("Run {} failed: {}", i, message);
                    BatchError {
                        run_index: i,
                        seed,
                        message,
                    }
                })
            })
            .collect()
    };

    let results = if config.parallel_runs > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build()
        {
            Ok(pool) => pool.install(play_all),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using global pool", e);
                play_all()
            }
        }
    } else {
        play_all()
    };

    let mut runs = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => runs.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    debug!(nondeterministic = ?summary.nondeterministic_seeds, "Determinism check");
    info!(
        "Batch complete: {} runs in {:.1}s ({:.1} runs/sec)",
        runs.len(),
        duration_seconds,
        runs.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(seed: u64, fights: &[(&str, Winner)], deterministic: bool) -> RunMetrics {
        let count = |w: Winner| fights.iter().filter(|(_, x)| *x == w).count() as u32;
        RunMetrics {
            seed,
            battles: fights.len() as u32,
            wins: count(Winner::Player),
            losses: count(Winner::Enemy),
            draws: count(Winner::Draw),
            total_turns: 10 * fights.len() as u32,
            experience: 100,
            fights: fights.iter().map(|(o, w)| ((*o).to_string(), *w)).collect(),
            session_hash: seed,
            deterministic,
        }
    }

    #[test]
    fn test_summary_aggregates() {
        let runs = vec![
            metrics(1, &[("a", Winner::Player), ("b", Winner::Enemy)], true),
            metrics(2, &[("a", Winner::Player), ("a", Winner::Draw)], false),
        ];
        let summary = BatchSummary::from_runs(&runs);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.battles, 4);
        assert_eq!(summary.player_wins, 2);
        assert_eq!(summary.enemy_wins, 1);
        assert_eq!(summary.draws, 1);
        assert!((summary.win_rate - 0.5).abs() < 1e-9);
        assert!((summary.avg_turns - 10.0).abs() < 1e-9);
        assert_eq!(summary.opponents["a"].fought, 3);
        assert_eq!(summary.opponents["a"].player_wins, 2);
        assert_eq!(summary.nondeterministic_seeds, vec![2]);
        assert!(!summary.all_deterministic());
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_runs(&[]);
        assert_eq!(summary.runs, 0);
        assert!(summary.win_rate.abs() < 1e-9);
        assert!(summary.all_deterministic());
    }

    #[test]
    fn test_small_batch_is_deterministic() {
        let data = GameData::builtin();
        let config = BatchConfig {
            seed_start: 40,
            run_count: 4,
            parallel_runs: 2,
            autopilot: AutopilotConfig::default().with_battles(2),
            verify_determinism: true,
            ..BatchConfig::default()
        };
        let results = run_batch(config, &data);
        assert!(results.errors.is_empty());
        assert_eq!(results.runs.len(), 4);
        assert_eq!(results.summary.battles, 8);
        assert!(results.summary.all_deterministic());
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![40, 41, 42, 43]);
    }
}
