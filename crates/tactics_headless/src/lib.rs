//! Headless runner for CI verification and balance testing.
//!
//! This crate drives the tactics core without any presentation layer. It
//! owns everything the core deliberately leaves out: reading content files,
//! persisting run snapshots, and playing runs unattended. This enables:
//!
//! - **CI verification**: the same seed must always produce the same run
//! - **Balance testing**: play thousands of runs in parallel and tally results
//! - **Replay verification**: check that recorded battles still resolve the same
//!
//! # Output
//!
//! - **stdout**: results as JSON
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Resolve one battle
//! cargo run -p tactics_headless -- battle --seed 42 --opponent slime_pack
//!
//! # Play five battles and keep the run for later
//! cargo run -p tactics_headless -- run --seed 42 --battles 5 --save run.ron
//!
//! # Verify determinism across many seeds
//! cargo run -p tactics_headless -- batch --count 500 --verify
//! ```

pub mod autopilot;
pub mod batch;
pub mod data_loader;
pub mod error;

pub use autopilot::{new_run, play, AutopilotConfig, AutopilotSummary, BattleSummary, PickPolicy};
pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary, RunMetrics};
pub use data_loader::{GameData, LoadError};
pub use error::CliError;
