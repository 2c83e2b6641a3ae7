//! # Tactics Core
//!
//! Deterministic core of a turn-based tactical RPG.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond replay files
//! - No system randomness
//! - No floating-point stat math (integer percentages)
//!
//! Every RNG-derived artifact (opponent offers, battles, rewards) is a pure
//! function of the run seed and a fork label path, which enables:
//! - Save/resume without serializing RNG state
//! - Battle replays
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`rng`] - Hierarchical fork RNG
//! - [`stats`] - Stat composition pipeline
//! - [`affinity`] - Elemental alignment multipliers and granted abilities
//! - [`combat`] - Turn-based battle resolution
//! - [`choice`] - Constrained opponent offers
//! - [`rewards`] - Post-battle rewards
//! - [`run`] - Thin run orchestrator and snapshots
//! - [`replay`] - Recorded battles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod affinity;
pub mod choice;
pub mod combat;
pub mod data;
pub mod error;
pub mod math;
pub mod replay;
pub mod rewards;
pub mod rng;
pub mod roster;
pub mod run;
pub mod stats;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{Ability, AbilityError, EffectKind, TargetScope};
    pub use crate::affinity::{AffinityRelation, AffinityState, Element};
    pub use crate::choice::{
        generate_choices, generate_choices_detailed, ChoiceConfig, ChoiceOutcome, OpponentPreview,
    };
    pub use crate::combat::{
        resolve_battle, resolve_battle_with, ActionKind, Battle, BattleAction, BattleConfig,
        BattleOutcome, CombatUnit, Side, Winner, MAX_TURNS,
    };
    pub use crate::data::{
        Difficulty, ItemDef, LootTable, OpponentCatalog, OpponentSpec, Rarity, Role, UnitTemplate,
    };
    pub use crate::error::{CatalogError, Result, RunError, TacticsError};
    pub use crate::math::Percent;
    pub use crate::replay::BattleReplay;
    pub use crate::rewards::{generate_rewards, RewardBundle, RewardConfig};
    pub use crate::rng::{ForkLabel, ForkRng};
    pub use crate::roster::{RosterUnit, UnitId};
    pub use crate::run::{BattleReport, Progression, Run, RunSnapshot};
    pub use crate::stats::{compose, BaseStats, EquipmentDelta, FinalStats, Rank, Subclass};
}
