//! Battle replays.
//!
//! A replay stores what is needed to re-resolve one battle: the run seed,
//! the battle index, both rosters and the battle settings. The recorded
//! outcome hash lets a reader check that the current build still resolves
//! the battle the same way.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::{Battle, BattleConfig, BattleOutcome, Winner};
use crate::error::{Result, TacticsError};
use crate::rng::ForkRng;
use crate::roster::RosterUnit;
use crate::run::battle_rng;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 2;

/// One recorded battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Root seed of the run.
    pub run_seed: u64,
    /// Battle index within the run.
    pub battle_index: u32,
    /// Opponent fought.
    pub opponent_id: String,
    /// Player roster at battle start.
    pub player: Vec<RosterUnit>,
    /// Enemy roster at battle start.
    pub enemy: Vec<RosterUnit>,
    /// Battle settings.
    pub config: BattleConfig,
    /// Recorded winner.
    pub winner: Winner,
    /// Recorded turn count.
    pub turns_taken: u32,
    /// Recorded outcome hash.
    pub final_hash: u64,
}

impl BattleReplay {
    /// Resolve a battle and record it.
    #[must_use]
    pub fn record(
        run_seed: u64,
        battle_index: u32,
        opponent_id: impl Into<String>,
        player: Vec<RosterUnit>,
        enemy: Vec<RosterUnit>,
        config: BattleConfig,
    ) -> (Self, BattleOutcome) {
        let mut replay = Self {
            version: REPLAY_VERSION,
            run_seed,
            battle_index,
            opponent_id: opponent_id.into(),
            player,
            enemy,
            config,
            winner: Winner::Draw,
            turns_taken: 0,
            final_hash: 0,
        };
        let outcome = replay.resolve();
        replay.winner = outcome.winner;
        replay.turns_taken = outcome.turns_taken;
        replay.final_hash = outcome.state_hash();
        (replay, outcome)
    }

    /// Battle at its starting state, for stepping turn by turn.
    #[must_use]
    pub fn restore(&self) -> Battle {
        Battle::new(
            &self.player,
            &self.enemy,
            battle_rng(&ForkRng::new(self.run_seed), self.battle_index),
            self.battle_index,
            &self.opponent_id,
            self.config,
        )
    }

    /// Resolve the recorded battle again.
    #[must_use]
    pub fn resolve(&self) -> BattleOutcome {
        self.restore().run()
    }

    /// Whether re-resolving reproduces the recorded outcome.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.resolve().state_hash() == self.final_hash
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| TacticsError::Replay(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| TacticsError::Replay(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if reading or decoding fails, or the version differs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| TacticsError::Replay(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Decode a replay.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the version differs.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| TacticsError::Replay(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(TacticsError::Replay(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }
        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::{AffinityState, Element};
    use crate::data::OpponentCatalog;
    use crate::roster::UnitId;

    fn sample() -> (BattleReplay, BattleOutcome) {
        let catalog = OpponentCatalog::builtin();
        let player: Vec<RosterUnit> = catalog
            .get("bandit_camp")
            .unwrap()
            .units
            .iter()
            .enumerate()
            .map(|(n, t)| RosterUnit::from_template(t, UnitId::recruit(n as u32)))
            .collect();
        let enemy = catalog.get("goblin_raiders").unwrap().enemy_roster(4);
        let config = BattleConfig::default().with_affinity(AffinityState::aligned(Element::Fire));
        BattleReplay::record(12345, 4, "goblin_raiders", player, enemy, config)
    }

    #[test]
    fn test_record_matches_outcome() {
        let (replay, outcome) = sample();
        assert_eq!(replay.winner, outcome.winner);
        assert_eq!(replay.turns_taken, outcome.turns_taken);
        assert!(replay.verify());
    }

    #[test]
    fn test_final_hash_covers_encoded_outcome() {
        let (replay, outcome) = sample();
        let bytes = bincode::serialize(&outcome).unwrap();
        assert_eq!(replay.final_hash, crate::rng::fnv1a(0x43, &bytes));
    }

    #[test]
    fn test_tampered_hash_fails_verification() {
        let (mut replay, _) = sample();
        replay.final_hash ^= 1;
        assert!(!replay.verify());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (replay, _) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("battle.replay");
        replay.save(&path).unwrap();
        let loaded = BattleReplay::load(&path).unwrap();
        assert_eq!(loaded, replay);
        assert!(loaded.verify());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (mut replay, _) = sample();
        replay.version = REPLAY_VERSION + 1;
        let bytes = bincode::serialize(&replay).unwrap();
        let err = BattleReplay::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_restore_steps_to_same_outcome() {
        let (replay, outcome) = sample();
        let mut battle = replay.restore();
        let mut turns = 0;
        while battle.step_turn().is_none() {
            turns += 1;
        }
        assert!(turns <= outcome.turns_taken);
        assert_eq!(battle.actions(), outcome.actions.as_slice());
    }
}
