//! Thin run orchestrator.
//!
//! Sequences choice generation, combat and rewards for one run, and owns the
//! only state that survives between battles. Every RNG-derived artifact comes
//! from a fork of the run seed:
//!
//! | Phase   | Fork path                 |
//! |---------|---------------------------|
//! | Choices | `root/choice/<battle>`    |
//! | Battle  | `root/battle/<battle>`    |
//! | Rewards | `root/rewards/<battle>`   |
//!
//! so `(run_seed, battle_index)` is enough to regenerate any of them.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::affinity::{AffinityState, Element};
use crate::choice::{generate_choices, ChoiceConfig, OpponentPreview, CHOICES_PER_OFFER};
use crate::combat::{resolve_battle_with, BattleConfig, BattleOutcome, Winner};
use crate::data::{OpponentCatalog, UnitTemplate};
use crate::error::{Result, RunError, TacticsError};
use crate::rewards::{generate_rewards, RewardBundle, RewardConfig};
use crate::rng::ForkRng;
use crate::roster::{RosterUnit, UnitId};

/// Fork for the choice offer of a battle.
#[must_use]
pub fn choice_rng(root: &ForkRng, battle_index: u32) -> ForkRng {
    root.fork("choice").fork(battle_index)
}

/// Fork for a battle.
#[must_use]
pub fn battle_rng(root: &ForkRng, battle_index: u32) -> ForkRng {
    root.fork("battle").fork(battle_index)
}

/// Fork for the rewards of a battle.
#[must_use]
pub fn rewards_rng(root: &ForkRng, battle_index: u32) -> ForkRng {
    root.fork("rewards").fork(battle_index)
}

/// Lifetime counters carried across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Progression {
    /// Runs started.
    pub runs_attempted: u32,
    /// Runs finished.
    pub runs_completed: u32,
    /// Battles won.
    pub battles_won: u32,
    /// Battles lost or drawn.
    pub battles_lost: u32,
    /// Units recruited.
    pub units_recruited: u32,
}

/// Persisted run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Root seed.
    pub run_seed: u64,
    /// Index of the next battle.
    pub battle_index: u32,
    /// Player team in roster order.
    pub player_team: Vec<RosterUnit>,
    /// Offer for the next battle, when one was already generated.
    #[serde(default)]
    pub last_choices: Option<[OpponentPreview; CHOICES_PER_OFFER]>,
    /// Lifetime counters.
    #[serde(default)]
    pub progression: Progression,
    /// Selected alignment.
    #[serde(default)]
    pub alignment: Option<Element>,
    /// Counter for the next recruited unit id.
    #[serde(default)]
    pub next_recruit: u32,
}

impl RunSnapshot {
    /// Serialize to pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            TacticsError::DataParse {
                source_name: "snapshot".to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Parse from RON.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| TacticsError::DataParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Result of one fought battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Battle index.
    pub battle_index: u32,
    /// Opponent fought.
    pub opponent_id: String,
    /// Battle outcome.
    pub outcome: BattleOutcome,
    /// Rewards rolled for the battle, whatever the winner.
    pub rewards: RewardBundle,
}

/// One run in progress.
#[derive(Debug, Clone)]
pub struct Run {
    run_seed: u64,
    root: ForkRng,
    battle_index: u32,
    team: Vec<RosterUnit>,
    alignment: Option<Element>,
    progression: Progression,
    last_choices: Option<[OpponentPreview; CHOICES_PER_OFFER]>,
    next_recruit: u32,
    choice_config: ChoiceConfig,
    battle_config: BattleConfig,
}

impl Run {
    /// Start a fresh run with zeroed counters.
    #[must_use]
    pub fn new(run_seed: u64) -> Self {
        Self::start(run_seed, Progression::default())
    }

    /// Start a fresh run, carrying lifetime counters over.
    #[must_use]
    pub fn start(run_seed: u64, mut progression: Progression) -> Self {
        progression.runs_attempted += 1;
        info!(run_seed, "Run started");
        Self {
            run_seed,
            root: ForkRng::new(run_seed),
            battle_index: 0,
            team: Vec::new(),
            alignment: None,
            progression,
            last_choices: None,
            next_recruit: 0,
            choice_config: ChoiceConfig::default(),
            battle_config: BattleConfig::default(),
        }
    }

    /// Builder method to change choice generation settings.
    #[must_use]
    pub fn with_choice_config(mut self, config: ChoiceConfig) -> Self {
        self.choice_config = config;
        self
    }

    /// Builder method to change battle settings. The affinity part is
    /// replaced by the run's alignment on every fight.
    #[must_use]
    pub fn with_battle_config(mut self, config: BattleConfig) -> Self {
        self.battle_config = config;
        self
    }

    /// Restore a run from a snapshot.
    pub fn resume(snapshot: RunSnapshot) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for unit in &snapshot.player_team {
            if !seen.insert(unit.id) {
                return Err(RunError::InconsistentSnapshot(format!(
                    "duplicate unit id {}",
                    unit.id
                ))
                .into());
            }
            if unit.id.is_recruit() && unit.id >= UnitId::recruit(snapshot.next_recruit) {
                return Err(RunError::InconsistentSnapshot(format!(
                    "unit {} not below recruit counter {}",
                    unit.id, snapshot.next_recruit
                ))
                .into());
            }
        }
        info!(
            run_seed = snapshot.run_seed,
            battle_index = snapshot.battle_index,
            "Run resumed"
        );
        Ok(Self {
            run_seed: snapshot.run_seed,
            root: ForkRng::new(snapshot.run_seed),
            battle_index: snapshot.battle_index,
            team: snapshot.player_team,
            alignment: snapshot.alignment,
            progression: snapshot.progression,
            last_choices: snapshot.last_choices,
            next_recruit: snapshot.next_recruit,
            choice_config: ChoiceConfig::default(),
            battle_config: BattleConfig::default(),
        })
    }

    /// Persistable state.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_seed: self.run_seed,
            battle_index: self.battle_index,
            player_team: self.team.clone(),
            last_choices: self.last_choices.clone(),
            progression: self.progression,
            alignment: self.alignment,
            next_recruit: self.next_recruit,
        }
    }

    /// Root seed.
    #[must_use]
    pub fn run_seed(&self) -> u64 {
        self.run_seed
    }

    /// Index of the next battle.
    #[must_use]
    pub fn battle_index(&self) -> u32 {
        self.battle_index
    }

    /// Player team.
    #[must_use]
    pub fn team(&self) -> &[RosterUnit] {
        &self.team
    }

    /// Mutable player team, for equipping drops or merging units.
    pub fn team_mut(&mut self) -> &mut Vec<RosterUnit> {
        &mut self.team
    }

    /// Lifetime counters.
    #[must_use]
    pub fn progression(&self) -> Progression {
        self.progression
    }

    /// Selected alignment.
    #[must_use]
    pub fn alignment(&self) -> Option<Element> {
        self.alignment
    }

    /// Select the run's alignment.
    pub fn set_alignment(&mut self, element: Option<Element>) {
        self.alignment = element;
    }

    /// Offer for the next battle, if already generated.
    #[must_use]
    pub fn last_choices(&self) -> Option<&[OpponentPreview; CHOICES_PER_OFFER]> {
        self.last_choices.as_ref()
    }

    /// Add a unit to the team under the next recruit id.
    pub fn recruit(&mut self, template: &UnitTemplate) -> UnitId {
        let id = UnitId::recruit(self.next_recruit);
        self.next_recruit += 1;
        self.progression.units_recruited += 1;
        self.team.push(RosterUnit::from_template(template, id));
        id
    }

    /// Offer for the next battle.
    ///
    /// Reuses the stored offer when there is one, so a resumed run shows the
    /// same choices it saved.
    pub fn offer_choices(
        &mut self,
        catalog: &OpponentCatalog,
    ) -> &[OpponentPreview; CHOICES_PER_OFFER] {
        let battle_index = self.battle_index;
        let rng = choice_rng(&self.root, battle_index);
        let team = &self.team;
        let config = &self.choice_config;
        self.last_choices.get_or_insert_with(|| {
            generate_choices(&rng, battle_index, catalog, Some(team.as_slice()), config)
        })
    }

    /// Fight the offered opponent at `choice_index`.
    ///
    /// Resolves the battle and its rewards, carries MP over, updates the
    /// counters and moves on to the next battle index. Granting the rewards
    /// is left to the caller.
    pub fn fight(
        &mut self,
        catalog: &OpponentCatalog,
        choice_index: usize,
        reward_config: &RewardConfig,
    ) -> Result<BattleReport> {
        let battle_index = self.battle_index;
        let previews = self
            .last_choices
            .as_ref()
            .ok_or(RunError::NoChoicesOffered(battle_index))?;
        let preview = previews
            .get(choice_index)
            .ok_or(RunError::InvalidChoice(choice_index))?;
        let spec = catalog
            .get(&preview.opponent_id)
            .ok_or_else(|| RunError::UnknownOpponent(preview.opponent_id.clone()))?;

        let affinity = self
            .alignment
            .map_or_else(AffinityState::none, AffinityState::aligned);
        let config = self.battle_config.with_affinity(affinity);
        let enemy = spec.enemy_roster(battle_index);
        let outcome = resolve_battle_with(
            &self.team,
            &enemy,
            battle_rng(&self.root, battle_index),
            battle_index,
            &spec.id,
            &config,
        );
        let rewards = generate_rewards(
            &rewards_rng(&self.root, battle_index),
            spec,
            &outcome,
            reward_config,
        );

        for remaining in &outcome.player_mp {
            if let Some(unit) = self.team.iter_mut().find(|unit| unit.id == remaining.id) {
                unit.current_mp = Some(remaining.mp);
            }
        }
        match outcome.winner {
            Winner::Player => self.progression.battles_won += 1,
            Winner::Enemy | Winner::Draw => self.progression.battles_lost += 1,
        }

        let report = BattleReport {
            battle_index,
            opponent_id: spec.id.clone(),
            outcome,
            rewards,
        };
        self.battle_index += 1;
        self.last_choices = None;
        Ok(report)
    }

    /// Restore every unit's MP to full.
    pub fn rest(&mut self) {
        for unit in &mut self.team {
            unit.current_mp = None;
        }
    }

    /// Mark the run as finished.
    pub fn complete(&mut self) {
        self.progression.runs_completed += 1;
        info!(
            run_seed = self.run_seed,
            battles = self.battle_index,
            "Run completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Role;
    use crate::stats::BaseStats;

    fn squire() -> UnitTemplate {
        UnitTemplate::new(
            "squire",
            "Squire",
            Element::Earth,
            Role::Tank,
            BaseStats::new(90, 16, 9, 11, 30),
        )
    }

    fn run_with_team(seed: u64) -> Run {
        let mut run = Run::new(seed);
        run.recruit(&squire());
        run.recruit(&squire());
        run.set_alignment(Some(Element::Earth));
        run
    }

    #[test]
    fn test_fight_requires_offer() {
        let catalog = OpponentCatalog::builtin();
        let mut run = run_with_team(1);
        let err = run.fight(&catalog, 0, &RewardConfig::default()).unwrap_err();
        assert!(matches!(err, TacticsError::Run(RunError::NoChoicesOffered(0))));
    }

    #[test]
    fn test_fight_rejects_bad_index() {
        let catalog = OpponentCatalog::builtin();
        let mut run = run_with_team(1);
        run.offer_choices(&catalog);
        let err = run.fight(&catalog, 3, &RewardConfig::default()).unwrap_err();
        assert!(matches!(err, TacticsError::Run(RunError::InvalidChoice(3))));
    }

    #[test]
    fn test_recruit_ids_follow_counter() {
        let run = run_with_team(1);
        let ids: Vec<UnitId> = run.team().iter().map(|unit| unit.id).collect();
        assert_eq!(ids, vec![UnitId::recruit(0), UnitId::recruit(1)]);
        assert_eq!(run.progression().units_recruited, 2);
        assert_eq!(run.progression().runs_attempted, 1);
    }

    #[test]
    fn test_offer_is_reused_until_fight() {
        let catalog = OpponentCatalog::builtin();
        let mut run = run_with_team(8);
        let first = run.offer_choices(&catalog).clone();
        run.team_mut().clear();
        assert_eq!(run.offer_choices(&catalog), &first);
    }

    #[test]
    fn test_same_seed_same_reports() {
        let catalog = OpponentCatalog::builtin();
        let play = || {
            let mut run = run_with_team(2024);
            let mut reports = Vec::new();
            for _ in 0..3 {
                run.offer_choices(&catalog);
                reports.push(run.fight(&catalog, 0, &RewardConfig::default()).unwrap());
            }
            reports
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_resume_matches_uninterrupted_run() {
        let catalog = OpponentCatalog::builtin();
        let config = RewardConfig::default();

        let mut straight = run_with_team(77);
        straight.offer_choices(&catalog);
        straight.fight(&catalog, 1, &config).unwrap();
        let offer = straight.offer_choices(&catalog).clone();
        let snapshot = straight.snapshot();
        let expected = straight.fight(&catalog, 2, &config).unwrap();

        let text = snapshot.to_ron().unwrap();
        let restored = RunSnapshot::from_ron_str("save", &text).unwrap();
        let mut resumed = Run::resume(restored).unwrap();
        assert_eq!(resumed.last_choices(), Some(&offer));
        assert_eq!(resumed.fight(&catalog, 2, &config).unwrap(), expected);
    }

    #[test]
    fn test_mp_carries_over_until_rest() {
        let catalog = OpponentCatalog::builtin();
        let mut run = run_with_team(5);
        run.offer_choices(&catalog);
        let report = run.fight(&catalog, 0, &RewardConfig::default()).unwrap();
        for unit in run.team() {
            let left = report
                .outcome
                .player_mp
                .iter()
                .find(|entry| entry.id == unit.id)
                .map(|entry| entry.mp);
            assert_eq!(unit.current_mp, left);
            assert!(unit.stats().mp <= unit.composed().mp);
        }
        run.rest();
        assert!(run.team().iter().all(|unit| unit.current_mp.is_none()));
    }

    #[test]
    fn test_fight_advances_battle_index_and_counters() {
        let catalog = OpponentCatalog::builtin();
        let mut run = run_with_team(11);
        run.offer_choices(&catalog);
        let report = run.fight(&catalog, 0, &RewardConfig::default()).unwrap();
        assert_eq!(report.battle_index, 0);
        assert_eq!(run.battle_index(), 1);
        assert!(run.last_choices().is_none());
        let p = run.progression();
        assert_eq!(p.battles_won + p.battles_lost, 1);
        run.complete();
        assert_eq!(run.progression().runs_completed, 1);
    }

    #[test]
    fn test_resume_rejects_duplicate_ids() {
        let mut snapshot = run_with_team(3).snapshot();
        let copy = snapshot.player_team[0].clone();
        snapshot.player_team.push(copy);
        let err = Run::resume(snapshot).unwrap_err();
        assert!(matches!(
            err,
            TacticsError::Run(RunError::InconsistentSnapshot(_))
        ));
    }

    #[test]
    fn test_resume_rejects_stale_recruit_counter() {
        let mut snapshot = run_with_team(3).snapshot();
        snapshot.next_recruit = 1;
        assert!(Run::resume(snapshot).is_err());
    }
}
