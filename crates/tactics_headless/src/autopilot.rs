//! Unattended play through a run.
//!
//! The autopilot stands in for a player: it asks the run for an offer, picks
//! one preview by a fixed policy, fights, optionally equips what dropped and
//! rests, then moves on. Every decision is a pure function of the offer, so
//! the same seed always plays out the same way.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tactics_core::affinity::Element;
use tactics_core::choice::OpponentPreview;
use tactics_core::combat::Winner;
use tactics_core::data::UnitTemplate;
use tactics_core::error::Result;
use tactics_core::rewards::{RewardBundle, RewardConfig};
use tactics_core::rng::content_hash;
use tactics_core::run::{BattleReport, Progression, Run};

use crate::data_loader::GameData;

/// How the autopilot picks among three previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PickPolicy {
    /// Always the first preview.
    #[default]
    First,
    /// Lowest difficulty, first on ties.
    Easiest,
    /// Highest difficulty, first on ties.
    Hardest,
}

impl PickPolicy {
    /// Index of the preview this policy picks.
    #[must_use]
    pub fn pick(self, previews: &[OpponentPreview]) -> usize {
        let indexed = previews.iter().enumerate();
        let picked = match self {
            PickPolicy::First => None,
            PickPolicy::Easiest => indexed.min_by_key(|(i, p)| (p.difficulty, *i)),
            PickPolicy::Hardest => indexed.min_by_key(|(i, p)| (std::cmp::Reverse(p.difficulty), *i)),
        };
        picked.map_or(0, |(i, _)| i)
    }
}

/// Autopilot settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutopilotConfig {
    /// Battles to fight.
    pub battles: u32,
    /// Preview selection.
    pub pick: PickPolicy,
    /// Equip dropped gear, round-robin across the team.
    pub equip_drops: bool,
    /// Restore MP after every battle.
    pub rest_between: bool,
    /// Stop after the first battle the player does not win.
    pub stop_on_loss: bool,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            battles: 5,
            pick: PickPolicy::First,
            equip_drops: true,
            rest_between: false,
            stop_on_loss: false,
        }
    }
}

impl AutopilotConfig {
    /// Builder method to set the battle count.
    #[must_use]
    pub fn with_battles(mut self, battles: u32) -> Self {
        self.battles = battles;
        self
    }

    /// Builder method to set the pick policy.
    #[must_use]
    pub fn with_pick(mut self, pick: PickPolicy) -> Self {
        self.pick = pick;
        self
    }

    /// Builder method to toggle resting between battles.
    #[must_use]
    pub fn with_rest(mut self, rest_between: bool) -> Self {
        self.rest_between = rest_between;
        self
    }

    /// Builder method to toggle stopping on the first loss.
    #[must_use]
    pub fn with_stop_on_loss(mut self, stop_on_loss: bool) -> Self {
        self.stop_on_loss = stop_on_loss;
        self
    }
}

/// Condensed record of one fought battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Battle index within the run.
    pub battle_index: u32,
    /// Preview index picked.
    pub picked: usize,
    /// Opponent fought.
    pub opponent_id: String,
    /// Winner.
    pub winner: Winner,
    /// Turns taken.
    pub turns_taken: u32,
    /// Actions logged.
    pub actions: usize,
    /// Outcome hash, see [`tactics_core::combat::BattleOutcome::state_hash`].
    pub outcome_hash: u64,
    /// Rewards earned.
    pub rewards: RewardBundle,
}

impl BattleSummary {
    fn from_report(report: &BattleReport, picked: usize) -> Self {
        Self {
            battle_index: report.battle_index,
            picked,
            opponent_id: report.opponent_id.clone(),
            winner: report.outcome.winner,
            turns_taken: report.outcome.turns_taken,
            actions: report.outcome.actions.len(),
            outcome_hash: report.outcome.state_hash(),
            rewards: report.rewards.clone(),
        }
    }
}

/// Everything the autopilot did in one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutopilotSummary {
    /// Seed of the run.
    pub run_seed: u64,
    /// Battles fought this session, in order.
    pub battles: Vec<BattleSummary>,
    /// Counters after the session.
    pub progression: Progression,
    /// Experience earned this session.
    pub total_experience: i32,
    /// Hash over every battle summary.
    pub session_hash: u64,
}

impl AutopilotSummary {
    /// Battles the player won this session.
    #[must_use]
    pub fn wins(&self) -> usize {
        self.battles
            .iter()
            .filter(|b| b.winner == Winner::Player)
            .count()
    }
}

/// Start a fresh run with every recruit on the team.
#[must_use]
pub fn new_run(seed: u64, recruits: &[UnitTemplate], alignment: Option<Element>) -> Run {
    let mut run = Run::new(seed);
    for template in recruits {
        run.recruit(template);
    }
    run.set_alignment(alignment);
    run
}

/// Play `config.battles` battles of `run`.
///
/// Fails only on orchestrator misuse, such as an offer naming an opponent
/// missing from `data.catalog`.
pub fn play(run: &mut Run, data: &GameData, config: &AutopilotConfig) -> Result<AutopilotSummary> {
    let rewards = RewardConfig::default().with_loot_table(data.loot.clone());
    let mut battles = Vec::with_capacity(config.battles as usize);

    for _ in 0..config.battles {
        let picked = config.pick.pick(run.offer_choices(&data.catalog));
        let report = run.fight(&data.catalog, picked, &rewards)?;
        debug!(
            battle = report.battle_index,
            opponent = %report.opponent_id,
            winner = ?report.outcome.winner,
            turns = report.outcome.turns_taken,
            "Autopilot battle finished"
        );

        if config.equip_drops && !run.team().is_empty() {
            let team_len = run.team().len();
            for (i, drop) in report.rewards.equipment.iter().enumerate() {
                run.team_mut()[i % team_len].equip(drop.bonus);
            }
        }
        if config.rest_between {
            run.rest();
        }

        let lost = report.outcome.winner != Winner::Player;
        battles.push(BattleSummary::from_report(&report, picked));
        if lost && config.stop_on_loss {
            break;
        }
    }

    let total_experience = battles.iter().map(|b| b.rewards.experience).sum();
    let session_hash = content_hash(&battles);

    let summary = AutopilotSummary {
        run_seed: run.run_seed(),
        battles,
        progression: run.progression(),
        total_experience,
        session_hash,
    };
    info!(
        seed = summary.run_seed,
        battles = summary.battles.len(),
        wins = summary.wins(),
        experience = summary.total_experience,
        "Autopilot session complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::data::Difficulty;

    fn preview(id: &str, difficulty: Difficulty) -> OpponentPreview {
        OpponentPreview {
            opponent_id: id.to_string(),
            name: id.to_string(),
            difficulty,
            primary_tag: id.to_string(),
            counter_tags: Vec::new(),
            units: Vec::new(),
            threat_score: None,
        }
    }

    #[test]
    fn test_pick_policies() {
        let previews = [
            preview("a", Difficulty::Normal),
            preview("b", Difficulty::Standard),
            preview("c", Difficulty::Hard),
        ];
        assert_eq!(PickPolicy::First.pick(&previews), 0);
        assert_eq!(PickPolicy::Easiest.pick(&previews), 1);
        assert_eq!(PickPolicy::Hardest.pick(&previews), 2);
    }

    #[test]
    fn test_pick_ties_keep_first() {
        let previews = [
            preview("a", Difficulty::Standard),
            preview("b", Difficulty::Standard),
            preview("c", Difficulty::Standard),
        ];
        assert_eq!(PickPolicy::Easiest.pick(&previews), 0);
        assert_eq!(PickPolicy::Hardest.pick(&previews), 0);
    }

    #[test]
    fn test_play_counts_battles() {
        let data = GameData::builtin();
        let mut run = new_run(11, &data.recruits, Some(Element::Fire));
        let summary = play(&mut run, &data, &AutopilotConfig::default().with_battles(3)).unwrap();
        assert_eq!(summary.battles.len(), 3);
        assert_eq!(run.battle_index(), 3);
        let p = summary.progression;
        assert_eq!(p.battles_won + p.battles_lost, 3);
    }

    #[test]
    fn test_play_is_deterministic() {
        let data = GameData::builtin();
        let config = AutopilotConfig::default().with_battles(4).with_pick(PickPolicy::Easiest);
        let mut a = new_run(99, &data.recruits, None);
        let mut b = new_run(99, &data.recruits, None);
        assert_eq!(
            play(&mut a, &data, &config).unwrap(),
            play(&mut b, &data, &config).unwrap()
        );
    }
}
