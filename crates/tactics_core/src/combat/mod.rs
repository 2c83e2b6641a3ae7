//! Turn-based combat resolution.
//!
//! A battle is driven to completion synchronously:
//!
//! 1. Every turn re-sorts the *living* units by speed (descending). Ties go
//!    to the player side, then to the lower original roster index.
//! 2. Each actor in that order picks an action (see [`policy`]), targets the
//!    lowest-HP living unit of the opposing side (ties to the lower index),
//!    and logs one [`BattleAction`] per effect. A unit whose HP reaches 0 gets
//!    a `Defeat` action right after the hit that dropped it.
//! 3. Victory is checked after every actor, so a battle can end mid-turn.
//! 4. After [`MAX_TURNS`] turns with both sides alive the battle is a draw.
//!
//! # Determinism
//!
//! The battle owns a single [`ForkRng`]. Draws happen in a fixed order: one
//! variance draw per damage or heal application, in actor order, then target
//! order. Given the same rosters, RNG fork path and config, the action log is
//! identical byte for byte.

pub mod formula;
pub mod policy;
mod unit;

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::abilities::{Ability, AbilityError, EffectKind, TargetScope};
use crate::affinity::{granted_abilities, AffinityError, AffinityState};
use crate::math::Percent;
use crate::rng::{content_hash, ForkRng};
use crate::roster::{RosterUnit, UnitId};

pub use formula::{ability_damage, basic_damage, heal_amount, MIN_DAMAGE, MIN_HEAL};
pub use policy::ActionChoice;
pub use unit::{ActiveBuff, CombatUnit, Side};

use formula::{DAMAGE_VARIANCE, HEAL_VARIANCE};

/// Turn limit after which a battle with both sides alive is a draw.
pub const MAX_TURNS: u32 = 500;

/// Kind of a logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Basic attack.
    Attack,
    /// Ability effect on one target.
    Ability,
    /// A unit was defeated. `actor` is the defeated unit, `target` the unit
    /// that landed the final hit.
    Defeat,
}

/// One entry of the battle log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleAction {
    /// Contiguous sequence number starting at 0.
    pub seq: u32,
    /// Acting unit.
    pub actor: UnitId,
    /// Affected unit, if any.
    pub target: Option<UnitId>,
    /// Action kind.
    pub kind: ActionKind,
    /// Ability cast, for `Ability` actions.
    #[serde(default)]
    pub ability_id: Option<String>,
    /// Damage dealt, HP healed or buff amount.
    #[serde(default)]
    pub magnitude: Option<i32>,
}

/// Battle result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// Enemy roster has no living units.
    Player,
    /// Player roster has no living units.
    Enemy,
    /// Both rosters empty at start, or the turn limit was reached.
    Draw,
}

/// MP left on a player unit when the battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemainingMp {
    /// Unit id.
    pub id: UnitId,
    /// MP left.
    pub mp: i32,
}

/// Everything that persists from a battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// Winner.
    pub winner: Winner,
    /// Ordered action log, the sole record of what happened.
    pub actions: Vec<BattleAction>,
    /// Turns started.
    pub turns_taken: u32,
    /// Defeated units in order of defeat.
    pub units_defeated: Vec<UnitId>,
    /// Battle index within the run.
    pub battle_index: u32,
    /// Opponent fought.
    pub opponent_id: String,
    /// MP left on each player unit, in roster order.
    pub player_mp: Vec<RemainingMp>,
}

impl BattleOutcome {
    /// Hash of the whole outcome for determinism checks.
    ///
    /// Stable across toolchains, so it can be persisted in replays.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        content_hash(self)
    }

    /// Whether `id` was defeated.
    #[must_use]
    pub fn was_defeated(&self, id: UnitId) -> bool {
        self.units_defeated.contains(&id)
    }
}

/// Battle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Turn limit.
    pub max_turns: u32,
    /// Player alignment. Activation is reset when the battle starts.
    pub affinity: AffinityState,
    /// Turn at whose start the alignment is activated.
    pub activate_affinity_at_turn: Option<u32>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_turns: MAX_TURNS,
            affinity: AffinityState::none(),
            activate_affinity_at_turn: None,
        }
    }
}

impl BattleConfig {
    /// Builder method to set the player alignment.
    #[must_use]
    pub const fn with_affinity(mut self, affinity: AffinityState) -> Self {
        self.affinity = affinity;
        self
    }

    /// Builder method to activate the alignment at the start of `turn`.
    #[must_use]
    pub const fn with_activation_turn(mut self, turn: u32) -> Self {
        self.activate_affinity_at_turn = Some(turn);
        self
    }

    /// Builder method to change the turn limit. Capped at [`MAX_TURNS`].
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.min(MAX_TURNS);
        self
    }
}

/// Resolve a battle with default settings.
///
/// Deterministic in the rosters, the RNG fork path and the battle index.
#[must_use]
pub fn resolve_battle(
    player: &[RosterUnit],
    enemy: &[RosterUnit],
    rng: ForkRng,
    battle_index: u32,
    opponent_id: &str,
) -> BattleOutcome {
    resolve_battle_with(
        player,
        enemy,
        rng,
        battle_index,
        opponent_id,
        &BattleConfig::default(),
    )
}

/// Resolve a battle with explicit settings.
#[must_use]
pub fn resolve_battle_with(
    player: &[RosterUnit],
    enemy: &[RosterUnit],
    rng: ForkRng,
    battle_index: u32,
    opponent_id: &str,
    config: &BattleConfig,
) -> BattleOutcome {
    Battle::new(player, enemy, rng, battle_index, opponent_id, *config).run()
}

/// A battle in progress.
#[derive(Debug, Clone)]
pub struct Battle {
    units: Vec<CombatUnit>,
    rng: ForkRng,
    config: BattleConfig,
    affinity: AffinityState,
    battle_index: u32,
    opponent_id: String,
    turn: u32,
    actions: Vec<BattleAction>,
    defeated: Vec<UnitId>,
    winner: Option<Winner>,
}

impl Battle {
    /// Set up a battle from roster entries.
    ///
    /// Player units learn their affinity abilities here, once.
    #[must_use]
    pub fn new(
        player: &[RosterUnit],
        enemy: &[RosterUnit],
        rng: ForkRng,
        battle_index: u32,
        opponent_id: &str,
        config: BattleConfig,
    ) -> Self {
        let player_units = player
            .iter()
            .enumerate()
            .map(|(index, unit)| CombatUnit::from_roster(unit, Side::Player, index))
            .collect();
        let enemy_units = enemy
            .iter()
            .enumerate()
            .map(|(index, unit)| CombatUnit::from_roster(unit, Side::Enemy, index))
            .collect();
        Self::from_units(
            player_units,
            enemy_units,
            rng,
            battle_index,
            opponent_id,
            config,
        )
    }

    /// Set up a battle from prepared combat units.
    #[must_use]
    pub fn from_units(
        player: Vec<CombatUnit>,
        enemy: Vec<CombatUnit>,
        rng: ForkRng,
        battle_index: u32,
        opponent_id: &str,
        config: BattleConfig,
    ) -> Self {
        let mut affinity = config.affinity;
        affinity.reset_for_battle();

        let player_count = player.len();
        let enemy_count = enemy.len();

        let mut units: Vec<CombatUnit> = Vec::with_capacity(player_count + enemy_count);
        for (index, mut unit) in player.into_iter().enumerate() {
            unit.side = Side::Player;
            unit.origin_index = index;
            unit.learn(granted_abilities(unit.element, &affinity));
            units.push(unit);
        }
        for (index, mut unit) in enemy.into_iter().enumerate() {
            unit.side = Side::Enemy;
            unit.origin_index = index;
            units.push(unit);
        }

        let mut battle = Self {
            units,
            rng,
            config,
            affinity,
            battle_index,
            opponent_id: opponent_id.to_string(),
            turn: 0,
            actions: Vec::new(),
            defeated: Vec::new(),
            winner: None,
        };

        battle.winner = if player_count == 0 && enemy_count == 0 {
            Some(Winner::Draw)
        } else {
            battle.check_victory()
        };
        battle
    }

    /// All units, players first, in roster order.
    #[must_use]
    pub fn units(&self) -> &[CombatUnit] {
        &self.units
    }

    /// Actions logged so far.
    #[must_use]
    pub fn actions(&self) -> &[BattleAction] {
        &self.actions
    }

    /// Turns started so far.
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Winner, once decided.
    #[must_use]
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Current affinity state.
    #[must_use]
    pub fn affinity(&self) -> &AffinityState {
        &self.affinity
    }

    /// Strip the alignment bonuses for the rest of this battle.
    ///
    /// Abilities already granted stay usable.
    pub fn activate_affinity(&mut self) -> Result<(), AffinityError> {
        self.affinity.activate()?;
        debug!(turn = self.turn, "Affinity activated");
        Ok(())
    }

    /// Play one full turn. Returns the winner once the battle is over.
    pub fn step_turn(&mut self) -> Option<Winner> {
        if self.winner.is_some() {
            return self.winner;
        }
        if self.turn >= self.config.max_turns {
            self.winner = Some(Winner::Draw);
            return self.winner;
        }

        self.turn += 1;
        if self.config.activate_affinity_at_turn == Some(self.turn) {
            if let Err(err) = self.activate_affinity() {
                debug!(turn = self.turn, %err, "Affinity activation skipped");
            }
        }

        let order = self.turn_order();
        debug!(
            turn = self.turn,
            order = ?order.iter().map(|&i| self.units[i].id).collect::<Vec<_>>(),
            "Turn start"
        );

        for index in order {
            // Units defeated earlier this turn lose their action.
            if !self.units[index].is_alive() {
                continue;
            }
            self.take_action(index);
            if let Some(winner) = self.check_victory() {
                self.winner = Some(winner);
                return self.winner;
            }
        }

        for unit in &mut self.units {
            unit.tick_buffs();
        }

        if self.turn >= self.config.max_turns {
            self.winner = Some(Winner::Draw);
        }
        self.winner
    }

    /// Drive the battle to its end.
    #[must_use]
    pub fn run(mut self) -> BattleOutcome {
        while self.step_turn().is_none() {}
        self.into_outcome()
    }

    fn into_outcome(self) -> BattleOutcome {
        let winner = self.winner.unwrap_or(Winner::Draw);
        info!(
            battle_index = self.battle_index,
            opponent = %self.opponent_id,
            ?winner,
            turns = self.turn,
            actions = self.actions.len(),
            "Battle resolved"
        );
        let player_mp = self
            .units
            .iter()
            .filter(|unit| unit.side == Side::Player)
            .map(|unit| RemainingMp {
                id: unit.id,
                mp: unit.mp,
            })
            .collect();
        BattleOutcome {
            winner,
            actions: self.actions,
            turns_taken: self.turn,
            units_defeated: self.defeated,
            battle_index: self.battle_index,
            opponent_id: self.opponent_id,
            player_mp,
        }
    }

    /// Living unit indices in acting order.
    fn turn_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.units.len())
            .filter(|&i| self.units[i].is_alive())
            .collect();
        order.sort_by_key(|&i| {
            let unit = &self.units[i];
            (Reverse(unit.effective_speed()), unit.side, unit.origin_index)
        });
        order
    }

    fn check_victory(&self) -> Option<Winner> {
        let players_alive = self.living(Side::Player).next().is_some();
        let enemies_alive = self.living(Side::Enemy).next().is_some();
        match (players_alive, enemies_alive) {
            (true, true) => None,
            (true, false) => Some(Winner::Player),
            (false, true) => Some(Winner::Enemy),
            (false, false) => Some(Winner::Draw),
        }
    }

    /// Living unit indices on `side` in roster order.
    fn living(&self, side: Side) -> impl Iterator<Item = usize> + '_ {
        (0..self.units.len())
            .filter(move |&i| self.units[i].side == side && self.units[i].is_alive())
    }

    /// Lowest-HP living unit on `side`, ties to the lower roster index.
    fn lowest_hp(&self, side: Side) -> Option<usize> {
        self.living(side)
            .min_by_key(|&i| (self.units[i].hp, self.units[i].origin_index))
    }

    /// Lowest-HP living unit on `side` that is missing HP.
    fn lowest_hurt(&self, side: Side) -> Option<usize> {
        self.living(side)
            .filter(|&i| self.units[i].missing_hp() > 0)
            .min_by_key(|&i| (self.units[i].hp, self.units[i].origin_index))
    }

    fn affinity_for(&self, index: usize) -> Percent {
        let unit = &self.units[index];
        match unit.side {
            Side::Player => self.affinity.multiplier(unit.element),
            Side::Enemy => Percent::HUNDRED,
        }
    }

    fn take_action(&mut self, actor: usize) {
        if let ActionChoice::Cast(ability) = policy::choose_action(self, actor) {
            match self.cast(actor, &ability) {
                Ok(()) => return,
                Err(err) => {
                    debug!(
                        actor = %self.units[actor].id,
                        ability = %ability.id,
                        %err,
                        "Cast failed, falling back to attack"
                    );
                }
            }
        }
        self.basic_attack(actor);
    }

    fn basic_attack(&mut self, actor: usize) {
        let Some(target) = self.lowest_hp(self.units[actor].side.opposite()) else {
            return;
        };
        let variance = self.draw(DAMAGE_VARIANCE);
        let damage = basic_damage(
            self.units[actor].effective_atk(),
            self.units[target].effective_def(),
            variance,
            self.affinity_for(actor),
        );
        self.deal_damage(actor, target, damage, ActionKind::Attack, None);
    }

    /// Cast an ability. Validation happens before any MP or RNG is spent.
    pub(crate) fn cast(&mut self, actor: usize, ability: &Ability) -> Result<(), AbilityError> {
        let caster = &self.units[actor];
        if caster.mp < ability.mp_cost {
            return Err(AbilityError::InsufficientMp {
                required: ability.mp_cost,
                available: caster.mp,
            });
        }
        let mut targets = self.resolve_targets(actor, ability.scope);
        if targets.is_empty() {
            return Err(AbilityError::NoValidTarget);
        }
        match ability.kind {
            EffectKind::Heal => {
                targets = self.heal_targets(actor, ability.scope);
                if targets.is_empty() {
                    return Err(AbilityError::TargetAtFullHp);
                }
            }
            EffectKind::Buff => {
                if ability.buff.is_none() {
                    return Err(AbilityError::MissingBuff(ability.id.clone()));
                }
            }
            EffectKind::Damage => {}
        }

        self.units[actor].mp -= ability.mp_cost;

        for target in targets {
            match ability.kind {
                EffectKind::Damage => {
                    // Earlier hits of an area ability may already have finished this target.
                    if !self.units[target].is_alive() {
                        continue;
                    }
                    let variance = self.draw(DAMAGE_VARIANCE);
                    let damage = ability_damage(
                        ability.power,
                        self.units[actor].effective_atk(),
                        variance,
                        self.affinity_for(actor),
                    );
                    self.deal_damage(
                        actor,
                        target,
                        damage,
                        ActionKind::Ability,
                        Some(ability.id.clone()),
                    );
                }
                EffectKind::Heal => {
                    let variance = self.draw(HEAL_VARIANCE);
                    let amount = heal_amount(ability.power, variance, self.affinity_for(actor));
                    let healed = amount.min(self.units[target].missing_hp());
                    self.units[target].hp += healed;
                    let (actor_id, target_id) = (self.units[actor].id, self.units[target].id);
                    self.log(
                        actor_id,
                        Some(target_id),
                        ActionKind::Ability,
                        Some(ability.id.clone()),
                        Some(healed),
                    );
                }
                EffectKind::Buff => {
                    let Some(spec) = ability.buff else {
                        continue;
                    };
                    self.units[target].apply_buff(ActiveBuff {
                        source: ability.id.clone(),
                        stat: spec.stat,
                        amount: spec.amount,
                        remaining_turns: spec.duration,
                    });
                    let (actor_id, target_id) = (self.units[actor].id, self.units[target].id);
                    self.log(
                        actor_id,
                        Some(target_id),
                        ActionKind::Ability,
                        Some(ability.id.clone()),
                        Some(spec.amount),
                    );
                }
            }
        }
        Ok(())
    }

    /// Target indices for an ability scope, in application order.
    ///
    /// A single ally is the lowest-HP hurt ally, or the lowest-HP ally when
    /// nobody is hurt.
    pub(crate) fn resolve_targets(&self, actor: usize, scope: TargetScope) -> Vec<usize> {
        let own = self.units[actor].side;
        let side = if scope.is_hostile() { own.opposite() } else { own };
        match scope {
            TargetScope::SelfOnly => vec![actor],
            TargetScope::SingleAlly => self
                .lowest_hurt(side)
                .or_else(|| self.lowest_hp(side))
                .into_iter()
                .collect(),
            TargetScope::SingleEnemy => self.lowest_hp(side).into_iter().collect(),
            TargetScope::AllAllies | TargetScope::AllEnemies => self.living(side).collect(),
        }
    }

    /// Targets a heal with `scope` would restore HP to. Full-HP units are skipped.
    pub(crate) fn heal_targets(&self, actor: usize, scope: TargetScope) -> Vec<usize> {
        let mut targets = self.resolve_targets(actor, scope);
        targets.retain(|&i| self.units[i].missing_hp() > 0);
        targets
    }

    fn deal_damage(
        &mut self,
        actor: usize,
        target: usize,
        damage: i32,
        kind: ActionKind,
        ability_id: Option<String>,
    ) {
        let actor_id = self.units[actor].id;
        let target_id = self.units[target].id;

        let defender = &mut self.units[target];
        defender.hp = (defender.hp - damage).max(0);
        let dropped = defender.hp == 0;
        if dropped {
            defender.defeated = true;
        }

        self.log(actor_id, Some(target_id), kind, ability_id, Some(damage));
        if dropped {
            self.defeated.push(target_id);
            self.log(target_id, Some(actor_id), ActionKind::Defeat, None, None);
        }
    }

    fn log(
        &mut self,
        actor: UnitId,
        target: Option<UnitId>,
        kind: ActionKind,
        ability_id: Option<String>,
        magnitude: Option<i32>,
    ) {
        let seq = self.actions.len() as u32;
        self.actions.push(BattleAction {
            seq,
            actor,
            target,
            kind,
            ability_id,
            magnitude,
        });
    }

    fn draw(&mut self, (lo, hi): (i64, i64)) -> i32 {
        self.rng.next_int(lo, hi) as i32
    }
}
