//! Action selection for every unit, player or enemy.
//!
//! Fixed priority, no RNG:
//!
//! 1. Heal, when an ally is below half HP and the heal reaches a hurt unit.
//! 2. Buff, when the actor does not already carry it.
//! 3. Damage ability with the highest total power against the living enemies.
//! 4. Basic attack.
//!
//! Only abilities the actor can pay for are considered. Ties keep the
//! earlier ability in the unit's list.

use crate::abilities::{Ability, EffectKind, TargetScope};

use super::Battle;

/// What a unit does on its action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionChoice {
    /// Basic attack on the weakest enemy.
    Attack,
    /// Cast the given ability.
    Cast(Ability),
}

/// Pick the action of the unit at `actor`.
pub(crate) fn choose_action(battle: &Battle, actor: usize) -> ActionChoice {
    let unit = &battle.units[actor];
    let affordable: Vec<&Ability> = unit
        .abilities
        .iter()
        .filter(|ability| ability.mp_cost <= unit.mp)
        .collect();
    if affordable.is_empty() {
        return ActionChoice::Attack;
    }

    let ally_hurt = battle
        .living(unit.side)
        .any(|i| battle.units[i].hp.saturating_mul(2) < battle.units[i].max_hp);
    if ally_hurt {
        if let Some(heal) = affordable.iter().find(|a| {
            a.kind == EffectKind::Heal && !battle.heal_targets(actor, a.scope).is_empty()
        }) {
            return ActionChoice::Cast((*heal).clone());
        }
    }

    if let Some(buff) = affordable
        .iter()
        .find(|a| a.kind == EffectKind::Buff && !unit.has_buff(&a.id))
    {
        return ActionChoice::Cast((*buff).clone());
    }

    let enemies = battle.living(unit.side.opposite()).count() as i32;
    let mut best: Option<(&Ability, i32)> = None;
    for ability in affordable.iter().filter(|a| a.kind == EffectKind::Damage) {
        let value = match ability.scope {
            TargetScope::AllEnemies => ability.power.saturating_mul(enemies),
            _ => ability.power,
        };
        if best.map_or(true, |(_, top)| value > top) {
            best = Some((ability, value));
        }
    }
    match best {
        Some((ability, _)) => ActionChoice::Cast(ability.clone()),
        None => ActionChoice::Attack,
    }
}
