//! Per-battle unit state.

use serde::{Deserialize, Serialize};

use crate::abilities::{Ability, BuffStat};
use crate::affinity::Element;
use crate::roster::{RosterUnit, UnitId};
use crate::stats::FinalStats;

/// Which roster a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The player's team. Wins speed ties.
    Player,
    /// The opponent.
    Enemy,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

/// A temporary stat bonus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveBuff {
    /// Ability that applied the buff. Recasting refreshes instead of stacking.
    pub source: String,
    /// Buffed stat.
    pub stat: BuffStat,
    /// Flat bonus.
    pub amount: i32,
    /// Turns left, counted down at the end of every turn.
    pub remaining_turns: u32,
}

/// A unit inside one battle.
///
/// Built once per battle from a roster entry; HP and MP change turn by turn.
/// Once HP reaches 0 the unit is defeated and never acts or is targeted again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatUnit {
    /// Stable id.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Side.
    pub side: Side,
    /// Position in the original roster, used for tie-breaks.
    pub origin_index: usize,
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Attack before buffs.
    pub atk: i32,
    /// Defense before buffs.
    pub def: i32,
    /// Speed before buffs.
    pub speed: i32,
    /// Current MP.
    pub mp: i32,
    /// MP pool size.
    pub max_mp: i32,
    /// Element.
    pub element: Element,
    /// Castable abilities.
    pub abilities: Vec<Ability>,
    /// Set once HP reaches 0.
    pub defeated: bool,
    /// Active buffs.
    pub buffs: Vec<ActiveBuff>,
}

impl CombatUnit {
    /// Create a unit at full HP.
    #[must_use]
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        side: Side,
        origin_index: usize,
        stats: FinalStats,
        element: Element,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            side,
            origin_index,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            atk: stats.atk,
            def: stats.def,
            speed: stats.speed,
            mp: stats.mp,
            max_mp: stats.mp,
            element,
            abilities: Vec::new(),
            defeated: stats.max_hp <= 0,
            buffs: Vec::new(),
        }
    }

    /// Build from a roster entry with its composed stats.
    ///
    /// Starts with the roster's carried-over MP when one is set.
    #[must_use]
    pub fn from_roster(unit: &RosterUnit, side: Side, origin_index: usize) -> Self {
        let composed = unit.composed();
        let mut combat = Self::new(
            unit.id,
            unit.name.clone(),
            side,
            origin_index,
            composed,
            unit.element,
        );
        combat.mp = unit.stats().mp.clamp(0, composed.mp.max(0));
        combat.abilities = unit.abilities.clone();
        combat
    }

    /// Builder method to add abilities, skipping ids the unit already has.
    #[must_use]
    pub fn with_abilities(mut self, abilities: impl IntoIterator<Item = Ability>) -> Self {
        self.learn(abilities);
        self
    }

    /// Learn abilities, skipping ids the unit already has.
    pub fn learn(&mut self, abilities: impl IntoIterator<Item = Ability>) {
        for ability in abilities {
            if !self.abilities.iter().any(|known| known.id == ability.id) {
                self.abilities.push(ability);
            }
        }
    }

    /// Whether the unit can still act and be targeted.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.defeated && self.hp > 0
    }

    /// Attack including buffs.
    #[must_use]
    pub fn effective_atk(&self) -> i32 {
        self.atk + self.buff_total(BuffStat::Atk)
    }

    /// Defense including buffs.
    #[must_use]
    pub fn effective_def(&self) -> i32 {
        self.def + self.buff_total(BuffStat::Def)
    }

    /// Speed including buffs.
    #[must_use]
    pub fn effective_speed(&self) -> i32 {
        self.speed + self.buff_total(BuffStat::Speed)
    }

    /// Whether a buff from `source` is active.
    #[must_use]
    pub fn has_buff(&self, source: &str) -> bool {
        self.buffs.iter().any(|buff| buff.source == source)
    }

    fn buff_total(&self, stat: BuffStat) -> i32 {
        self.buffs
            .iter()
            .filter(|buff| buff.stat == stat)
            .map(|buff| buff.amount)
            .sum()
    }

    /// Apply or refresh a buff.
    pub fn apply_buff(&mut self, buff: ActiveBuff) {
        match self.buffs.iter_mut().find(|b| b.source == buff.source) {
            Some(existing) => *existing = buff,
            None => self.buffs.push(buff),
        }
    }

    /// Count buffs down by one turn and drop expired ones.
    pub fn tick_buffs(&mut self) {
        for buff in &mut self.buffs {
            buff.remaining_turns = buff.remaining_turns.saturating_sub(1);
        }
        self.buffs.retain(|buff| buff.remaining_turns > 0);
    }

    /// HP still missing.
    #[must_use]
    pub fn missing_hp(&self) -> i32 {
        (self.max_hp - self.hp).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> CombatUnit {
        CombatUnit::new(
            UnitId::recruit(0),
            "Squire",
            Side::Player,
            0,
            FinalStats {
                max_hp: 50,
                atk: 10,
                def: 5,
                speed: 8,
                mp: 10,
            },
            Element::Fire,
        )
    }

    #[test]
    fn test_buffs_refresh_and_expire() {
        let mut u = unit();
        let buff = ActiveBuff {
            source: "kindle".to_string(),
            stat: BuffStat::Atk,
            amount: 4,
            remaining_turns: 2,
        };
        u.apply_buff(buff.clone());
        u.apply_buff(buff);
        assert_eq!(u.effective_atk(), 14);
        u.tick_buffs();
        assert_eq!(u.effective_atk(), 14);
        u.tick_buffs();
        assert_eq!(u.effective_atk(), 10);
        assert!(u.buffs.is_empty());
    }

    #[test]
    fn test_learn_skips_duplicates() {
        let ward = crate::abilities::ward_ability(Element::Water);
        let u = unit().with_abilities([ward.clone(), ward]);
        assert_eq!(u.abilities.len(), 1);
    }

    #[test]
    fn test_zero_hp_unit_starts_defeated() {
        let u = CombatUnit::new(
            UnitId::recruit(1),
            "Husk",
            Side::Enemy,
            0,
            FinalStats::default(),
            Element::Dark,
        );
        assert!(!u.is_alive());
    }
}
