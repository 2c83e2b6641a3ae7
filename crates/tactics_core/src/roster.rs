//! Roster entries and content-addressed unit ids.
//!
//! Unit ids are pure functions of their inputs. Enemy ids hash the template
//! id, battle index and roster slot; recruited units take the run's explicit
//! recruit counter. No hidden counters live on any object.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::abilities::Ability;
use crate::affinity::Element;
use crate::data::{Role, UnitTemplate};
use crate::rng::fnv1a;
use crate::stats::{compose, BaseStats, EquipmentDelta, FinalStats, Rank, Subclass};

/// Top bit marks recruited (player) ids so they never collide with enemy hashes.
const RECRUIT_BIT: u64 = 1 << 63;

/// Stable unit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl UnitId {
    /// Id of the enemy in `slot` of `template_id` during `battle_index`.
    #[must_use]
    pub fn enemy(template_id: &str, battle_index: u32, slot: usize) -> Self {
        let mut bytes = Vec::with_capacity(template_id.len() + 12);
        bytes.extend_from_slice(template_id.as_bytes());
        bytes.extend_from_slice(&battle_index.to_le_bytes());
        bytes.extend_from_slice(&(slot as u64).to_le_bytes());
        Self(fnv1a(0x45, &bytes) & !RECRUIT_BIT)
    }

    /// Id of the `counter`-th recruited unit of a run.
    #[must_use]
    pub const fn recruit(counter: u32) -> Self {
        Self(RECRUIT_BIT | counter as u64)
    }

    /// Whether this id came from [`UnitId::recruit`].
    #[must_use]
    pub const fn is_recruit(self) -> bool {
        self.0 & RECRUIT_BIT != 0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_recruit() {
            write!(f, "p{}", self.0 & !RECRUIT_BIT)
        } else {
            write!(f, "e{:012x}", self.0 & 0xFFFF_FFFF_FFFF)
        }
    }
}

/// A unit on the player's persisted team, or an enemy instantiated for one
/// battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterUnit {
    /// Stable id.
    pub id: UnitId,
    /// Template this unit was built from.
    pub template_id: String,
    /// Display name.
    pub name: String,
    /// Element.
    pub element: Element,
    /// Role.
    pub role: Role,
    /// Rank tier.
    pub rank: Rank,
    /// Optional subclass.
    #[serde(default)]
    pub subclass: Option<Subclass>,
    /// Raw attributes.
    pub base: BaseStats,
    /// Equipped items.
    #[serde(default)]
    pub equipment: Vec<EquipmentDelta>,
    /// Innate abilities.
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// MP carried over between battles. `None` means a full pool.
    #[serde(default)]
    pub current_mp: Option<i32>,
}

impl RosterUnit {
    /// Instantiate a template under the given id.
    #[must_use]
    pub fn from_template(template: &UnitTemplate, id: UnitId) -> Self {
        Self {
            id,
            template_id: template.id.clone(),
            name: template.name.clone(),
            element: template.element,
            role: template.role,
            rank: template.rank,
            subclass: template.subclass,
            base: template.stats,
            equipment: template.equipment.clone(),
            abilities: template.abilities.clone(),
            current_mp: None,
        }
    }

    /// Stats as currently seen by the player.
    ///
    /// MP reports the carried-over value when one is set, not the pool size.
    #[must_use]
    pub fn stats(&self) -> FinalStats {
        let mut stats = self.composed();
        if let Some(mp) = self.current_mp {
            stats.mp = mp;
        }
        stats
    }

    /// Stats from the layer pipeline, ignoring carried-over MP.
    #[must_use]
    pub fn composed(&self) -> FinalStats {
        let class = self.subclass.map(Subclass::modifiers);
        compose(&self.base, self.rank, class.as_ref(), &self.equipment)
    }

    /// Merge another copy into this unit, raising its rank.
    pub fn promote(&mut self) {
        self.rank = self.rank.promoted();
    }

    /// Equip a piece of gear.
    pub fn equip(&mut self, delta: EquipmentDelta) {
        self.equipment.push(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight() -> UnitTemplate {
        UnitTemplate::new(
            "knight",
            "Knight",
            Element::Earth,
            Role::Tank,
            BaseStats::new(100, 20, 15, 40, 12),
        )
    }

    #[test]
    fn test_enemy_id_is_content_addressed() {
        let a = UnitId::enemy("slime", 0, 1);
        assert_eq!(a, UnitId::enemy("slime", 0, 1));
        assert_ne!(a, UnitId::enemy("slime", 1, 1));
        assert_ne!(a, UnitId::enemy("slime", 0, 2));
        assert_ne!(a, UnitId::enemy("wolf", 0, 1));
        assert!(!a.is_recruit());
    }

    #[test]
    fn test_recruit_ids() {
        let id = UnitId::recruit(7);
        assert!(id.is_recruit());
        assert_eq!(id.to_string(), "p7");
        assert_ne!(UnitId::recruit(1), UnitId::recruit(2));
    }

    #[test]
    fn test_stats_report_current_mp() {
        let mut unit = RosterUnit::from_template(&knight(), UnitId::recruit(0));
        assert_eq!(unit.stats().mp, 12);
        unit.current_mp = Some(4);
        assert_eq!(unit.stats().mp, 4);
        assert_eq!(unit.composed().mp, 12);
    }

    #[test]
    fn test_promote_and_equip() {
        let mut unit = RosterUnit::from_template(&knight(), UnitId::recruit(0));
        unit.promote();
        unit.equip(EquipmentDelta {
            atk: 2,
            ..EquipmentDelta::NONE
        });
        let stats = unit.stats();
        assert_eq!(unit.rank, Rank::B);
        assert_eq!(stats.atk, 25);
        assert_eq!(stats.def, 17);
    }
}
