//! Unit template data structures.

use serde::{Deserialize, Serialize};

use crate::abilities::Ability;
use crate::affinity::Element;
use crate::stats::{compose, BaseStats, EquipmentDelta, FinalStats, Rank, Subclass};

/// Battlefield role of a unit. Used for lead-unit spacing in opponent offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Absorbs damage.
    Tank,
    /// Melee damage.
    Striker,
    /// Elemental damage.
    Caster,
    /// Heals and buffs.
    Support,
    /// Fast flanker.
    Skirmisher,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitTemplate(
///     id: "ember_imp",
///     name: "Ember Imp",
///     element: Fire,
///     role: Skirmisher,
///     rank: C,
///     stats: BaseStats(hp: 30, atk: 9, def: 3, speed: 14),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Element.
    pub element: Element,
    /// Battlefield role.
    pub role: Role,
    /// Rank tier.
    #[serde(default)]
    pub rank: Rank,
    /// Optional subclass.
    #[serde(default)]
    pub subclass: Option<Subclass>,
    /// Raw attributes.
    pub stats: BaseStats,
    /// Equipment worn by default.
    #[serde(default)]
    pub equipment: Vec<EquipmentDelta>,
    /// Innate abilities, independent of affinity.
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

impl UnitTemplate {
    /// Create a template with rank C, no subclass, gear or abilities.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        element: Element,
        role: Role,
        stats: BaseStats,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element,
            role,
            rank: Rank::C,
            subclass: None,
            stats,
            equipment: Vec::new(),
            abilities: Vec::new(),
        }
    }

    /// Builder method to set the rank.
    #[must_use]
    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    /// Builder method to set the subclass.
    #[must_use]
    pub fn with_subclass(mut self, subclass: Subclass) -> Self {
        self.subclass = Some(subclass);
        self
    }

    /// Builder method to add an innate ability.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Composed stats for this template.
    #[must_use]
    pub fn final_stats(&self) -> FinalStats {
        let class = self.subclass.map(Subclass::modifiers);
        compose(&self.stats, self.rank, class.as_ref(), &self.equipment)
    }
}
