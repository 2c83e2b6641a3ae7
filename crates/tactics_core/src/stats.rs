//! Layered unit stat composition.
//!
//! Final combat stats are built in a fixed order:
//!
//! ```text
//! ranked  = base × rank multiplier
//! classed = ranked × class modifier        (per stat, 100% without a class)
//! final   = floor(classed) + equipment delta
//! ```
//!
//! The two multiplications are carried out together and floored once per
//! stat, see [`crate::math::scale_floor`]. MP is a fixed pool: it ignores rank
//! and class and only takes equipment deltas.

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::math::{scale_floor, Percent};

/// Merge-progression tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Rank {
    /// Starting tier.
    #[default]
    C,
    /// One merge.
    B,
    /// Two merges.
    A,
    /// Maximum tier.
    S,
}

impl Rank {
    /// Stat multiplier for this tier.
    #[must_use]
    pub const fn multiplier(self) -> Percent {
        match self {
            Rank::C => Percent(100),
            Rank::B => Percent(115),
            Rank::A => Percent(130),
            Rank::S => Percent(150),
        }
    }

    /// Tier reached after a merge. `S` saturates.
    #[must_use]
    pub const fn promoted(self) -> Self {
        match self {
            Rank::C => Rank::B,
            Rank::B => Rank::A,
            Rank::A | Rank::S => Rank::S,
        }
    }
}

/// Raw attributes of a unit before any layer is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BaseStats {
    /// Hit points.
    pub hp: i32,
    /// Attack.
    pub atk: i32,
    /// Defense.
    pub def: i32,
    /// Speed, decides turn order.
    pub speed: i32,
    /// Mana pool.
    #[serde(default)]
    pub mp: i32,
}

impl BaseStats {
    /// Build a stat block.
    #[must_use]
    pub const fn new(hp: i32, atk: i32, def: i32, speed: i32, mp: i32) -> Self {
        Self {
            hp,
            atk,
            def,
            speed,
            mp,
        }
    }
}

/// Per-stat class percentages. Anything unset stays at 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassModifiers {
    /// HP modifier.
    #[serde(default)]
    pub hp: Percent,
    /// Attack modifier.
    #[serde(default)]
    pub atk: Percent,
    /// Defense modifier.
    #[serde(default)]
    pub def: Percent,
    /// Speed modifier.
    #[serde(default)]
    pub speed: Percent,
}

impl Default for ClassModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl ClassModifiers {
    /// No class: every stat at 100%.
    pub const NEUTRAL: Self = Self {
        hp: Percent::HUNDRED,
        atk: Percent::HUNDRED,
        def: Percent::HUNDRED,
        speed: Percent::HUNDRED,
    };
}

/// Built-in subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subclass {
    /// Front-liner: tougher, slower.
    Vanguard,
    /// Damage dealer.
    Berserker,
    /// Defensive specialist.
    Sentinel,
    /// Fast, fragile.
    Skirmisher,
    /// Balanced caster frame.
    Mystic,
}

impl Subclass {
    /// Percentage modifiers for this subclass.
    #[must_use]
    pub const fn modifiers(self) -> ClassModifiers {
        match self {
            Subclass::Vanguard => ClassModifiers {
                hp: Percent(120),
                atk: Percent(100),
                def: Percent(110),
                speed: Percent(90),
            },
            Subclass::Berserker => ClassModifiers {
                hp: Percent(95),
                atk: Percent(125),
                def: Percent(90),
                speed: Percent(100),
            },
            Subclass::Sentinel => ClassModifiers {
                hp: Percent(110),
                atk: Percent(90),
                def: Percent(130),
                speed: Percent(95),
            },
            Subclass::Skirmisher => ClassModifiers {
                hp: Percent(90),
                atk: Percent(105),
                def: Percent(90),
                speed: Percent(125),
            },
            Subclass::Mystic => ClassModifiers {
                hp: Percent(100),
                atk: Percent(110),
                def: Percent(100),
                speed: Percent(105),
            },
        }
    }
}

/// Flat stat changes granted by one piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EquipmentDelta {
    /// HP delta.
    #[serde(default)]
    pub hp: i32,
    /// Attack delta.
    #[serde(default)]
    pub atk: i32,
    /// Defense delta.
    #[serde(default)]
    pub def: i32,
    /// Speed delta.
    #[serde(default)]
    pub speed: i32,
    /// MP delta.
    #[serde(default)]
    pub mp: i32,
}

impl EquipmentDelta {
    /// No change.
    pub const NONE: Self = Self {
        hp: 0,
        atk: 0,
        def: 0,
        speed: 0,
        mp: 0,
    };
}

impl Add for EquipmentDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            hp: self.hp + rhs.hp,
            atk: self.atk + rhs.atk,
            def: self.def + rhs.def,
            speed: self.speed + rhs.speed,
            mp: self.mp + rhs.mp,
        }
    }
}

impl Sum for EquipmentDelta {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::NONE, Add::add)
    }
}

impl<'a> Sum<&'a EquipmentDelta> for EquipmentDelta {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Composed stats used to build a combat unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FinalStats {
    /// Maximum HP.
    pub max_hp: i32,
    /// Attack.
    pub atk: i32,
    /// Defense.
    pub def: i32,
    /// Speed.
    pub speed: i32,
    /// MP available at battle start.
    pub mp: i32,
}

/// Compose final stats from all layers.
///
/// Pure: identical inputs always give identical outputs.
#[must_use]
pub fn compose(
    base: &BaseStats,
    rank: Rank,
    class: Option<&ClassModifiers>,
    equipment: &[EquipmentDelta],
) -> FinalStats {
    let class = class.copied().unwrap_or_default();
    let rank = rank.multiplier();
    let gear: EquipmentDelta = equipment.iter().sum();

    FinalStats {
        max_hp: scale_floor(base.hp, &[rank, class.hp]) + gear.hp,
        atk: scale_floor(base.atk, &[rank, class.atk]) + gear.atk,
        def: scale_floor(base.def, &[rank, class.def]) + gear.def,
        speed: scale_floor(base.speed, &[rank, class.speed]) + gear.speed,
        mp: base.mp + gear.mp,
    }
}
