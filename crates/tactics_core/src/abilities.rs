//! Ability definitions and cast failures.
//!
//! Abilities are plain data. The combat resolver decides when to cast them and
//! computes magnitudes; this module only describes *what* an ability does and
//! defines the elemental bundles handed out by the affinity resolver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::affinity::Element;

/// What an ability does to its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Deals damage.
    Damage,
    /// Restores HP.
    Heal,
    /// Applies a temporary stat bonus.
    Buff,
}

/// Who an ability affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetScope {
    /// The caster only.
    SelfOnly,
    /// One living ally (lowest HP first).
    SingleAlly,
    /// Every living ally, caster included.
    AllAllies,
    /// One living enemy (lowest HP first).
    SingleEnemy,
    /// Every living enemy.
    AllEnemies,
}

impl TargetScope {
    /// Whether the scope points at the opposing side.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, TargetScope::SingleEnemy | TargetScope::AllEnemies)
    }
}

/// Stat a buff modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffStat {
    /// Attack.
    Atk,
    /// Defense.
    Def,
    /// Speed.
    Speed,
}

/// Buff payload of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuffSpec {
    /// Stat modified.
    pub stat: BuffStat,
    /// Flat amount added while active.
    pub amount: i32,
    /// Duration in turns.
    pub duration: u32,
}

/// A castable ability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ability {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// MP deducted from the caster on a successful cast.
    pub mp_cost: i32,
    /// Effect kind.
    pub kind: EffectKind,
    /// Target scope.
    pub scope: TargetScope,
    /// Base power for damage and heals.
    #[serde(default)]
    pub power: i32,
    /// Buff applied when `kind` is [`EffectKind::Buff`].
    #[serde(default)]
    pub buff: Option<BuffSpec>,
    /// Optional element tag.
    #[serde(default)]
    pub element: Option<Element>,
}

impl Ability {
    fn new(
        id: String,
        name: &str,
        mp_cost: i32,
        kind: EffectKind,
        scope: TargetScope,
        power: i32,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            mp_cost,
            kind,
            scope,
            power,
            buff: None,
            element: None,
        }
    }

    #[must_use]
    fn with_buff(mut self, stat: BuffStat, amount: i32, duration: u32) -> Self {
        self.buff = Some(BuffSpec {
            stat,
            amount,
            duration,
        });
        self
    }

    #[must_use]
    fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }
}

/// Recoverable cast failures. A failed cast never aborts a battle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbilityError {
    /// Caster cannot pay the MP cost.
    #[error("Not enough MP: need {required}, have {available}")]
    InsufficientMp {
        /// MP cost.
        required: i32,
        /// Caster MP.
        available: i32,
    },

    /// Single-target heal aimed at a unit with full HP.
    #[error("Target is already at full HP")]
    TargetAtFullHp,

    /// No living unit matches the ability's scope.
    #[error("No valid target")]
    NoValidTarget,

    /// Buff ability without a buff payload.
    #[error("Ability '{0}' has no buff payload")]
    MissingBuff(String),
}

/// Slot of an ability inside an elemental bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleSlot {
    /// Cheap single-target damage.
    Basic,
    /// Damage to every enemy.
    Area,
    /// Expensive single-target damage.
    Ultimate,
    /// Element-specific heal or buff.
    Support,
}

/// The four abilities a unit learns when its element matches the alignment.
#[must_use]
pub fn element_bundle(element: Element) -> Vec<Ability> {
    [
        BundleSlot::Basic,
        BundleSlot::Area,
        BundleSlot::Ultimate,
        BundleSlot::Support,
    ]
    .into_iter()
    .map(|slot| bundle_ability(element, slot))
    .collect()
}

/// One ability of an elemental bundle.
#[must_use]
pub fn bundle_ability(element: Element, slot: BundleSlot) -> Ability {
    let key = element.key();
    let [basic, area, ultimate, support] = bundle_names(element);
    let ability = match slot {
        BundleSlot::Basic => Ability::new(
            format!("{key}_basic"),
            basic,
            4,
            EffectKind::Damage,
            TargetScope::SingleEnemy,
            8,
        ),
        BundleSlot::Area => Ability::new(
            format!("{key}_area"),
            area,
            9,
            EffectKind::Damage,
            TargetScope::AllEnemies,
            6,
        ),
        BundleSlot::Ultimate => Ability::new(
            format!("{key}_ultimate"),
            ultimate,
            16,
            EffectKind::Damage,
            TargetScope::SingleEnemy,
            22,
        ),
        BundleSlot::Support => support_ability(element, format!("{key}_support"), support),
    };
    ability.with_element(element)
}

fn support_ability(element: Element, id: String, name: &str) -> Ability {
    match element {
        Element::Fire => Ability::new(id, name, 6, EffectKind::Buff, TargetScope::AllAllies, 0)
            .with_buff(BuffStat::Atk, 4, 3),
        Element::Water => Ability::new(id, name, 8, EffectKind::Heal, TargetScope::AllAllies, 10),
        Element::Earth => Ability::new(id, name, 6, EffectKind::Buff, TargetScope::AllAllies, 0)
            .with_buff(BuffStat::Def, 5, 3),
        Element::Wind => Ability::new(id, name, 5, EffectKind::Buff, TargetScope::AllAllies, 0)
            .with_buff(BuffStat::Speed, 6, 3),
        Element::Light => Ability::new(id, name, 6, EffectKind::Heal, TargetScope::SingleAlly, 18),
        Element::Dark => Ability::new(id, name, 4, EffectKind::Buff, TargetScope::SelfOnly, 0)
            .with_buff(BuffStat::Atk, 8, 2),
    }
}

fn bundle_names(element: Element) -> [&'static str; 4] {
    match element {
        Element::Fire => ["Ember", "Flame Wave", "Inferno", "Kindle"],
        Element::Water => ["Splash", "Tidal Surge", "Maelstrom", "Mending Rain"],
        Element::Earth => ["Stone Shard", "Quake", "Landslide", "Stone Skin"],
        Element::Wind => ["Gust", "Cyclone", "Tempest", "Tailwind"],
        Element::Light => ["Radiant Bolt", "Sunburst", "Judgment", "Renew"],
        Element::Dark => ["Shadow Bolt", "Umbral Wave", "Oblivion", "Dread Pact"],
    }
}

/// Defensive ward granted to a unit that counters the alignment.
///
/// Keyed to the alignment's element, not the unit's.
#[must_use]
pub fn ward_ability(alignment: Element) -> Ability {
    Ability::new(
        format!("ward_{}", alignment.key()),
        &format!("{} Ward", alignment.display_name()),
        5,
        EffectKind::Buff,
        TargetScope::SelfOnly,
        0,
    )
    .with_buff(BuffStat::Def, 6, 3)
    .with_element(alignment)
}
