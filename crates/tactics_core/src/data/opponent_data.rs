//! Opponent catalog data structures.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::abilities::{bundle_ability, BundleSlot};
use crate::affinity::Element;
use crate::data::unit_data::{Role, UnitTemplate};
use crate::error::{CatalogError, Result, TacticsError};
use crate::math::Percent;
use crate::roster::{RosterUnit, UnitId};
use crate::stats::{BaseStats, Rank, Subclass};

/// Opponents needed for a full offer.
pub const MIN_CATALOG_SIZE: usize = 3;

/// Difficulty tier of an opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Baseline encounter.
    Standard,
    /// Tougher encounter.
    Normal,
    /// Hardest encounter.
    Hard,
}

impl Difficulty {
    /// Experience multiplier.
    #[must_use]
    pub const fn experience_multiplier(self) -> Percent {
        match self {
            Difficulty::Standard => Percent(100),
            Difficulty::Normal => Percent(150),
            Difficulty::Hard => Percent(200),
        }
    }

    /// Number of item drop attempts.
    #[must_use]
    pub const fn max_drops(self) -> u32 {
        match self {
            Difficulty::Standard => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Success probability of each drop attempt.
    #[must_use]
    pub const fn drop_chance(self) -> f64 {
        match self {
            Difficulty::Standard => 0.3,
            Difficulty::Normal => 0.5,
            Difficulty::Hard => 0.8,
        }
    }
}

/// A catalog entry describing one opponent encounter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpponentSpec {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Primary theme tag, unique within an offer.
    pub primary_tag: String,
    /// Tags describing what counters this opponent.
    #[serde(default)]
    pub counter_tags: Vec<String>,
    /// Enemy units, in roster order.
    pub units: Vec<UnitTemplate>,
}

impl OpponentSpec {
    /// Create an opponent with no units.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        difficulty: Difficulty,
        primary_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            difficulty,
            primary_tag: primary_tag.into(),
            counter_tags: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Builder method to add counter tags.
    #[must_use]
    pub fn with_counter_tags(mut self, tags: &[&str]) -> Self {
        self.counter_tags
            .extend(tags.iter().map(|tag| (*tag).to_string()));
        self
    }

    /// Builder method to add a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: UnitTemplate) -> Self {
        self.units.push(unit);
        self
    }

    /// Role of the first unit, if any.
    #[must_use]
    pub fn lead_role(&self) -> Option<Role> {
        self.units.first().map(|unit| unit.role)
    }

    /// Content-addressed ids of this opponent's units for a battle.
    #[must_use]
    pub fn enemy_ids(&self, battle_index: u32) -> Vec<UnitId> {
        self.units
            .iter()
            .enumerate()
            .map(|(slot, unit)| UnitId::enemy(&unit.id, battle_index, slot))
            .collect()
    }

    /// Instantiate this opponent's units for a battle.
    #[must_use]
    pub fn enemy_roster(&self, battle_index: u32) -> Vec<RosterUnit> {
        self.units
            .iter()
            .zip(self.enemy_ids(battle_index))
            .map(|(template, id)| RosterUnit::from_template(template, id))
            .collect()
    }
}

/// Validated set of opponents.
///
/// Construction rejects catalogs the choice generator cannot work with, so
/// generation itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OpponentCatalog {
    entries: Vec<OpponentSpec>,
}

impl OpponentCatalog {
    /// Validate and wrap catalog entries.
    pub fn new(entries: Vec<OpponentSpec>) -> std::result::Result<Self, CatalogError> {
        if entries.len() < MIN_CATALOG_SIZE {
            return Err(CatalogError::TooFewOpponents {
                required: MIN_CATALOG_SIZE,
                found: entries.len(),
            });
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(CatalogError::DuplicateOpponent(entry.id.clone()));
            }
            if entry.units.is_empty() {
                return Err(CatalogError::EmptyOpponent(entry.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Parse and validate a catalog from a RON list of opponents.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        let entries: Vec<OpponentSpec> =
            ron::from_str(ron_text).map_err(|e| TacticsError::DataParse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(entries)?)
    }

    /// All entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[OpponentSpec] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a validated catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OpponentSpec> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// The catalog shipped with the game.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }
}

fn unit(
    id: &str,
    name: &str,
    element: Element,
    role: Role,
    stats: BaseStats,
) -> UnitTemplate {
    UnitTemplate::new(id, name, element, role, stats)
}

fn builtin_entries() -> Vec<OpponentSpec> {
    vec![
        OpponentSpec::new("slime_pack", "Slime Pack", Difficulty::Standard, "swarm")
            .with_counter_tags(&["area"])
            .with_unit(unit(
                "blue_slime",
                "Blue Slime",
                Element::Water,
                Role::Tank,
                BaseStats::new(40, 8, 6, 6, 0),
            ))
            .with_unit(unit(
                "green_slime",
                "Green Slime",
                Element::Earth,
                Role::Striker,
                BaseStats::new(30, 9, 4, 7, 0),
            ))
            .with_unit(unit(
                "red_slime",
                "Red Slime",
                Element::Fire,
                Role::Striker,
                BaseStats::new(30, 10, 3, 8, 0),
            )),
        OpponentSpec::new("goblin_raiders", "Goblin Raiders", Difficulty::Standard, "raiders")
            .with_counter_tags(&["defense", "speed"])
            .with_unit(unit(
                "goblin_scout",
                "Goblin Scout",
                Element::Wind,
                Role::Skirmisher,
                BaseStats::new(35, 11, 4, 16, 0),
            ))
            .with_unit(unit(
                "goblin_brute",
                "Goblin Brute",
                Element::Earth,
                Role::Striker,
                BaseStats::new(55, 13, 6, 8, 0),
            )),
        OpponentSpec::new("wolf_den", "Wolf Den", Difficulty::Standard, "beast")
            .with_counter_tags(&["fire"])
            .with_unit(unit(
                "grey_wolf",
                "Grey Wolf",
                Element::Wind,
                Role::Striker,
                BaseStats::new(45, 12, 5, 14, 0),
            ))
            .with_unit(unit(
                "wolf_pup",
                "Wolf Pup",
                Element::Wind,
                Role::Skirmisher,
                BaseStats::new(25, 8, 3, 15, 0),
            )),
        OpponentSpec::new("frost_nymphs", "Frost Nymphs", Difficulty::Standard, "fey")
            .with_counter_tags(&["fire", "burst"])
            .with_unit(
                unit(
                    "frost_nymph",
                    "Frost Nymph",
                    Element::Water,
                    Role::Support,
                    BaseStats::new(40, 9, 5, 12, 24),
                )
                .with_ability(bundle_ability(Element::Water, BundleSlot::Support)),
            )
            .with_unit(unit(
                "ice_sprite",
                "Ice Sprite",
                Element::Water,
                Role::Caster,
                BaseStats::new(30, 11, 3, 13, 0),
            )),
        OpponentSpec::new("stone_golem", "Stone Golem", Difficulty::Normal, "construct")
            .with_counter_tags(&["magic", "wind"])
            .with_unit(
                unit(
                    "stone_golem",
                    "Stone Golem",
                    Element::Earth,
                    Role::Tank,
                    BaseStats::new(140, 16, 14, 5, 0),
                )
                .with_subclass(Subclass::Sentinel),
            ),
        OpponentSpec::new("shadow_cult", "Shadow Cult", Difficulty::Normal, "arcane")
            .with_counter_tags(&["light", "burst"])
            .with_unit(
                unit(
                    "cult_adept",
                    "Cult Adept",
                    Element::Dark,
                    Role::Caster,
                    BaseStats::new(50, 14, 5, 11, 30),
                )
                .with_ability(bundle_ability(Element::Dark, BundleSlot::Basic)),
            )
            .with_unit(unit(
                "cult_guard",
                "Cult Guard",
                Element::Dark,
                Role::Tank,
                BaseStats::new(70, 12, 10, 7, 0),
            )),
        OpponentSpec::new("bandit_camp", "Bandit Camp", Difficulty::Normal, "outlaw")
            .with_counter_tags(&["defense"])
            .with_unit(
                unit(
                    "bandit_chief",
                    "Bandit Chief",
                    Element::Fire,
                    Role::Striker,
                    BaseStats::new(80, 17, 8, 12, 0),
                )
                .with_subclass(Subclass::Berserker),
            )
            .with_unit(unit(
                "bandit_archer",
                "Bandit Archer",
                Element::Wind,
                Role::Skirmisher,
                BaseStats::new(45, 14, 4, 15, 0),
            )),
        OpponentSpec::new("wraith_court", "Wraith Court", Difficulty::Hard, "undead")
            .with_counter_tags(&["light", "heal"])
            .with_unit(
                unit(
                    "wraith_lord",
                    "Wraith Lord",
                    Element::Dark,
                    Role::Caster,
                    BaseStats::new(110, 20, 9, 13, 40),
                )
                .with_rank(Rank::B)
                .with_ability(bundle_ability(Element::Dark, BundleSlot::Area)),
            )
            .with_unit(unit(
                "restless_shade",
                "Restless Shade",
                Element::Dark,
                Role::Skirmisher,
                BaseStats::new(60, 15, 6, 16, 0),
            )),
        OpponentSpec::new("ember_drake", "Ember Drake", Difficulty::Hard, "dragon")
            .with_counter_tags(&["water", "ward"])
            .with_unit(
                unit(
                    "ember_drake",
                    "Ember Drake",
                    Element::Fire,
                    Role::Striker,
                    BaseStats::new(180, 22, 12, 10, 32),
                )
                .with_rank(Rank::A)
                .with_ability(bundle_ability(Element::Fire, BundleSlot::Ultimate)),
            ),
    ]
}
