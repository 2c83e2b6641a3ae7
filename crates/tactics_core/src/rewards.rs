//! Post-battle rewards.
//!
//! Rewards are a pure function of the reward fork, the opponent entry and
//! the battle outcome. Each category draws from its own labelled sub-fork:
//!
//! - `items`: one stream shared by every drop attempt, in attempt order
//! - `equipment/<slot>`: one stream per enemy roster slot
//! - `gems/<n>`: one stream per gem offer
//!
//! so adding a draw to one category never shifts the others.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affinity::Element;
use crate::combat::BattleOutcome;
use crate::data::{Difficulty, ItemDef, LootTable, OpponentSpec, Rarity};
use crate::math::scale_floor;
use crate::rng::ForkRng;
use crate::roster::UnitId;
use crate::stats::EquipmentDelta;

/// Experience per turn before the difficulty multiplier.
pub const EXPERIENCE_PER_TURN: i32 = 10;

/// Gem offers per battle.
pub const GEM_OFFERS: usize = 3;

/// Where a piece of equipment is worn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    /// Raises attack.
    Weapon,
    /// Raises defense and HP.
    Armor,
    /// Raises speed.
    Accessory,
}

impl EquipmentSlot {
    /// All slots, in draw order.
    pub const ALL: [EquipmentSlot; 3] = [
        EquipmentSlot::Weapon,
        EquipmentSlot::Armor,
        EquipmentSlot::Accessory,
    ];

    /// Stat delta granted by a piece in this slot.
    #[must_use]
    pub const fn delta(self, bonus: i32) -> EquipmentDelta {
        match self {
            EquipmentSlot::Weapon => EquipmentDelta {
                atk: bonus,
                ..EquipmentDelta::NONE
            },
            EquipmentSlot::Armor => EquipmentDelta {
                def: bonus,
                hp: bonus * 2,
                ..EquipmentDelta::NONE
            },
            EquipmentSlot::Accessory => EquipmentDelta {
                speed: bonus,
                ..EquipmentDelta::NONE
            },
        }
    }
}

/// Quality of an offered gem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GemTier {
    /// Lowest tier.
    Chipped,
    /// Second tier.
    Flawed,
    /// Third tier.
    Polished,
    /// Highest tier.
    Radiant,
}

/// Dropped equipment, ready to be equipped on a roster unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentDrop {
    /// Slot.
    pub slot: EquipmentSlot,
    /// Rarity.
    pub rarity: Rarity,
    /// Stat bonus.
    pub bonus: EquipmentDelta,
    /// Template of the enemy that dropped it.
    pub source_template: String,
}

/// A gem the player may pick as the run's alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GemOffer {
    /// Element.
    pub element: Element,
    /// Tier.
    pub tier: GemTier,
}

/// An enemy the player actually defeated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefeatedEnemy {
    /// Battle id of the unit.
    pub unit_id: UnitId,
    /// Template the unit was built from.
    pub template_id: String,
}

/// Everything earned from one battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardBundle {
    /// Experience.
    pub experience: i32,
    /// Item drops.
    pub items: Vec<ItemDef>,
    /// Equipment drops.
    pub equipment: Vec<EquipmentDrop>,
    /// Exactly three gem offers.
    pub gem_choices: [GemOffer; GEM_OFFERS],
    /// Defeated enemies in order of defeat.
    pub defeated_enemies: Vec<DefeatedEnemy>,
}

/// Reward settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardConfig {
    /// Table item drops are picked from.
    pub loot: LootTable,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            loot: LootTable::builtin(),
        }
    }
}

impl RewardConfig {
    /// Builder method to swap the loot table.
    #[must_use]
    pub fn with_loot_table(mut self, loot: LootTable) -> Self {
        self.loot = loot;
        self
    }
}

/// Cumulative rarity thresholds for a roll in `[0, 1)`: common, uncommon, rare.
/// Anything above the last threshold is epic.
const fn rarity_thresholds(difficulty: Difficulty) -> [f64; 3] {
    match difficulty {
        Difficulty::Standard => [0.70, 0.92, 0.99],
        Difficulty::Normal => [0.55, 0.85, 0.97],
        Difficulty::Hard => [0.35, 0.70, 0.92],
    }
}

/// Cumulative gem tier thresholds: chipped, flawed, polished.
const fn gem_thresholds(difficulty: Difficulty) -> [f64; 3] {
    match difficulty {
        Difficulty::Standard => [0.60, 0.90, 0.99],
        Difficulty::Normal => [0.40, 0.80, 0.96],
        Difficulty::Hard => [0.20, 0.60, 0.90],
    }
}

/// Chance that one enemy unit drops equipment.
const fn equipment_chance(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Standard => 0.25,
        Difficulty::Normal => 0.35,
        Difficulty::Hard => 0.5,
    }
}

fn roll_rarity(rng: &mut ForkRng, difficulty: Difficulty) -> Rarity {
    let roll = rng.next_float();
    let [common, uncommon, rare] = rarity_thresholds(difficulty);
    if roll < common {
        Rarity::Common
    } else if roll < uncommon {
        Rarity::Uncommon
    } else if roll < rare {
        Rarity::Rare
    } else {
        Rarity::Epic
    }
}

fn roll_gem_tier(rng: &mut ForkRng, difficulty: Difficulty) -> GemTier {
    let roll = rng.next_float();
    let [chipped, flawed, polished] = gem_thresholds(difficulty);
    if roll < chipped {
        GemTier::Chipped
    } else if roll < flawed {
        GemTier::Flawed
    } else if roll < polished {
        GemTier::Polished
    } else {
        GemTier::Radiant
    }
}

/// Generate the rewards of a finished battle.
///
/// Rewards are computed whatever the winner; whether to grant them is up to
/// the caller.
#[must_use]
pub fn generate_rewards(
    rng: &ForkRng,
    spec: &OpponentSpec,
    outcome: &BattleOutcome,
    config: &RewardConfig,
) -> RewardBundle {
    let difficulty = spec.difficulty;
    let turns = i32::try_from(outcome.turns_taken).unwrap_or(i32::MAX);
    let experience = scale_floor(
        turns.saturating_mul(EXPERIENCE_PER_TURN),
        &[difficulty.experience_multiplier()],
    );

    let items = roll_items(&mut rng.fork("items"), difficulty, &config.loot);
    let equipment = roll_equipment(&rng.fork("equipment"), spec);
    let gem_choices = roll_gems(&rng.fork("gems"), difficulty);
    let defeated_enemies = defeated_enemies(spec, outcome);

    debug!(
        opponent = %spec.id,
        experience,
        items = items.len(),
        equipment = equipment.len(),
        defeated = defeated_enemies.len(),
        "Rewards generated"
    );

    RewardBundle {
        experience,
        items,
        equipment,
        gem_choices,
        defeated_enemies,
    }
}

fn roll_items(rng: &mut ForkRng, difficulty: Difficulty, loot: &LootTable) -> Vec<ItemDef> {
    let mut items = Vec::new();
    for _ in 0..difficulty.max_drops() {
        if rng.chance(difficulty.drop_chance()) {
            let rarity = roll_rarity(rng, difficulty);
            items.push(loot.pick(rarity, rng).clone());
        }
    }
    items
}

fn roll_equipment(rng: &ForkRng, spec: &OpponentSpec) -> Vec<EquipmentDrop> {
    let difficulty = spec.difficulty;
    spec.units
        .iter()
        .enumerate()
        .filter_map(|(slot_index, template)| {
            let mut rng = rng.fork(slot_index);
            if !rng.chance(equipment_chance(difficulty)) {
                return None;
            }
            let slot = rng
                .choose(&EquipmentSlot::ALL)
                .copied()
                .unwrap_or(EquipmentSlot::Weapon);
            let rarity = roll_rarity(&mut rng, difficulty);
            let (lo, hi) = rarity.bonus_range();
            let bonus = rng.next_int(i64::from(lo), i64::from(hi)) as i32;
            Some(EquipmentDrop {
                slot,
                rarity,
                bonus: slot.delta(bonus),
                source_template: template.id.clone(),
            })
        })
        .collect()
}

fn roll_gems(rng: &ForkRng, difficulty: Difficulty) -> [GemOffer; GEM_OFFERS] {
    std::array::from_fn(|n| {
        let mut rng = rng.fork(n);
        let element = rng.choose(&Element::ALL).copied().unwrap_or(Element::Fire);
        let tier = roll_gem_tier(&mut rng, difficulty);
        GemOffer { element, tier }
    })
}

/// Defeated units of the outcome that belong to this opponent's roster.
fn defeated_enemies(spec: &OpponentSpec, outcome: &BattleOutcome) -> Vec<DefeatedEnemy> {
    let ids = spec.enemy_ids(outcome.battle_index);
    outcome
        .units_defeated
        .iter()
        .filter_map(|defeated| {
            ids.iter()
                .position(|id| id == defeated)
                .map(|slot| DefeatedEnemy {
                    unit_id: *defeated,
                    template_id: spec.units[slot].id.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Winner;
    use crate::data::OpponentCatalog;

    fn outcome(spec: &OpponentSpec, turns: u32, defeated: Vec<UnitId>) -> BattleOutcome {
        BattleOutcome {
            winner: Winner::Player,
            actions: Vec::new(),
            turns_taken: turns,
            units_defeated: defeated,
            battle_index: 2,
            opponent_id: spec.id.clone(),
            player_mp: Vec::new(),
        }
    }

    #[test]
    fn test_experience_by_difficulty() {
        let catalog = OpponentCatalog::builtin();
        let rng = ForkRng::new(1).fork("rewards").fork(2u32);
        let config = RewardConfig::default();
        for (id, expected) in [("slime_pack", 70), ("stone_golem", 105), ("wraith_court", 140)] {
            let spec = catalog.get(id).unwrap();
            let bundle = generate_rewards(&rng, spec, &outcome(spec, 7, Vec::new()), &config);
            assert_eq!(bundle.experience, expected, "{id}");
        }
    }

    #[test]
    fn test_same_fork_same_rewards() {
        let catalog = OpponentCatalog::builtin();
        let spec = catalog.get("bandit_camp").unwrap();
        let result = outcome(spec, 5, spec.enemy_ids(2));
        let rng = ForkRng::new(99).fork("rewards").fork(2u32);
        let config = RewardConfig::default();
        assert_eq!(
            generate_rewards(&rng, spec, &result, &config),
            generate_rewards(&rng, spec, &result, &config)
        );
    }

    #[test]
    fn test_item_count_bounded_by_max_drops() {
        let catalog = OpponentCatalog::builtin();
        let config = RewardConfig::default();
        for spec in catalog.entries() {
            for seed in 0..40 {
                let rng = ForkRng::new(seed);
                let bundle = generate_rewards(&rng, spec, &outcome(spec, 3, Vec::new()), &config);
                assert!(bundle.items.len() <= spec.difficulty.max_drops() as usize);
                assert!(bundle.equipment.len() <= spec.units.len());
            }
        }
    }

    #[test]
    fn test_defeated_enemies_filtered_against_spec() {
        let catalog = OpponentCatalog::builtin();
        let spec = catalog.get("goblin_raiders").unwrap();
        let ids = spec.enemy_ids(2);
        let stranger = UnitId::enemy("someone_else", 2, 0);
        let result = outcome(spec, 4, vec![ids[1], stranger, UnitId::recruit(0)]);
        let bundle = generate_rewards(&ForkRng::new(3), spec, &result, &RewardConfig::default());
        assert_eq!(
            bundle.defeated_enemies,
            vec![DefeatedEnemy {
                unit_id: ids[1],
                template_id: spec.units[1].id.clone(),
            }]
        );
    }

    #[test]
    fn test_equipment_bonus_within_rarity_range() {
        let catalog = OpponentCatalog::builtin();
        let spec = catalog.get("ember_drake").unwrap();
        let config = RewardConfig::default();
        for seed in 0..100 {
            let bundle =
                generate_rewards(&ForkRng::new(seed), spec, &outcome(spec, 3, Vec::new()), &config);
            for drop in bundle.equipment {
                let (lo, hi) = drop.rarity.bonus_range();
                let value = match drop.slot {
                    EquipmentSlot::Weapon => drop.bonus.atk,
                    EquipmentSlot::Armor => drop.bonus.def,
                    EquipmentSlot::Accessory => drop.bonus.speed,
                };
                assert!((lo..=hi).contains(&value));
            }
        }
    }

    #[test]
    fn test_gem_stream_independent_of_items() {
        // Same fork, different loot table: item picks may differ, gems may not.
        let catalog = OpponentCatalog::builtin();
        let spec = catalog.get("shadow_cult").unwrap();
        let result = outcome(spec, 6, Vec::new());
        let rng = ForkRng::new(5);
        let small = LootTable::new(vec![ItemDef::new("pebble", "Pebble", Rarity::Common)]).unwrap();
        let a = generate_rewards(&rng, spec, &result, &RewardConfig::default());
        let b = generate_rewards(&rng, spec, &result, &RewardConfig::default().with_loot_table(small));
        assert_eq!(a.gem_choices, b.gem_choices);
        assert_eq!(a.equipment, b.equipment);
        assert!(b.items.iter().all(|item| item.id == "pebble"));
    }
}
