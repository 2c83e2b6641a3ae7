//! Loot table data structures.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result, TacticsError};
use crate::rng::ForkRng;

/// Item and equipment rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Most frequent.
    Common,
    /// Slightly better.
    Uncommon,
    /// Hard to find.
    Rare,
    /// Best tier.
    Epic,
}

impl Rarity {
    /// Stat bonus range `[lo, hi]` for equipment of this rarity.
    #[must_use]
    pub const fn bonus_range(self) -> (i32, i32) {
        match self {
            Rarity::Common => (1, 3),
            Rarity::Uncommon => (3, 5),
            Rarity::Rare => (5, 8),
            Rarity::Epic => (8, 12),
        }
    }
}

/// A consumable or trinket that can drop after battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Rarity bucket.
    pub rarity: Rarity,
}

impl ItemDef {
    /// Create an item definition.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
        }
    }
}

/// Items grouped for rarity-filtered picks.
///
/// Always holds at least one common item so a pick never comes back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LootTable {
    items: Vec<ItemDef>,
}

impl LootTable {
    /// Validate and wrap a list of items.
    pub fn new(items: Vec<ItemDef>) -> std::result::Result<Self, CatalogError> {
        if !items.iter().any(|item| item.rarity == Rarity::Common) {
            return Err(CatalogError::NoCommonLoot);
        }
        Ok(Self { items })
    }

    /// Parse and validate a loot table from a RON list of items.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        let items: Vec<ItemDef> = ron::from_str(ron_text).map_err(|e| TacticsError::DataParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(items)?)
    }

    /// All items in table order.
    #[must_use]
    pub fn items(&self) -> &[ItemDef] {
        &self.items
    }

    /// Items of one rarity, in table order.
    pub fn bucket(&self, rarity: Rarity) -> impl Iterator<Item = &ItemDef> {
        self.items.iter().filter(move |item| item.rarity == rarity)
    }

    /// Pick an item of `rarity`, falling back to the common bucket when that
    /// rarity has no items.
    pub fn pick(&self, rarity: Rarity, rng: &mut ForkRng) -> &ItemDef {
        let mut bucket: Vec<&ItemDef> = self.bucket(rarity).collect();
        if bucket.is_empty() {
            bucket = self.bucket(Rarity::Common).collect();
        }
        match rng.choose(&bucket) {
            Some(item) => *item,
            // Validated tables always have a common bucket.
            None => &self.items[0],
        }
    }

    /// The loot table shipped with the game.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            items: vec![
                ItemDef::new("minor_potion", "Minor Potion", Rarity::Common),
                ItemDef::new("ether_drop", "Ether Drop", Rarity::Common),
                ItemDef::new("smoke_bomb", "Smoke Bomb", Rarity::Common),
                ItemDef::new("potion", "Potion", Rarity::Uncommon),
                ItemDef::new("whetstone", "Whetstone", Rarity::Uncommon),
                ItemDef::new("phoenix_down", "Phoenix Down", Rarity::Rare),
                ItemDef::new("elixir", "Elixir", Rarity::Rare),
                ItemDef::new("merge_crystal", "Merge Crystal", Rarity::Epic),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_common_item() {
        let items = vec![ItemDef::new("elixir", "Elixir", Rarity::Rare)];
        assert_eq!(LootTable::new(items), Err(CatalogError::NoCommonLoot));
    }

    #[test]
    fn test_pick_respects_rarity() {
        let table = LootTable::builtin();
        let mut rng = ForkRng::new(3);
        for _ in 0..50 {
            assert_eq!(table.pick(Rarity::Rare, &mut rng).rarity, Rarity::Rare);
        }
    }

    #[test]
    fn test_pick_falls_back_to_common() {
        let table = LootTable::new(vec![
            ItemDef::new("pebble", "Pebble", Rarity::Common),
            ItemDef::new("gem", "Gem", Rarity::Rare),
        ])
        .unwrap();
        let mut rng = ForkRng::new(3);
        assert_eq!(table.pick(Rarity::Epic, &mut rng).id, "pebble");
    }

    #[test]
    fn test_ron_parse() {
        let text = r#"[
            (id: "pebble", name: "Pebble", rarity: Common),
            (id: "crown", name: "Crown", rarity: Epic),
        ]"#;
        let table = LootTable::from_ron_str("inline", text).unwrap();
        assert_eq!(table.items().len(), 2);
    }
}
