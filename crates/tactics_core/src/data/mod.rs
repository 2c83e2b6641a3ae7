//! Data structures for encounter content.
//!
//! This module contains pure data structures that describe unit templates,
//! opponent catalogs and loot tables. All of them deserialize from RON.
//!
//! **Note:** This module contains no IO - it only defines and validates data
//! types. File loading is handled by `tactics_headless`.

mod loot_data;
mod opponent_data;
mod unit_data;

pub use loot_data::{ItemDef, LootTable, Rarity};
pub use opponent_data::{Difficulty, OpponentCatalog, OpponentSpec, MIN_CATALOG_SIZE};
pub use unit_data::{Role, UnitTemplate};
