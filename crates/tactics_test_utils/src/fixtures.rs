//! Test fixtures and helpers.
//!
//! Pre-built rosters, opponents and battles for consistent testing.

use tactics_core::affinity::Element;
use tactics_core::combat::{Battle, BattleConfig};
use tactics_core::data::{Difficulty, OpponentCatalog, OpponentSpec, Role, UnitTemplate};
use tactics_core::rng::ForkRng;
use tactics_core::roster::{RosterUnit, UnitId};
use tactics_core::run::{battle_rng, Run};
use tactics_core::stats::{BaseStats, Rank};

/// Opponent id of [`weak_opponent`].
pub const WEAK_OPPONENT_ID: &str = "weak_slime";

/// Sturdy front-liner.
#[must_use]
pub fn knight_template() -> UnitTemplate {
    UnitTemplate::new(
        "knight",
        "Knight",
        Element::Earth,
        Role::Tank,
        BaseStats::new(100, 20, 15, 40, 12),
    )
    .with_rank(Rank::B)
}

/// Fragile caster with a deep MP pool.
#[must_use]
pub fn mage_template() -> UnitTemplate {
    UnitTemplate::new(
        "mage",
        "Mage",
        Element::Fire,
        Role::Caster,
        BaseStats::new(70, 14, 6, 30, 40),
    )
}

/// A single 30 HP enemy that cannot win against the sample roster.
#[must_use]
pub fn weak_enemy_template() -> UnitTemplate {
    UnitTemplate::new(
        "slime",
        "Slime",
        Element::Water,
        Role::Tank,
        BaseStats::new(30, 4, 1, 2, 0),
    )
}

/// Opponent made of one [`weak_enemy_template`].
#[must_use]
pub fn weak_opponent() -> OpponentSpec {
    OpponentSpec::new(WEAK_OPPONENT_ID, "Weak Slime", Difficulty::Standard, "ooze")
        .with_counter_tags(&["fire"])
        .with_unit(weak_enemy_template())
}

/// Knight and mage, recruited as `p0` and `p1`.
#[must_use]
pub fn sample_player_roster() -> Vec<RosterUnit> {
    vec![
        RosterUnit::from_template(&knight_template(), UnitId::recruit(0)),
        RosterUnit::from_template(&mage_template(), UnitId::recruit(1)),
    ]
}

/// Sample roster against the weak opponent, battle 0 of a run seeded `seed`.
#[must_use]
pub fn scenario_battle(seed: u64) -> Battle {
    scenario_battle_with(seed, BattleConfig::default())
}

/// Like [`scenario_battle`] with explicit settings.
#[must_use]
pub fn scenario_battle_with(seed: u64, config: BattleConfig) -> Battle {
    Battle::new(
        &sample_player_roster(),
        &weak_opponent().enemy_roster(0),
        battle_rng(&ForkRng::new(seed), 0),
        0,
        WEAK_OPPONENT_ID,
        config,
    )
}

/// A fresh run with the sample roster and a Fire alignment.
#[must_use]
pub fn sample_run(seed: u64) -> Run {
    let mut run = Run::new(seed);
    run.recruit(&knight_template());
    run.recruit(&mage_template());
    run.set_alignment(Some(Element::Fire));
    run
}

/// A small four-entry catalog in RON, as a data file would hold it.
pub const SAMPLE_CATALOG_RON: &str = r#"[
    (
        id: "mud_crabs",
        name: "Mud Crabs",
        difficulty: Standard,
        primary_tag: "shell",
        counter_tags: ["earth"],
        units: [
            (id: "mud_crab", name: "Mud Crab", element: Water, role: Tank,
             stats: (hp: 45, atk: 8, def: 9, speed: 6)),
            (id: "mud_crab", name: "Mud Crab", element: Water, role: Tank,
             stats: (hp: 45, atk: 8, def: 9, speed: 6)),
        ],
    ),
    (
        id: "ash_sprites",
        name: "Ash Sprites",
        difficulty: Standard,
        primary_tag: "sprite",
        counter_tags: ["water", "wind"],
        units: [
            (id: "ash_sprite", name: "Ash Sprite", element: Fire, role: Skirmisher,
             stats: (hp: 28, atk: 11, def: 3, speed: 22)),
        ],
    ),
    (
        id: "hill_ogre",
        name: "Hill Ogre",
        difficulty: Normal,
        primary_tag: "giant",
        counter_tags: ["wind"],
        units: [
            (id: "hill_ogre", name: "Hill Ogre", element: Earth, role: Striker, rank: B,
             stats: (hp: 120, atk: 19, def: 10, speed: 8)),
        ],
    ),
    (
        id: "lich_tower",
        name: "Lich Tower",
        difficulty: Hard,
        primary_tag: "undead",
        counter_tags: ["light"],
        units: [
            (id: "lich", name: "Lich", element: Dark, role: Caster, rank: A,
             stats: (hp: 90, atk: 24, def: 8, speed: 15, mp: 40)),
            (id: "skeleton", name: "Skeleton", element: Dark, role: Striker,
             stats: (hp: 40, atk: 12, def: 5, speed: 10)),
        ],
    ),
]"#;

/// [`SAMPLE_CATALOG_RON`], parsed and validated.
///
/// # Panics
///
/// Panics if the fixture text no longer parses.
#[must_use]
pub fn sample_catalog() -> OpponentCatalog {
    OpponentCatalog::from_ron_str("sample_catalog", SAMPLE_CATALOG_RON)
        .expect("sample catalog fixture must parse")
}

/// Any RON text, parsed as a list of unit templates.
///
/// # Panics
///
/// Panics if the text does not parse.
#[must_use]
pub fn templates_from_ron(text: &str) -> Vec<UnitTemplate> {
    ron::from_str(text).expect("template fixture must parse")
}
