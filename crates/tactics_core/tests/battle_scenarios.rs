//! Battle scenario tests.
//!
//! Full battles against fixture rosters, checked through the action log.

use tactics_core::affinity::{AffinityState, Element};
use tactics_core::combat::{resolve_battle, ActionKind, BattleConfig, Side, Winner};
use tactics_core::rng::ForkRng;
use tactics_core::roster::{RosterUnit, UnitId};
use tactics_core::run::battle_rng;
use tactics_test_utils::fixtures;

#[test]
fn sample_roster_beats_weak_enemy() {
    let outcome = fixtures::scenario_battle(12345).run();

    assert_eq!(outcome.winner, Winner::Player);
    assert!(outcome.turns_taken >= 1);
    let enemy_id = fixtures::weak_opponent().enemy_ids(0)[0];
    assert_eq!(outcome.units_defeated, vec![enemy_id]);
    let last = outcome.actions.last().unwrap();
    assert_eq!(last.kind, ActionKind::Defeat);
    assert_eq!(last.actor, enemy_id);
}

#[test]
fn scenario_log_is_reproducible() {
    let a = fixtures::scenario_battle(12345).run();
    let b = fixtures::scenario_battle(12345).run();
    assert_eq!(a.actions, b.actions);
    assert_eq!(a.state_hash(), b.state_hash());
}

#[test]
fn fastest_unit_acts_first() {
    // Knight: 40 speed at rank B is 46, mage 30, slime 2.
    let outcome = fixtures::scenario_battle(1).run();
    assert_eq!(outcome.actions[0].actor, UnitId::recruit(0));
}

#[test]
fn sequence_numbers_are_contiguous() {
    for seed in 0..20 {
        let outcome = fixtures::scenario_battle(seed).run();
        for (i, action) in outcome.actions.iter().enumerate() {
            assert_eq!(action.seq as usize, i);
        }
    }
}

#[test]
fn every_hit_deals_at_least_one_damage() {
    for seed in 0..20 {
        let outcome = fixtures::scenario_battle(seed).run();
        for action in &outcome.actions {
            if matches!(action.kind, ActionKind::Attack) {
                assert!(action.magnitude.unwrap() >= 1);
            }
        }
    }
}

#[test]
fn empty_enemy_roster_is_immediate_win() {
    let outcome = resolve_battle(
        &fixtures::sample_player_roster(),
        &[],
        battle_rng(&ForkRng::new(3), 0),
        0,
        "nobody",
    );
    assert_eq!(outcome.winner, Winner::Player);
    assert_eq!(outcome.turns_taken, 0);
    assert!(outcome.actions.is_empty());
}

#[test]
fn aligned_mage_learns_fire_bundle() {
    let config = BattleConfig::default().with_affinity(AffinityState::aligned(Element::Fire));
    let battle = fixtures::scenario_battle_with(8, config);
    let mage = battle
        .units()
        .iter()
        .find(|unit| unit.id == UnitId::recruit(1))
        .unwrap();
    assert_eq!(mage.side, Side::Player);
    assert!(mage.abilities.iter().any(|a| a.id == "fire_ultimate"));
    // Earth knight is neutral to Fire and learns nothing.
    assert!(battle.units()[0].abilities.is_empty());
}

#[test]
fn different_battle_forks_can_differ_but_each_is_stable() {
    let roster = fixtures::sample_player_roster();
    let enemy = fixtures::weak_opponent().enemy_roster(0);
    let root = ForkRng::new(555);
    let a = resolve_battle(&roster, &enemy, battle_rng(&root, 0), 0, "weak_slime");
    let again = resolve_battle(&roster, &enemy, battle_rng(&root, 0), 0, "weak_slime");
    assert_eq!(a, again);
}

#[test]
fn stalemate_ends_in_draw_at_turn_limit() {
    let wall = |id: UnitId| {
        let template = tactics_core::data::UnitTemplate::new(
            "wall",
            "Wall",
            Element::Earth,
            tactics_core::data::Role::Tank,
            tactics_core::stats::BaseStats::new(20_000, 1, 200, 5, 0),
        );
        RosterUnit::from_template(&template, id)
    };
    let outcome = resolve_battle(
        &[wall(UnitId::recruit(0))],
        &[wall(UnitId::enemy("wall", 0, 0))],
        ForkRng::new(1),
        0,
        "wall",
    );
    assert_eq!(outcome.winner, Winner::Draw);
    assert_eq!(outcome.turns_taken, tactics_core::combat::MAX_TURNS);
    assert!(outcome.units_defeated.is_empty());
}

#[test]
fn unit_defeated_mid_turn_loses_its_action() {
    let templates = fixtures::templates_from_ron(
        r#"[
            (id: "duelist", name: "Duelist", element: Wind, role: Striker,
             stats: (hp: 500, atk: 60, def: 10, speed: 50)),
            (id: "gnat", name: "Gnat", element: Fire, role: Skirmisher,
             stats: (hp: 5, atk: 3, def: 0, speed: 1)),
            (id: "boulder", name: "Boulder", element: Earth, role: Tank,
             stats: (hp: 2000, atk: 3, def: 0, speed: 1)),
        ]"#,
    );
    let player = [RosterUnit::from_template(&templates[0], UnitId::recruit(0))];
    let gnat = UnitId::enemy("swarm", 0, 0);
    let boulder = UnitId::enemy("swarm", 0, 1);
    let enemy = [
        RosterUnit::from_template(&templates[1], gnat),
        RosterUnit::from_template(&templates[2], boulder),
    ];

    let outcome = resolve_battle(&player, &enemy, ForkRng::new(77), 0, "swarm");

    assert_eq!(outcome.winner, Winner::Player);
    assert!(outcome.turns_taken > 1);
    let defeat_at = outcome
        .actions
        .iter()
        .position(|a| a.kind == ActionKind::Defeat && a.actor == gnat)
        .unwrap();
    // The duelist opens turn one by finishing the gnat.
    assert_eq!(defeat_at, 1);
    assert!(outcome.actions[defeat_at + 1..]
        .iter()
        .all(|a| a.actor != gnat));
    // The battle carries on and the boulder still acts that turn.
    assert_eq!(outcome.actions[defeat_at + 1].actor, boulder);
    assert_eq!(outcome.actions[defeat_at + 1].kind, ActionKind::Attack);
}
