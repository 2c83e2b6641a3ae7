//! Run orchestration tests.
//!
//! Offer, fight, reward and resume across several battles.

use tactics_core::choice::{generate_choices_detailed, ChoiceConfig};
use tactics_core::combat::Winner;
use tactics_core::data::{OpponentCatalog, Rarity};
use tactics_core::error::{RunError, TacticsError};
use tactics_core::rewards::{generate_rewards, RewardConfig};
use tactics_core::rng::ForkRng;
use tactics_core::run::{choice_rng, rewards_rng, Run};
use tactics_test_utils::determinism::verify_snapshot_round_trip;
use tactics_test_utils::fixtures;

fn play(run: &mut Run, catalog: &OpponentCatalog, battles: u32) -> Vec<Winner> {
    let config = RewardConfig::default();
    (0..battles)
        .map(|_| {
            run.offer_choices(catalog);
            run.fight(catalog, 0, &config).unwrap().outcome.winner
        })
        .collect()
}

#[test]
fn offer_regenerates_from_seed_and_index() {
    let catalog = fixtures::sample_catalog();
    let mut run = fixtures::sample_run(42);
    let offered = run.offer_choices(&catalog).clone();

    let regenerated = generate_choices_detailed(
        &choice_rng(&ForkRng::new(42), 0),
        0,
        &catalog,
        None,
        &ChoiceConfig::default(),
    );
    assert_eq!(regenerated.previews, offered);
    assert!(!regenerated.degraded);
}

#[test]
fn rewards_regenerate_from_seed_and_index() {
    let catalog = fixtures::sample_catalog();
    let mut run = fixtures::sample_run(9);
    run.offer_choices(&catalog);
    let report = run.fight(&catalog, 1, &RewardConfig::default()).unwrap();

    let spec = catalog.get(&report.opponent_id).unwrap();
    let again = generate_rewards(
        &rewards_rng(&ForkRng::new(9), 0),
        spec,
        &report.outcome,
        &RewardConfig::default(),
    );
    assert_eq!(again, report.rewards);
    assert_eq!(report.rewards.gem_choices.len(), 3);
}

#[test]
fn progression_counts_every_battle() {
    let catalog = fixtures::sample_catalog();
    let mut run = fixtures::sample_run(1234);
    let winners = play(&mut run, &catalog, 4);

    let p = run.progression();
    let won = winners.iter().filter(|w| **w == Winner::Player).count() as u32;
    assert_eq!(p.battles_won, won);
    assert_eq!(p.battles_won + p.battles_lost, 4);
    assert_eq!(run.battle_index(), 4);
}

#[test]
fn snapshot_survives_every_phase() {
    let catalog = fixtures::sample_catalog();
    let mut run = fixtures::sample_run(6);
    assert!(verify_snapshot_round_trip(&run));
    run.offer_choices(&catalog);
    assert!(verify_snapshot_round_trip(&run));
    run.fight(&catalog, 0, &RewardConfig::default()).unwrap();
    assert!(verify_snapshot_round_trip(&run));
}

#[test]
fn resumed_run_continues_identically() {
    let catalog = OpponentCatalog::builtin();
    let mut original = fixtures::sample_run(2718);
    play(&mut original, &catalog, 2);
    let snapshot = original.snapshot();
    let tail = play(&mut original, &catalog, 3);

    let mut resumed = Run::resume(snapshot).unwrap();
    assert_eq!(play(&mut resumed, &catalog, 3), tail);
    assert_eq!(resumed.snapshot(), original.snapshot());
}

#[test]
fn unknown_opponent_is_reported() {
    let builtin = OpponentCatalog::builtin();
    let other = fixtures::sample_catalog();
    let mut run = fixtures::sample_run(3);
    run.offer_choices(&builtin);
    let err = run.fight(&other, 0, &RewardConfig::default()).unwrap_err();
    assert!(matches!(err, TacticsError::Run(RunError::UnknownOpponent(_))));
    // The offer is kept so the caller can retry with the right catalog.
    assert!(run.last_choices().is_some());
}

#[test]
fn dropped_equipment_feeds_stat_composer() {
    let catalog = OpponentCatalog::builtin();
    let mut run = fixtures::sample_run(77);
    for _ in 0..10 {
        run.offer_choices(&catalog);
        let report = run.fight(&catalog, 0, &RewardConfig::default()).unwrap();
        if let Some(drop) = report.rewards.equipment.first() {
            let before = run.team()[0].stats();
            run.team_mut()[0].equip(drop.bonus);
            let after = run.team()[0].stats();
            assert_eq!(after.atk - before.atk, drop.bonus.atk);
            assert_eq!(after.def - before.def, drop.bonus.def);
            assert!(drop.rarity >= Rarity::Common);
            return;
        }
    }
}
