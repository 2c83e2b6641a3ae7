//! Battle benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tactics_core::affinity::{AffinityState, Element};
use tactics_core::choice::{generate_choices, ChoiceConfig};
use tactics_core::combat::{resolve_battle_with, BattleConfig};
use tactics_core::data::OpponentCatalog;
use tactics_core::rng::ForkRng;
use tactics_core::run::{battle_rng, choice_rng};
use tactics_test_utils::fixtures;

/// Full battle resolution against builtin opponents.
pub fn battle_benchmark(c: &mut Criterion) {
    let catalog = OpponentCatalog::builtin();
    let player = fixtures::sample_player_roster();
    let config = BattleConfig::default().with_affinity(AffinityState::aligned(Element::Fire));
    let root = ForkRng::new(12345);

    for id in ["slime_pack", "shadow_cult", "ember_drake"] {
        let Some(spec) = catalog.get(id) else {
            continue;
        };
        let enemy = spec.enemy_roster(0);
        c.bench_function(&format!("resolve_battle/{id}"), |b| {
            b.iter(|| {
                resolve_battle_with(
                    black_box(&player),
                    black_box(&enemy),
                    battle_rng(&root, 0),
                    0,
                    id,
                    &config,
                )
            });
        });
    }
}

/// Choice generation with the default attempt bound.
pub fn choice_benchmark(c: &mut Criterion) {
    let catalog = OpponentCatalog::builtin();
    let root = ForkRng::new(7);
    let config = ChoiceConfig::default();
    c.bench_function("generate_choices", |b| {
        let mut battle = 0u32;
        b.iter(|| {
            battle = battle.wrapping_add(1);
            generate_choices(&choice_rng(&root, battle), battle, black_box(&catalog), None, &config)
        });
    });
}

criterion_group!(benches, battle_benchmark, choice_benchmark);
criterion_main!(benches);
