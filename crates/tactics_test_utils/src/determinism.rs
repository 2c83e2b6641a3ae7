//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles, offers and rewards
//! produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Saves only store the run seed and a few counters, so every RNG-derived
//! artifact must regenerate exactly. Sources of non-determinism include:
//!
//! - **Floating-point stat math**: Percent multipliers are applied as
//!   integers via [`tactics_core::math::Percent`].
//!
//! - **HashMap iteration order**: Turn order and targeting iterate units in
//!   roster order with explicit tie-breaks.
//!
//! - **Shared RNG streams**: Every subsystem draws from its own fork, so
//!   draws in one never shift another.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual formulas and tie-breaks
//! 2. **Property tests**: Random rosters still produce deterministic outcomes
//! 3. **Integration tests**: Full runs are reproducible from the seed
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::combat::Battle;
use tactics_core::run::{Run, RunSnapshot};
use tracing::debug;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps taken per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic code).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Non-deterministic result!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run some stateful computation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,  // Run 5 times
///     20, // 20 turns each
///     || fixtures::scenario_battle(12345),
///     |battle| { battle.step_turn(); },
///     |battle| compute_hash(&battle.actions()),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Resolve the same battle twice and compare outcome hashes.
pub fn verify_battle_determinism<F>(setup_fn: F) -> bool
where
    F: Fn() -> Battle,
{
    setup_fn().run().state_hash() == setup_fn().run().state_hash()
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Outcome hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Resolve N copies of a battle on scoped threads.
///
/// Catches non-determinism that only shows up under thread scheduling.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles<F>(setup_fn: F, num_battles: usize) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| s.spawn(|| setup_fn().run().state_hash()))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    ParallelBattleResult {
        hashes,
        num_battles,
    }
}

/// Step two copies of a battle turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if both copies stay identical, `Some(turn)` for the first turn
/// after which their action logs differ.
pub fn find_first_divergence<F>(setup_fn: F, max_turns: u32) -> Option<u32>
where
    F: Fn() -> Battle,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if compute_hash(&a.units()) != compute_hash(&b.units()) {
        return Some(0);
    }

    for turn in 1..=max_turns {
        let done_a = a.step_turn();
        let done_b = b.step_turn();

        if done_a != done_b || compute_hash(&a.actions()) != compute_hash(&b.actions()) {
            debug!(turn, "Battles diverged");
            return Some(turn);
        }
        if done_a.is_some() {
            break;
        }
    }

    None
}

/// Verify that a run snapshot survives a RON round trip unchanged.
///
/// This is what save/resume relies on.
pub fn verify_snapshot_round_trip(run: &Run) -> bool {
    let snapshot = run.snapshot();
    let Ok(text) = snapshot.to_ron() else {
        return false;
    };
    match RunSnapshot::from_ron_str("round-trip", &text) {
        Ok(restored) => restored == snapshot,
        Err(_) => false,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible rosters and stat
/// blocks for property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::affinity::Element;
    use tactics_core::data::{Role, UnitTemplate};
    use tactics_core::roster::{RosterUnit, UnitId};
    use tactics_core::stats::{BaseStats, EquipmentDelta, Rank, Subclass};

    /// Generate any element.
    pub fn arb_element() -> impl Strategy<Value = Element> {
        prop::sample::select(Element::ALL.to_vec())
    }

    /// Generate any rank.
    pub fn arb_rank() -> impl Strategy<Value = Rank> {
        prop_oneof![Just(Rank::C), Just(Rank::B), Just(Rank::A), Just(Rank::S)]
    }

    /// Generate any role.
    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Tank),
            Just(Role::Striker),
            Just(Role::Caster),
            Just(Role::Support),
            Just(Role::Skirmisher),
        ]
    }

    /// Generate an optional subclass.
    pub fn arb_subclass() -> impl Strategy<Value = Option<Subclass>> {
        proptest::option::of(prop_oneof![
            Just(Subclass::Vanguard),
            Just(Subclass::Berserker),
            Just(Subclass::Sentinel),
            Just(Subclass::Skirmisher),
            Just(Subclass::Mystic),
        ])
    }

    /// Generate base stats in a playable range.
    ///
    /// HP 1-200, atk 0-60, def 0-60, speed 1-100, MP 0-40
    pub fn arb_base_stats() -> impl Strategy<Value = BaseStats> {
        (1i32..200, 0i32..60, 0i32..60, 1i32..100, 0i32..40)
            .prop_map(|(hp, atk, def, speed, mp)| BaseStats::new(hp, atk, def, speed, mp))
    }

    /// Generate a piece of gear with small bonuses.
    pub fn arb_equipment_delta() -> impl Strategy<Value = EquipmentDelta> {
        (0i32..20, 0i32..10, 0i32..10, 0i32..10, 0i32..10).prop_map(
            |(hp, atk, def, speed, mp)| EquipmentDelta {
                hp,
                atk,
                def,
                speed,
                mp,
            },
        )
    }

    /// Generate a unit template.
    pub fn arb_template() -> impl Strategy<Value = UnitTemplate> {
        (
            arb_element(),
            arb_role(),
            arb_rank(),
            arb_subclass(),
            arb_base_stats(),
            proptest::collection::vec(arb_equipment_delta(), 0..3),
        )
            .prop_map(|(element, role, rank, subclass, stats, equipment)| {
                let mut template =
                    UnitTemplate::new("generated", "Generated", element, role, stats)
                        .with_rank(rank);
                template.subclass = subclass;
                template.equipment = equipment;
                template
            })
    }

    /// Generate a player roster of up to `max_units` units.
    pub fn arb_player_roster(max_units: usize) -> impl Strategy<Value = Vec<RosterUnit>> {
        proptest::collection::vec(arb_template(), 0..=max_units).prop_map(|templates| {
            templates
                .iter()
                .enumerate()
                .map(|(n, t)| RosterUnit::from_template(t, UnitId::recruit(n as u32)))
                .collect()
        })
    }

    /// Generate an enemy roster of up to `max_units` units.
    pub fn arb_enemy_roster(max_units: usize) -> impl Strategy<Value = Vec<RosterUnit>> {
        proptest::collection::vec(arb_template(), 0..=max_units).prop_map(|templates| {
            templates
                .iter()
                .enumerate()
                .map(|(slot, t)| RosterUnit::from_template(t, UnitId::enemy("generated", 0, slot)))
                .collect()
        })
    }
}
