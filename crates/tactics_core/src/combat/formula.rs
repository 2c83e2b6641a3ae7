//! Damage and heal formulas.
//!
//! All formulas are integer-only. Variance is drawn by the caller so the
//! order of RNG draws stays visible in the resolver.

use crate::math::{half_floor, scale_round_half_up, Percent};

/// Attacks always deal at least 1 damage.
pub const MIN_DAMAGE: i32 = 1;

/// Heals always restore at least 1 HP.
pub const MIN_HEAL: i32 = 1;

/// Variance bounds for attacks and damaging abilities.
pub const DAMAGE_VARIANCE: (i64, i64) = (-2, 2);

/// Variance bounds for heals.
pub const HEAL_VARIANCE: (i64, i64) = (-1, 1);

/// Basic attack damage.
///
/// ```text
/// raw    = floor(atk - def / 2) + variance
/// damage = max(1, round_half_up(raw × affinity))
/// ```
#[must_use]
pub fn basic_damage(atk: i32, def: i32, variance: i32, affinity: Percent) -> i32 {
    let raw = half_floor(atk.saturating_mul(2).saturating_sub(def)).saturating_add(variance);
    scale_round_half_up(raw, affinity).max(MIN_DAMAGE)
}

/// Damage of an offensive ability.
///
/// ```text
/// raw    = power + floor(atk × 0.5) + variance
/// damage = max(1, round_half_up(raw × affinity))
/// ```
#[must_use]
pub fn ability_damage(power: i32, caster_atk: i32, variance: i32, affinity: Percent) -> i32 {
    let raw = power
        .saturating_add(half_floor(caster_atk))
        .saturating_add(variance);
    scale_round_half_up(raw, affinity).max(MIN_DAMAGE)
}

/// Amount restored by a heal before clamping to the target's missing HP.
///
/// ```text
/// amount = max(1, round_half_up(max(1, power + variance) × affinity))
/// ```
#[must_use]
pub fn heal_amount(power: i32, variance: i32, affinity: Percent) -> i32 {
    let raw = power.saturating_add(variance).max(MIN_HEAL);
    scale_round_half_up(raw, affinity).max(MIN_HEAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_damage_formula() {
        // floor(20 - 15 / 2) = floor(12.5) = 12
        assert_eq!(basic_damage(20, 15, 0, Percent::HUNDRED), 12);
        assert_eq!(basic_damage(20, 15, 2, Percent::HUNDRED), 14);
        assert_eq!(basic_damage(20, 15, -2, Percent::HUNDRED), 10);
    }

    #[test]
    fn test_basic_damage_floor_is_one() {
        assert_eq!(basic_damage(1, 100, -2, Percent::HUNDRED), MIN_DAMAGE);
        assert_eq!(basic_damage(0, 0, -2, Percent(95)), MIN_DAMAGE);
    }

    #[test]
    fn test_affinity_scales_damage() {
        // raw 20, ×1.15 = 23
        assert_eq!(basic_damage(24, 8, 0, Percent(115)), 23);
    }

    #[test]
    fn test_ability_damage_formula() {
        // 8 + floor(15 / 2) + 1 = 16
        assert_eq!(ability_damage(8, 15, 1, Percent::HUNDRED), 16);
    }

    #[test]
    fn test_heal_floor() {
        assert_eq!(heal_amount(0, -1, Percent::HUNDRED), MIN_HEAL);
        assert_eq!(heal_amount(10, 1, Percent::HUNDRED), 11);
        assert_eq!(heal_amount(10, 0, Percent(115)), 12);
    }
}
