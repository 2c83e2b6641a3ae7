//! Integer percentage math for deterministic stat scaling.
//!
//! Every multiplier in the game (rank, class, affinity) is a whole percentage.
//! Scaling multiplies first and divides once at the end, so floors and
//! roundings are exact: `20 × 115%` is `23`, never `22.999…`. Binary
//! floating-point cannot promise that for decimal factors like 1.15.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A multiplier expressed in whole percent (`115` means ×1.15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub u32);

impl Percent {
    /// Identity multiplier.
    pub const HUNDRED: Self = Self(100);

    /// Create a percentage multiplier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw percentage value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Self::HUNDRED
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Apply a chain of percentage multipliers and floor the result.
///
/// `scale_floor(20, &[Percent(115)])` is `23`.
#[must_use]
pub fn scale_floor(value: i32, factors: &[Percent]) -> i32 {
    let (numerator, denominator) = chain(value, factors);
    clamp_i32(numerator.div_euclid(denominator))
}

/// Apply one percentage multiplier and round half up.
///
/// `scale_round_half_up(100, Percent(115))` is `115`;
/// `scale_round_half_up(10, Percent(105))` is `11` (10.5 rounds up).
#[must_use]
pub fn scale_round_half_up(value: i32, factor: Percent) -> i32 {
    let numerator = i64::from(value) * i64::from(factor.0);
    clamp_i32((numerator * 2 + 100).div_euclid(200))
}

/// Floor of `value / 2` for signed values.
#[must_use]
pub const fn half_floor(value: i32) -> i32 {
    value.div_euclid(2)
}

fn chain(value: i32, factors: &[Percent]) -> (i64, i64) {
    factors.iter().fold((i64::from(value), 1i64), |(num, den), f| {
        (num * i64::from(f.0), den * 100)
    })
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_floor_exact_decimal() {
        assert_eq!(scale_floor(20, &[Percent(115)]), 23);
        assert_eq!(scale_floor(15, &[Percent(115)]), 17);
        assert_eq!(scale_floor(40, &[Percent(115)]), 46);
    }

    #[test]
    fn test_scale_floor_chain_divides_once() {
        // 7 × 1.15 × 2.00 = 16.1
        assert_eq!(scale_floor(7, &[Percent(115), Percent(200)]), 16);
        // 10 × 1.50 × 0.80 = 12 exactly
        assert_eq!(scale_floor(10, &[Percent(150), Percent(80)]), 12);
    }

    #[test]
    fn test_scale_floor_no_factors_is_identity() {
        assert_eq!(scale_floor(33, &[]), 33);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(scale_round_half_up(100, Percent(115)), 115);
        assert_eq!(scale_round_half_up(100, Percent(100)), 100);
        assert_eq!(scale_round_half_up(10, Percent(105)), 11);
        assert_eq!(scale_round_half_up(10, Percent(95)), 10);
        assert_eq!(scale_round_half_up(3, Percent(95)), 3);
    }

    #[test]
    fn test_half_floor_negative() {
        assert_eq!(half_floor(7), 3);
        assert_eq!(half_floor(-7), -4);
    }
}
