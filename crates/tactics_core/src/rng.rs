//! Hierarchical deterministic random number generation.
//!
//! Every random decision in the core draws from a [`ForkRng`]. A run owns a
//! single root handle built from the run seed; each subsystem receives its own
//! handle derived by [`ForkRng::fork`] with a stable label path such as
//! `root/battle/3` or `root/rewards/3`.
//!
//! # Determinism
//!
//! - A fork is a pure function of the parent's derived key and the label. It
//!   does not depend on how many values the parent has already drawn, so
//!   drawing from a parent never perturbs its children.
//! - Forking the same parent with the same label twice yields two handles with
//!   identical output sequences.
//! - Labels are hashed with FNV-1a, never with the randomized std hasher.
//!
//! Persistence never stores generator state: `(run_seed, label path)` is
//! enough to rebuild any handle.

use std::fmt;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// Golden-ratio increment used by SplitMix64.
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// A single segment of a fork path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkLabel {
    /// Named subsystem or phase (`"battle"`, `"rewards"`, `"choice"`).
    Name(String),
    /// Numeric segment (battle index, attempt number, roster slot).
    Index(u64),
}

impl ForkLabel {
    /// Stable 64-bit key for this label.
    ///
    /// Names and indices are tagged differently so `"3"` and `3` never collide.
    #[must_use]
    pub fn stable_hash(&self) -> u64 {
        match self {
            ForkLabel::Name(name) => fnv1a(0x4E, name.as_bytes()),
            ForkLabel::Index(index) => fnv1a(0x49, &index.to_le_bytes()),
        }
    }
}

impl From<&str> for ForkLabel {
    fn from(value: &str) -> Self {
        ForkLabel::Name(value.to_string())
    }
}

impl From<String> for ForkLabel {
    fn from(value: String) -> Self {
        ForkLabel::Name(value)
    }
}

impl From<u64> for ForkLabel {
    fn from(value: u64) -> Self {
        ForkLabel::Index(value)
    }
}

impl From<u32> for ForkLabel {
    fn from(value: u32) -> Self {
        ForkLabel::Index(u64::from(value))
    }
}

impl From<usize> for ForkLabel {
    fn from(value: usize) -> Self {
        ForkLabel::Index(value as u64)
    }
}

impl fmt::Display for ForkLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkLabel::Name(name) => f.write_str(name),
            ForkLabel::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Deterministic random stream with reproducible hierarchical forking.
///
/// Drawing requires `&mut self`; forking only borrows, so a parent handle can
/// keep being used after it has been forked.
#[derive(Debug, Clone)]
pub struct ForkRng {
    key: u64,
    path: Vec<ForkLabel>,
    inner: Pcg64Mcg,
}

impl ForkRng {
    /// Create the root handle for a run seed.
    ///
    /// Every `u64` is a valid seed, `0` included.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::from_key(mix64(seed.wrapping_add(GOLDEN_GAMMA)), Vec::new())
    }

    fn from_key(key: u64, path: Vec<ForkLabel>) -> Self {
        Self {
            key,
            path,
            inner: Pcg64Mcg::seed_from_u64(key),
        }
    }

    /// Derive an independent child stream.
    #[must_use]
    pub fn fork(&self, label: impl Into<ForkLabel>) -> Self {
        let label = label.into();
        let child_key = mix64(self.key ^ label.stable_hash().wrapping_mul(GOLDEN_GAMMA));
        let mut path = self.path.clone();
        path.push(label);
        Self::from_key(child_key, path)
    }

    /// Derived key identifying this stream.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Labels from the root to this handle.
    #[must_use]
    pub fn path(&self) -> &[ForkLabel] {
        &self.path
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Uniform float in `[0, 1)` built from the top 53 bits.
    pub fn next_float(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[lo, hi]` inclusive.
    ///
    /// Returns `lo` when the range is empty or inverted. Still consumes one
    /// draw in that case so the stream position does not depend on the bounds.
    pub fn next_int(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            self.next_u64();
            return lo;
        }
        let span = hi.wrapping_sub(lo) as u64;
        if span == u64::MAX {
            return self.next_u64() as i64;
        }
        lo.wrapping_add(self.below(span + 1) as i64)
    }

    /// Bernoulli trial that succeeds with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_float() < p
    }

    /// Pick one element uniformly, `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.below(items.len() as u64) as usize;
        items.get(index)
    }

    /// Pick `k` distinct indices from `0..len` in draw order.
    ///
    /// Partial Fisher-Yates shuffle; `k` is clamped to `len`.
    pub fn sample_distinct(&mut self, len: usize, k: usize) -> Vec<usize> {
        let k = k.min(len);
        let mut indices: Vec<usize> = (0..len).collect();
        for i in 0..k {
            let j = i + self.below((len - i) as u64) as usize;
            indices.swap(i, j);
        }
        indices.truncate(k);
        indices
    }

    /// Uniform value in `[0, n)` using rejection sampling.
    fn below(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0);
        if n.is_power_of_two() {
            return self.next_u64() & (n - 1);
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % n;
            }
        }
    }
}

impl fmt::Display for ForkRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for label in &self.path {
            write!(f, "/{label}")?;
        }
        Ok(())
    }
}

/// SplitMix64 finalizer.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Hash of a value's bincode encoding, stable across toolchains.
///
/// Values that fail to encode hash to the FNV offset basis.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    match bincode::serialize(value) {
        Ok(bytes) => fnv1a(0x43, &bytes),
        Err(_) => FNV_OFFSET,
    }
}

pub(crate) fn fnv1a(tag: u8, bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in std::iter::once(&tag).chain(bytes) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
