//! Injectable randomness
//!
//! Every random decision in the simulation (activity rolls, dwell windows,
//! invite acceptance, meeting membership) goes through [`RandomSource`] so
//! tests can script the sequence.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of uniform samples in `[0, 1)`
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    /// Uniform sample in `[lo, hi)`; returns `lo` for an empty range
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform millisecond duration in `[lo, hi]`
    fn duration(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + ((hi - lo) as f64 * self.next_f64()).round() as u64
    }

    /// Uniform index in `0..len`
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((len as f64 * self.next_f64()) as usize).min(len - 1)
    }

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Production source backed by a small fast PRNG
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    /// Deterministic source from a seed
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Scripted source for tests: replays queued samples, then repeats a fallback.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    queued: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    /// Source that always returns `value`
    pub fn constant(value: f64) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: value.clamp(0.0, 0.999_999),
        }
    }

    /// Source that replays `values` and then returns `fallback` forever
    pub fn sequence(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            queued: values.into_iter().collect(),
            fallback: fallback.clamp(0.0, 0.999_999),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        self.queued
            .pop_front()
            .map(|v| v.clamp(0.0, 0.999_999))
            .unwrap_or(self.fallback)
    }
}
