//! Activation curves and the shared random source.
//!
//! Every probabilistic decision in a resolution (ability activation, double
//! drops, treasure selection, ranged bonus amounts) draws from one
//! [`ChanceModel`]. Seeding it makes a whole run reproducible.
//!
//! # Curve shape
//!
//! A [`ChanceCurve`] interpolates linearly from `base_chance` at level 1 to
//! `max_chance` at `max_level`. Levels are clamped into `[1, max_level]` first,
//! so the probability is flat below level 1 and above `max_level`.
//!
//! ```
//! use harvest_core::chance::ChanceCurve;
//!
//! let curve = ChanceCurve::new(0.0, 1.0, 101);
//! assert_eq!(curve.probability(1), 0.0);
//! assert!((curve.probability(51) - 0.5).abs() < 1e-9);
//! assert_eq!(curve.probability(500), 1.0);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Linear activation curve keyed by skill level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChanceCurve {
    /// Probability at level 1.
    pub base_chance: f64,
    /// Probability at `max_level` and above.
    pub max_chance: f64,
    /// Level at which the curve saturates.
    pub max_level: i32,
}

impl ChanceCurve {
    /// Creates a curve.
    #[must_use]
    pub const fn new(base_chance: f64, max_chance: f64, max_level: i32) -> Self {
        Self {
            base_chance,
            max_chance,
            max_level,
        }
    }

    /// A curve that always activates.
    #[must_use]
    pub const fn always() -> Self {
        Self::new(1.0, 1.0, 1)
    }

    /// A curve that never activates.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(0.0, 0.0, 1)
    }

    /// Activation probability at `level`, in `[0, 1]`.
    ///
    /// Negative levels count as level 1. A `max_level` of 1 or less
    /// yields `max_chance` for every level.
    #[must_use]
    pub fn probability(&self, level: i64) -> f64 {
        if self.max_level <= 1 {
            return self.max_chance.clamp(0.0, 1.0);
        }

        let max_level = i64::from(self.max_level);
        let level = level.clamp(1, max_level);

        // Both values are bounded by i32::MAX, well inside f64's exact range.
        #[allow(clippy::cast_precision_loss)]
        let progress = (level - 1) as f64 / (max_level - 1) as f64;

        let probability = self.base_chance + (self.max_chance - self.base_chance) * progress;
        probability.clamp(0.0, 1.0)
    }

    /// Whether both chances are finite, inside `[0, 1]`, and non-decreasing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let in_unit = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        in_unit(self.base_chance) && in_unit(self.max_chance) && self.base_chance <= self.max_chance
    }
}

/// Outcome of a single activation draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activation {
    /// Probability the draw was compared against.
    pub probability: f64,
    /// Whether the draw landed under the probability.
    pub success: bool,
}

/// The single shared random source for resolutions.
///
/// Wraps a `ChaCha8Rng` so identical seeds produce identical streams on every
/// platform.
#[derive(Debug, Clone)]
pub struct ChanceModel {
    rng: ChaCha8Rng,
    seed: Option<u64>,
}

impl ChanceModel {
    /// Creates a deterministic model from a seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Creates a model seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            seed: None,
        }
    }

    /// The seed this model was created with, if any.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Evaluates `curve` at `level` and draws exactly once against it.
    pub fn activation(&mut self, level: i64, curve: &ChanceCurve) -> Activation {
        let probability = curve.probability(level);
        let roll: f64 = self.rng.gen();
        let success = roll < probability;
        trace!(level, probability, roll, success, "activation roll");
        Activation {
            probability,
            success,
        }
    }

    /// Uniform index into a collection of `len` elements; `None` when empty.
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }

    /// Uniform value in `low..=high`. Returns `low` when `high < low`.
    pub fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            low
        } else {
            self.rng.gen_range(low..=high)
        }
    }
}
