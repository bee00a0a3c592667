//! Seeded RNG stream for the world.
//!
//! Grounded on `rust_qsim`'s `RandomGenerator` (`src/simulation/random.rs`),
//! which derives per-entity `SmallRng`s from a base seed. Here a single
//! ordered stream is consumed instead, because spec §5 fixes the *order* of
//! draws across a step (node permutations, then DUO tie-breaks) rather than
//! giving every entity an independent stream. Demand generation (spec §4.E)
//! is a deterministic fractional accumulator and draws nothing from this
//! stream.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: SmallRng,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        RandomStream {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Resets the stream to the state it had right after `new(seed)`.
    /// Reseeding with the same seed must reproduce identical orderings.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Returns indices `0..priorities.len()` ordered by decreasing likelihood
    /// of being drawn first, weighted by `priorities` (all must be >= 0).
    /// Uses the efficient weighted-sampling-without-replacement trick: each
    /// candidate gets key `-ln(U)/weight`, ascending key sorts first. A
    /// weight of 0 is sorted last, deterministically, among zero-weights.
    pub fn weighted_order(&mut self, priorities: &[f32]) -> Vec<usize> {
        let mut keyed: Vec<(f64, usize)> = priorities
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let weight = p.max(0.0) as f64;
                let key = if weight > 0.0 {
                    let u: f64 = self.rng.random_range(f64::EPSILON..1.0);
                    -u.ln() / weight
                } else {
                    f64::INFINITY
                };
                (key, i)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        keyed.into_iter().map(|(_, i)| i).collect()
    }

    /// Symmetric additive perturbation in `[-scale, scale]`, used by the DUO
    /// cost-perturbation seam (spec §9 open question).
    pub fn perturb(&mut self, scale: f32) -> f32 {
        if scale <= 0.0 {
            0.0
        } else {
            self.rng.random_range(-scale..=scale)
        }
    }
}
