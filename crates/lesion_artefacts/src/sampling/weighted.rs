//! Sampling positions proportionally to a discrete 2D density.
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::density::Density;
use crate::error::{Error, Result};
use crate::sampling::{rand01, Position, PositionSampler};

/// Draws `(row, col)` positions with probability proportional to a [`Density`].
///
/// The density is flattened row-major into a cumulative distribution normalized
/// so that its last value is 1. A draw picks the first flat index whose
/// cumulative value exceeds a uniform `u` in [0, 1).
#[derive(Clone, Debug)]
pub struct WeightedPositionSampler {
    cols: usize,
    cdf: Vec<f64>,
    rng: StdRng,
}

impl WeightedPositionSampler {
    /// Build a sampler; fails with [`Error::DegenerateDensity`] when the
    /// density has no positive mass.
    pub fn new(density: &Density, seed: u64) -> Result<Self> {
        let mut total = 0.0f64;
        let mut cdf = Vec::with_capacity(density.len());
        for v in density.values() {
            // Non-finite and negative cells never receive mass.
            if v.is_finite() && *v > 0.0 {
                total += *v;
            }
            cdf.push(total);
        }

        if !(total.is_finite() && total > 0.0) {
            return Err(Error::DegenerateDensity);
        }
        for c in cdf.iter_mut() {
            *c /= total;
        }

        Ok(Self {
            cols: density.cols(),
            cdf,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Map a uniform value in [0, 1) to a position.
    fn locate(&self, u: f64) -> Position {
        let index = self
            .cdf
            .partition_point(|c| *c <= u)
            .min(self.cdf.len() - 1);
        let row = index / self.cols;
        let col = index % self.cols;
        Position::new(row as i64, col as i64)
    }
}

impl PositionSampler for WeightedPositionSampler {
    fn sample(&mut self) -> Position {
        let u = rand01(&mut self.rng);
        self.locate(u)
    }
}
