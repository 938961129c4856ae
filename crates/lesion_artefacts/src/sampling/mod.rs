//! Position sampling over a discrete 2D canvas.
//!
//! This module defines the [`PositionSampler`] seam used by the placement engine,
//! the cumulative-distribution sampler [`WeightedPositionSampler`], and the
//! small uniform-draw helpers shared by augmentation and selection.
use rand::RngCore;

pub mod weighted;

pub use weighted::WeightedPositionSampler;

/// Integer `(row, col)` position in canvas coordinates.
///
/// Signed so that patch centers and corners may lie outside the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub row: i64,
    pub col: i64,
}

impl Position {
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// Source of candidate patch centers.
pub trait PositionSampler {
    fn sample(&mut self) -> Position;
}

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f64 {
    // 53 random mantissa bits
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Uniform float in `[low, high)`; returns `low` for an empty range.
#[inline]
pub(crate) fn uniform(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    if high <= low {
        return low;
    }
    low + rand01(rng) * (high - low)
}

/// Uniform integer in the inclusive range `[low, high]`.
#[inline]
pub(crate) fn uniform_int(rng: &mut dyn RngCore, low: i64, high: i64) -> i64 {
    if high <= low {
        return low;
    }
    let span = (high - low + 1) as u64;
    low + (rng.next_u64() % span) as i64
}

/// Uniform index into a collection of `len` items.
#[inline]
pub(crate) fn choose_index(rng: &mut dyn RngCore, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((rng.next_u64() % len as u64) as usize)
}
