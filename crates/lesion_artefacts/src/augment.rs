//! Random selection and geometric augmentation of artefact patches.
//!
//! Each call picks a working set from the catalog patches ([`AugmentPolicy`]) and
//! then flips, rescales, and rotates every member independently
//! ([`TransformPolicy`]). All randomness comes from the caller's RNG.
use glam::{Mat2, Vec2};
use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use rand::RngCore;

use crate::error::{Error, Result};
use crate::patch::ArtefactPatch;
use crate::raster::Raster;
use crate::sampling::{rand01, uniform, uniform_int};

/// Controls which catalog patches end up in a call's working set.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AugmentPolicy {
    /// Probability of appending a copy of each selected patch.
    pub replicate_prob: f64,
    /// Probability of leaving a catalog patch out.
    pub remove_prob: f64,
}

impl Default for AugmentPolicy {
    fn default() -> Self {
        Self {
            replicate_prob: 0.5,
            remove_prob: 0.5,
        }
    }
}

impl AugmentPolicy {
    pub const fn new(replicate_prob: f64, remove_prob: f64) -> Self {
        Self {
            replicate_prob,
            remove_prob,
        }
    }

    /// Every catalog patch exactly once.
    pub const fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn validate(&self) -> Result<()> {
        check_probability("replicate_prob", self.replicate_prob)?;
        check_probability("remove_prob", self.remove_prob)
    }
}

/// Controls the random geometric transforms applied to each selected patch.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformPolicy {
    pub flip_prob: f64,
    pub resize_prob: f64,
    /// Inclusive `(min, max)` scale factor applied to both axes.
    pub resize_range: (f64, f64),
    pub rotate_prob: f64,
    /// `(min, max)` rotation in degrees, counter-clockwise.
    pub rotate_range: (f64, f64),
    /// Draw whole degrees (inclusive bounds) instead of a continuous angle.
    pub integer_angles: bool,
}

impl Default for TransformPolicy {
    fn default() -> Self {
        Self {
            flip_prob: 0.5,
            resize_prob: 0.5,
            resize_range: (0.5, 1.5),
            rotate_prob: 0.5,
            rotate_range: (0.0, 359.0),
            integer_angles: true,
        }
    }
}

impl TransformPolicy {
    /// No flip, resize, or rotation.
    pub fn disabled() -> Self {
        Self {
            flip_prob: 0.0,
            resize_prob: 0.0,
            rotate_prob: 0.0,
            ..Self::default()
        }
    }

    pub fn with_flip(mut self, prob: f64) -> Self {
        self.flip_prob = prob;
        self
    }

    pub fn with_resize(mut self, prob: f64, range: (f64, f64)) -> Self {
        self.resize_prob = prob;
        self.resize_range = range;
        self
    }

    pub fn with_rotate(mut self, prob: f64, range: (f64, f64)) -> Self {
        self.rotate_prob = prob;
        self.rotate_range = range;
        self
    }

    pub fn with_integer_angles(mut self, integer_angles: bool) -> Self {
        self.integer_angles = integer_angles;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_probability("flip_prob", self.flip_prob)?;
        check_probability("resize_prob", self.resize_prob)?;
        check_probability("rotate_prob", self.rotate_prob)?;

        let (lo, hi) = self.resize_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(Error::InvalidConfig(format!(
                "resize_range must satisfy 0 < min <= max, got ({lo}, {hi})"
            )));
        }
        let (lo, hi) = self.rotate_range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(Error::InvalidConfig(format!(
                "rotate_range must satisfy min <= max, got ({lo}, {hi})"
            )));
        }
        if self.integer_angles && lo.ceil() > hi.floor() {
            return Err(Error::InvalidConfig(format!(
                "rotate_range ({lo}, {hi}) contains no whole degree"
            )));
        }
        Ok(())
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Pick the working set for one call.
///
/// Each patch survives with probability `1 - remove_prob`; if none survive the
/// first patch is used. Every survivor is then copied with `replicate_prob`.
pub fn select_patches(
    patches: &[ArtefactPatch],
    policy: &AugmentPolicy,
    rng: &mut dyn RngCore,
) -> Vec<ArtefactPatch> {
    let mut selected: Vec<ArtefactPatch> = patches
        .iter()
        .filter(|_| rand01(rng) >= policy.remove_prob)
        .cloned()
        .collect();
    if selected.is_empty() {
        if let Some(first) = patches.first() {
            selected.push(first.clone());
        }
    }

    let copies: Vec<ArtefactPatch> = selected
        .iter()
        .filter(|_| rand01(rng) < policy.replicate_prob)
        .cloned()
        .collect();
    selected.extend(copies);
    selected
}

/// Apply a random flip, resize, and rotation to `patch`, each with its own probability.
pub fn transform_patch(
    patch: &ArtefactPatch,
    policy: &TransformPolicy,
    rng: &mut dyn RngCore,
) -> ArtefactPatch {
    let mut out = patch.clone();

    if rand01(rng) < policy.flip_prob {
        let axis = if rand01(rng) > 0.5 { 1 } else { 0 };
        out = flip(&out, axis);
    }

    if rand01(rng) < policy.resize_prob {
        let factor = uniform(rng, policy.resize_range.0, policy.resize_range.1);
        out = resize(&out, factor);
    }

    if rand01(rng) < policy.rotate_prob {
        let (lo, hi) = policy.rotate_range;
        let degrees = if policy.integer_angles {
            uniform_int(rng, lo.ceil() as i64, hi.floor() as i64) as f64
        } else {
            uniform(rng, lo, hi)
        };
        out = rotate(&out, degrees);
    }

    out
}

/// [`select_patches`] followed by [`transform_patch`] on every member.
pub fn random_variants(
    patches: &[ArtefactPatch],
    augment: &AugmentPolicy,
    transform: &TransformPolicy,
    rng: &mut dyn RngCore,
) -> Vec<ArtefactPatch> {
    select_patches(patches, augment, rng)
        .iter()
        .map(|p| transform_patch(p, transform, rng))
        .collect()
}

pub fn flip(patch: &ArtefactPatch, axis: usize) -> ArtefactPatch {
    rebuild(patch.delta().flipped(axis))
}

/// Scale both axes by `factor` with an anti-aliasing filter.
pub fn resize(patch: &ArtefactPatch, factor: f64) -> ArtefactPatch {
    let rows = ((patch.rows() as f64 * factor).floor() as u32).max(1);
    let cols = ((patch.cols() as f64 * factor).floor() as u32).max(1);
    if patch.rows() == 0 || patch.cols() == 0 {
        return patch.clone();
    }

    let (encoded, scale) = encode(patch);
    let resized = imageops::resize(&encoded, cols, rows, FilterType::Triangle);
    decode(&resized, scale)
}

/// Rotate counter-clockwise by `degrees`, growing the canvas to fit the
/// rotated patch. Uncovered pixels carry a zero delta.
pub fn rotate(patch: &ArtefactPatch, degrees: f64) -> ArtefactPatch {
    if patch.rows() == 0 || patch.cols() == 0 || degrees.rem_euclid(360.0) == 0.0 {
        return patch.clone();
    }

    // Image rows grow downwards, so a visual counter-clockwise turn is a negative angle.
    let theta = -(degrees.to_radians() as f32);
    let (w, h) = (patch.cols() as f32, patch.rows() as f32);
    let (out_w, out_h) = rotated_extent(w, h, theta);

    let (encoded, scale) = encode(patch);
    let zero = Rgb([0.5f32; 3]);
    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(theta)
        * Projection::translate(-w / 2.0, -h / 2.0);
    let mut out = Rgb32FImage::from_pixel(out_w, out_h, zero);
    warp_into(&encoded, &projection, Interpolation::Bilinear, zero, &mut out);
    decode(&out, scale)
}

/// Width and height of the axis-aligned box around a `w x h` rectangle rotated by `theta`.
fn rotated_extent(w: f32, h: f32, theta: f32) -> (u32, u32) {
    let m = Mat2::from_angle(theta);
    let half = Vec2::new(w / 2.0, h / 2.0);
    let corners = [
        m * half,
        m * Vec2::new(-half.x, half.y),
        m * Vec2::new(half.x, -half.y),
        m * -half,
    ];
    let max = corners.iter().fold(Vec2::ZERO, |acc, c| acc.max(c.abs()));
    // Shave float noise so that right angles keep exact extents.
    let size = (max * 2.0 - Vec2::splat(1e-3)).ceil().max(Vec2::ONE);
    (size.x as u32, size.y as u32)
}

/// Map deltas into [0, 1] so that image filters, which clamp float samples to
/// that range, keep signed values. A zero delta encodes to 0.5.
fn encode(patch: &ArtefactPatch) -> (Rgb32FImage, f32) {
    let scale = f32::from(patch.magnitude().max(1));
    let data = patch
        .delta()
        .data()
        .iter()
        .map(|v| (f32::from(*v) + scale) / (2.0 * scale))
        .collect();
    let image = Rgb32FImage::from_raw(patch.cols() as u32, patch.rows() as u32, data)
        .unwrap_or_else(|| Rgb32FImage::new(0, 0));
    (image, scale)
}

fn decode(image: &Rgb32FImage, scale: f32) -> ArtefactPatch {
    let (w, h) = image.dimensions();
    let mut delta = Raster::new(h as usize, w as usize, 3);
    for (dst, src) in delta.data_mut().iter_mut().zip(image.as_raw()) {
        *dst = (src * 2.0 * scale - scale).round() as i16;
    }
    rebuild(delta)
}

fn rebuild(delta: Raster<i16>) -> ArtefactPatch {
    ArtefactPatch::from_rgb_delta(delta)
}
