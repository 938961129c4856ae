//! Spatial placement densities over canvas coordinates.
//!
//! The base density is the outer product of two 1D beta densities evaluated on
//! `[0, 1]` grids along rows and columns, which favours the canvas interior.
//! Lesion masks attenuate it through [`mask::lesion_weights`]; see
//! [`cache::DensityCache`] for reuse across calls on equally sized canvases.
use statrs::function::gamma::gamma;

use crate::error::{Error, Result};

pub mod cache;
pub mod mask;

pub use cache::DensityCache;

/// Shape parameters of the beta density and the lesion-mask blur.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DensityParams {
    /// Beta shape parameter `a`.
    pub alpha: f64,
    /// Beta shape parameter `b`.
    pub beta: f64,
    /// Gaussian sigma, in pixels, of the halo blurred around the lesion mask.
    pub mask_sigma: f32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            alpha: 1.5,
            beta: 1.5,
            mask_sigma: 15.0,
        }
    }
}

impl DensityParams {
    pub fn with_shape(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_mask_sigma(mut self, sigma: f32) -> Self {
        self.mask_sigma = sigma;
        self
    }

    /// Validates the parameters, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::InvalidConfig("beta alpha must be > 0".into()));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(Error::InvalidConfig("beta beta must be > 0".into()));
        }
        if !(self.mask_sigma.is_finite() && self.mask_sigma > 0.0) {
            return Err(Error::InvalidConfig("mask_sigma must be > 0".into()));
        }
        Ok(())
    }
}

/// Axis-aligned half-open region `[row_start, row_end) x [col_start, col_end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Region {
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..self.row_end).contains(&row) && (self.col_start..self.col_end).contains(&col)
    }

    /// Lower third of the rows, middle third of the columns.
    pub fn lower_middle(rows: usize, cols: usize) -> Self {
        Self {
            row_start: rows * 2 / 3,
            row_end: rows,
            col_start: cols / 3,
            col_end: cols * 2 / 3,
        }
    }
}

/// Non-negative relative likelihood for every canvas cell, row-major.
///
/// Non-finite and negative values are stored as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Density {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

#[inline]
fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Evaluate the beta density on `n` evenly spaced points spanning [0, 1].
fn beta_profile(n: usize, a: f64, b: f64) -> Vec<f64> {
    let norm = gamma(a) * gamma(b) / gamma(a + b);
    let step = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    (0..n)
        .map(|i| {
            let x = i as f64 * step;
            x.powf(a - 1.0) * (1.0 - x).powf(b - 1.0) / norm
        })
        .collect()
}

impl Density {
    /// Outer product of beta densities along both axes.
    pub fn beta(rows: usize, cols: usize, params: &DensityParams) -> Self {
        let along_rows = beta_profile(rows, params.alpha, params.beta);
        let along_cols = beta_profile(cols, params.alpha, params.beta);

        let mut values = Vec::with_capacity(rows * cols);
        for r in &along_rows {
            values.extend(along_cols.iter().map(|c| sanitize(r * c)));
        }
        Self { rows, cols, values }
    }

    pub fn uniform(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![1.0; rows * cols],
        }
    }

    /// Wrap raw values, coercing non-finite and negative entries to zero.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                expected: (rows, cols, 1),
                actual: (values.len(), 1, 1),
            });
        }
        Ok(Self {
            rows,
            cols,
            values: values.into_iter().map(sanitize).collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.rows || col >= self.cols {
            return 0.0;
        }
        self.values[row * self.cols + col]
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn has_mass(&self) -> bool {
        let total = self.total();
        total.is_finite() && total > 0.0
    }

    /// Elementwise product with a weight map of the same shape.
    pub fn attenuate(&self, weights: &Density) -> Result<Density> {
        if weights.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: (self.rows, self.cols, 1),
                actual: (weights.rows, weights.cols, 1),
            });
        }
        Ok(Density {
            rows: self.rows,
            cols: self.cols,
            values: self
                .values
                .iter()
                .zip(&weights.values)
                .map(|(v, w)| sanitize(v * w))
                .collect(),
        })
    }

    /// Zero every cell outside `region`.
    pub fn restrict(&self, region: Region) -> Density {
        let mut values = self.values.clone();
        for r in 0..self.rows {
            for c in 0..self.cols {
                if !region.contains(r, c) {
                    values[r * self.cols + c] = 0.0;
                }
            }
        }
        Density {
            rows: self.rows,
            cols: self.cols,
            values,
        }
    }
}
