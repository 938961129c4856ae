//! Cache for base placement densities.
//!
//! Building the beta density is the only per-canvas cost that does not depend on
//! the mask, so each artefact instance keeps the last one it built and rebuilds
//! it only when the canvas shape or the density parameters change.
use tracing::debug;

use crate::density::{Density, DensityParams};

struct DensityEntry {
    shape: (usize, usize),
    params: DensityParams,
    density: Density,
}

/// Single-entry cache keyed by canvas shape and [`DensityParams`].
#[derive(Default)]
pub struct DensityCache {
    entry: Option<DensityEntry>,
}

impl DensityCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// Shape of the cached density, if any.
    pub fn cached_shape(&self) -> Option<(usize, usize)> {
        self.entry.as_ref().map(|e| e.shape)
    }

    /// Drops the cached density.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Gets the density for a `rows x cols` canvas, building it if necessary.
    pub fn get_or_build(&mut self, rows: usize, cols: usize, params: &DensityParams) -> &Density {
        let stale = match &self.entry {
            Some(entry) => entry.shape != (rows, cols) || entry.params != *params,
            None => true,
        };

        if stale {
            self.entry = None;
        }

        let entry = self.entry.get_or_insert_with(|| {
            debug!("Building {}x{} placement density.", rows, cols);
            DensityEntry {
                shape: (rows, cols),
                params: *params,
                density: Density::beta(rows, cols, params),
            }
        });
        &entry.density
    }
}
