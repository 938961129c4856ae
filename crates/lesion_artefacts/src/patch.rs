//! Artefact patches: signed RGB deltas that are added onto target images.
use image::RgbImage;

use crate::error::{Error, Result};
use crate::raster::Raster;

/// The visual contribution of one artefact, stored as `with - without` per channel.
///
/// Patches are immutable; augmentation always produces new patches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtefactPatch {
    delta: Raster<i16>,
}

impl ArtefactPatch {
    /// Wrap a three-channel delta raster.
    pub fn from_delta(delta: Raster<i16>) -> Result<Self> {
        if delta.channels() != 3 {
            return Err(Error::ShapeMismatch {
                expected: (delta.rows(), delta.cols(), 3),
                actual: delta.shape(),
            });
        }
        Ok(Self { delta })
    }

    pub(crate) fn from_rgb_delta(delta: Raster<i16>) -> Self {
        debug_assert_eq!(delta.channels(), 3);
        Self { delta }
    }

    /// Delta between an image showing the artefact and the same scene without it.
    pub fn from_difference(with: &RgbImage, without: &RgbImage) -> Result<Self> {
        if with.dimensions() != without.dimensions() {
            let (ww, wh) = with.dimensions();
            let (ow, oh) = without.dimensions();
            return Err(Error::ShapeMismatch {
                expected: (wh as usize, ww as usize, 3),
                actual: (oh as usize, ow as usize, 3),
            });
        }
        let (w, h) = with.dimensions();
        let data = with
            .as_raw()
            .iter()
            .zip(without.as_raw())
            .map(|(a, b)| i16::from(*a) - i16::from(*b))
            .collect();
        Ok(Self {
            delta: Raster::from_raw(h as usize, w as usize, 3, data)?,
        })
    }

    /// Delta between an artefact photographed on white and a plain white background.
    pub fn from_white_background(image: &RgbImage) -> Self {
        let mut delta: Raster<i16> = Raster::from_rgb(image.clone()).convert();
        for v in delta.data_mut() {
            *v -= i16::from(u8::MAX);
        }
        Self { delta }
    }

    pub fn delta(&self) -> &Raster<i16> {
        &self.delta
    }

    pub fn rows(&self) -> usize {
        self.delta.rows()
    }

    pub fn cols(&self) -> usize {
        self.delta.cols()
    }

    /// Largest absolute delta over all channels.
    pub fn magnitude(&self) -> i16 {
        self.delta
            .data()
            .iter()
            .map(|v| v.saturating_abs())
            .max()
            .unwrap_or(0)
    }
}
