//! Lesion-mask helpers: attenuation weights, synthetic masks, and centroids.
//!
//! Masks are single-channel 8-bit images where any nonzero pixel is lesion.
use glam::DVec2;
use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

use crate::density::{Density, Region};

/// How blurred mask values are scaled into [0, 1] before inversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
    /// Divide by the full 8-bit range.
    FullRange,
    /// Divide by the brightest blurred pixel.
    Peak,
}

pub fn is_empty(mask: &GrayImage) -> bool {
    mask.as_raw().iter().all(|v| *v == 0)
}

/// Blur `mask` with a Gaussian of `sigma` pixels, scale it into [0, 1], and
/// invert it: lesion cores map to 0, distant pixels to 1.
///
/// Any nonzero pixel counts as lesion regardless of its value. The blur is
/// divided by the blur of an all-lesion canvas, so a pixel deep inside the
/// lesion reaches full coverage even though the kernel is truncated.
///
/// With [`Normalization::Peak`] a mask whose blur is all zero yields all-zero weights.
pub fn lesion_weights(mask: &GrayImage, sigma: f32, normalization: Normalization) -> Density {
    let (w, h) = mask.dimensions();
    let (rows, cols) = (h as usize, w as usize);
    let blurred = gaussian_blur_f32(&binarize(mask), sigma);
    let response = gaussian_blur_f32(&GrayImage::from_pixel(w, h, Luma([u8::MAX])), sigma);

    let coverage: Vec<f64> = blurred
        .as_raw()
        .iter()
        .zip(response.as_raw())
        .map(|(v, full)| match *full {
            0 => 0.0,
            full => (f64::from(*v) / f64::from(full)).min(1.0),
        })
        .collect();

    let scale = match normalization {
        Normalization::FullRange => 1.0,
        Normalization::Peak => coverage.iter().copied().fold(0.0, f64::max),
    };
    let values = if scale > 0.0 {
        coverage
            .iter()
            .map(|c| (1.0 - c / scale).clamp(0.0, 1.0))
            .collect()
    } else {
        vec![0.0; rows * cols]
    };
    Density { rows, cols, values }
}

fn binarize(mask: &GrayImage) -> GrayImage {
    let mut binary = mask.clone();
    for px in binary.pixels_mut() {
        if px[0] != 0 {
            px[0] = u8::MAX;
        }
    }
    binary
}

/// Indicator weights: 1 inside `region`, 0 elsewhere.
pub fn region_weights(rows: usize, cols: usize, region: Region) -> Density {
    Density::uniform(rows, cols).restrict(region)
}

/// Synthetic lesion mask: an ellipse centered on the canvas.
///
/// Coordinates run over `[-2, 2]` along each axis and pixels with radius `< 1`
/// are set, so the ellipse spans half of each canvas extent.
pub fn circular_mask(rows: usize, cols: usize) -> GrayImage {
    let axis = |n: usize| -> Vec<f64> {
        if n <= 1 {
            return vec![-2.0; n];
        }
        let step = 4.0 / (n - 1) as f64;
        (0..n).map(|i| -2.0 + i as f64 * step).collect()
    };
    let ys = axis(rows);
    let xs = axis(cols);

    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let p = DVec2::new(xs[x as usize], ys[y as usize]);
        if p.length() < 1.0 {
            Luma([u8::MAX])
        } else {
            Luma([0])
        }
    })
}

/// Intensity-weighted centroid as `(row, col)`, or `None` for an empty mask.
pub fn center_of_mass(mask: &GrayImage) -> Option<(f64, f64)> {
    let mut total = 0.0f64;
    let mut acc = DVec2::ZERO;
    for (x, y, px) in mask.enumerate_pixels() {
        let weight = f64::from(px[0]);
        if weight > 0.0 {
            total += weight;
            acc += DVec2::new(f64::from(y), f64::from(x)) * weight;
        }
    }
    if total <= 0.0 {
        return None;
    }
    let c = acc / total;
    Some((c.x, c.y))
}
