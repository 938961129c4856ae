use std::time::Duration;

use criterion::{Criterion, Throughput};
use image::{GrayImage, Luma};

/// Criterion settings shared by the image benches.
pub fn image_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(15)
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3))
        .noise_threshold(0.03)
}

/// Throughput in pixels for a square of `side` pixels.
pub fn pixel_throughput(side: usize) -> Throughput {
    Throughput::Elements((side * side).max(1) as u64)
}

/// Square lesion occupying the middle third of the canvas.
pub fn centered_lesion(side: u32) -> GrayImage {
    let (lo, hi) = (side / 3, side * 2 / 3);
    GrayImage::from_fn(side, side, |x, y| {
        if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
