//! Synthetic inputs for the demos: a skin-toned image with a dark lesion and
//! hand-drawn artefact patches for every catalog tag.
use std::path::Path;

use anyhow::Context;
use image::{GrayImage, Luma, Rgb, RgbImage};
use lesion_artefacts::prelude::*;

/// Install a formatting subscriber. Respects `RUST_LOG`, defaults to `info`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Skin background with an elliptical lesion, and the matching lesion mask.
pub fn synthetic_scene(width: u32, height: u32) -> (RgbImage, GrayImage) {
    let (cx, cy) = (width as f32 * 0.45, height as f32 * 0.5);
    let (rx, ry) = (width as f32 * 0.18, height as f32 * 0.14);
    let inside = |x: u32, y: u32| {
        let dx = (x as f32 - cx) / rx;
        let dy = (y as f32 - cy) / ry;
        dx * dx + dy * dy < 1.0
    };

    let image = RgbImage::from_fn(width, height, |x, y| {
        if inside(x, y) {
            Rgb([96, 58, 44])
        } else {
            let shade = ((x + y) % 7) as u8;
            Rgb([214 - shade, 168 - shade, 150 - shade])
        }
    });
    let mask = GrayImage::from_fn(width, height, |x, y| {
        if inside(x, y) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    (image, mask)
}

fn patch_from_fn(
    rows: usize,
    cols: usize,
    f: impl Fn(f32, f32) -> [i16; 3],
) -> anyhow::Result<ArtefactPatch> {
    let mut delta = Raster::new(rows, cols, 3);
    let (cr, cc) = (rows as f32 / 2.0, cols as f32 / 2.0);
    for r in 0..rows {
        for c in 0..cols {
            delta
                .pixel_mut(r, c)
                .copy_from_slice(&f(r as f32 - cr, c as f32 - cc));
        }
    }
    Ok(ArtefactPatch::from_delta(delta)?)
}

/// Hand-drawn patches for one catalog tag.
pub fn synthetic_patches(kind: ArtefactKind) -> anyhow::Result<Vec<ArtefactPatch>> {
    let patches: Vec<ArtefactPatch> = match kind {
        ArtefactKind::Bubble => [14.0f32, 22.0, 9.0]
            .iter()
            .map(|&radius| {
                let size = (radius * 2.0) as usize + 2;
                patch_from_fn(size, size, move |dr, dc| {
                    let d = (dr * dr + dc * dc).sqrt();
                    if (radius - 2.0..radius).contains(&d) {
                        [45, 45, 50]
                    } else if d < radius {
                        [12, 12, 14]
                    } else {
                        [0; 3]
                    }
                })
            })
            .collect::<anyhow::Result<_>>()?,
        ArtefactKind::MarkingCircle => vec![patch_from_fn(120, 120, |dr, dc| {
            let d = (dr * dr + dc * dc).sqrt();
            if (52.0..57.0).contains(&d) {
                [-110, -140, -40]
            } else {
                [0; 3]
            }
        })?],
        ArtefactKind::MarkingSpot => [6.0f32, 9.0]
            .iter()
            .map(|&radius| {
                let size = (radius * 2.0) as usize + 1;
                patch_from_fn(size, size, move |dr, dc| {
                    if dr * dr + dc * dc < radius * radius {
                        [-120, -150, -60]
                    } else {
                        [0; 3]
                    }
                })
            })
            .collect::<anyhow::Result<_>>()?,
        ArtefactKind::RulerHorizontal => vec![ruler(18, 160)?],
        ArtefactKind::RulerVertical => vec![ruler(18, 120)?, ruler(14, 90)?],
    };
    Ok(patches)
}

/// Dark bar with tick marks every eight pixels, drawn horizontally.
fn ruler(rows: usize, cols: usize) -> anyhow::Result<ArtefactPatch> {
    let half = rows as f32 / 2.0;
    patch_from_fn(rows, cols, move |dr, dc| {
        let tick = (dc as i32).rem_euclid(8) == 0 && dr < 0.0;
        if dr > half - 3.0 || tick {
            [-150, -150, -150]
        } else {
            [-30, -25, -20]
        }
    })
}

/// One catalog entry per artefact tag.
pub fn demo_catalog() -> anyhow::Result<Vec<CatalogEntry>> {
    ArtefactKind::ALL
        .iter()
        .map(|&kind| {
            let (category, subcategory) = kind.tags();
            Ok(CatalogEntry::new(
                category,
                subcategory,
                synthetic_patches(kind)?,
            ))
        })
        .collect()
}

pub fn save_png(image: &RgbImage, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("Wrote {}.", path.display());
    Ok(())
}
