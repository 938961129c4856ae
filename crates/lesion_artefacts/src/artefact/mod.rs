//! Artefact instances: a typed patch catalog plus the policies that decide how
//! its patches are varied and where they land on a target image.
//!
//! [`Artefact::apply`] runs one application:
//!
//! 1. build the placement density for the canvas (cached base, attenuated by the mask),
//! 2. draw a fresh sampler seed from the instance generator,
//! 3. pick and transform a working set of patches,
//! 4. place them according to the type's [`PlacementPolicy`].
use std::borrow::Cow;

use image::{GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, warn};

use crate::augment::{random_variants, AugmentPolicy, TransformPolicy};
use crate::density::mask::{self, Normalization};
use crate::density::{Density, DensityCache, DensityParams, Region};
use crate::error::{Error, Result};
use crate::patch::ArtefactPatch;
use crate::raster::Raster;
use crate::sampling::{Position, WeightedPositionSampler};

pub mod kind;
pub mod placement;

pub use kind::{
    ArtefactClass, ArtefactFamily, ArtefactKind, CollisionRule, DensitySource, Exhaustion,
    PlacementPolicy,
};
pub use placement::{Placement, PlacementOutcome, PlacementReport};

/// A catalog of patches of one [`ArtefactKind`] with its own random generator.
///
/// Seeded instances are reproducible: the same sequence of `apply` calls on the
/// same inputs yields the same images.
pub struct Artefact {
    kind: ArtefactKind,
    patches: Vec<ArtefactPatch>,
    augment: AugmentPolicy,
    transform: TransformPolicy,
    placement: PlacementPolicy,
    density: DensityParams,
    cache: DensityCache,
    rng: StdRng,
}

impl std::fmt::Debug for Artefact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artefact")
            .field("kind", &self.kind)
            .field("patches", &self.patches.len())
            .field("augment", &self.augment)
            .field("transform", &self.transform)
            .field("placement", &self.placement)
            .field("density", &self.density)
            .finish()
    }
}

impl Artefact {
    /// Creates an instance with the kind's default policies.
    ///
    /// Without a seed the generator is initialised from the operating system.
    pub fn new(kind: ArtefactKind, patches: Vec<ArtefactPatch>, seed: Option<u64>) -> Result<Self> {
        if patches.is_empty() {
            let (category, subcategory) = kind.tags();
            return Err(Error::EmptyCatalog {
                category: category.to_owned(),
                subcategory: subcategory.map(str::to_owned),
            });
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            kind,
            patches,
            augment: kind.default_augment(),
            transform: kind.default_transform(),
            placement: kind.default_placement(),
            density: DensityParams::default(),
            cache: DensityCache::new(),
            rng,
        })
    }

    /// Creates an instance from catalog tags, see [`ArtefactKind::from_tags`].
    pub fn from_tags(
        category: &str,
        subcategory: Option<&str>,
        patches: Vec<ArtefactPatch>,
        seed: Option<u64>,
    ) -> Result<Self> {
        Self::new(ArtefactKind::from_tags(category, subcategory)?, patches, seed)
    }

    pub fn with_augment(mut self, augment: AugmentPolicy) -> Self {
        self.augment = augment;
        self
    }

    pub fn with_transform(mut self, transform: TransformPolicy) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_density_params(mut self, density: DensityParams) -> Self {
        self.density = density;
        self
    }

    pub fn kind(&self) -> ArtefactKind {
        self.kind
    }

    pub fn patches(&self) -> &[ArtefactPatch] {
        &self.patches
    }

    pub fn augment(&self) -> &AugmentPolicy {
        &self.augment
    }

    pub fn transform(&self) -> &TransformPolicy {
        &self.transform
    }

    pub fn placement(&self) -> &PlacementPolicy {
        &self.placement
    }

    pub fn density_params(&self) -> &DensityParams {
        &self.density
    }

    /// Shape of the cached base density, if one was built.
    pub fn cached_density_shape(&self) -> Option<(usize, usize)> {
        self.cache.cached_shape()
    }

    /// Validates every policy, returning the first error.
    pub fn validate(&self) -> Result<()> {
        self.augment.validate()?;
        self.transform.validate()?;
        self.placement.validate()?;
        self.density.validate()
    }

    /// Composite a random variation of this artefact into a copy of `image`.
    ///
    /// `mask` marks the lesion (nonzero pixels) and must have the image's extent.
    pub fn apply(&mut self, image: &RgbImage, mask: Option<&GrayImage>) -> Result<RgbImage> {
        self.apply_with_report(image, mask).map(|(out, _)| out)
    }

    /// [`Artefact::apply`], also returning where each patch went.
    pub fn apply_with_report(
        &mut self,
        image: &RgbImage,
        mask: Option<&GrayImage>,
    ) -> Result<(RgbImage, PlacementReport)> {
        self.validate()?;
        let (w, h) = image.dimensions();
        let (rows, cols) = (h as usize, w as usize);
        if let Some(mask) = mask {
            let (mw, mh) = mask.dimensions();
            if (mw, mh) != (w, h) {
                return Err(Error::ShapeMismatch {
                    expected: (rows, cols, 1),
                    actual: (mh as usize, mw as usize, 1),
                });
            }
        }

        let mut canvas: Raster<i16> = Raster::from_rgb(image.clone()).convert();
        let mut report = PlacementReport::new(self.kind);

        if self.placement.density == DensitySource::Centered {
            let center = centroid_or_middle(mask, rows, cols);
            let variants = random_variants(&self.patches, &self.augment, &self.transform, &mut self.rng);
            if let Some(patch) = variants.first() {
                report.placements.push(placement::place_at(&mut canvas, patch, center));
            }
        } else {
            let sigma = self.density.mask_sigma;
            let base = self.cache.get_or_build(rows, cols, &self.density);
            let (density, lesion) = placement_density(self.placement.density, base, mask, sigma)?;
            let mut sampler = WeightedPositionSampler::new(&density, self.rng.next_u64())?;
            let variants = random_variants(&self.patches, &self.augment, &self.transform, &mut self.rng);
            placement::place_all(
                &mut canvas,
                &variants,
                &mut sampler,
                &self.placement,
                lesion.as_deref(),
                &mut report,
            );
        }

        debug!(
            "{:?}: placed {} of {} patches ({} candidates, {} rejected).",
            self.kind,
            report.placed(),
            report.placements.len(),
            report.positions_evaluated,
            report.positions_rejected
        );
        let out = canvas.convert::<u8>().into_rgb()?;
        Ok((out, report))
    }
}

/// Lesion centroid truncated to integer coordinates, or the canvas center.
fn centroid_or_middle(mask: Option<&GrayImage>, rows: usize, cols: usize) -> Position {
    match mask.and_then(mask::center_of_mass) {
        Some((r, c)) => Position::new(r as i64, c as i64),
        None => Position::new((rows / 2) as i64, (cols / 2) as i64),
    }
}

/// Build the sampling density for `source` and the lesion mask used by the
/// collision rule, which may be synthetic.
fn placement_density<'m>(
    source: DensitySource,
    base: &Density,
    mask: Option<&'m GrayImage>,
    sigma: f32,
) -> Result<(Density, Option<Cow<'m, GrayImage>>)> {
    let (rows, cols) = base.shape();
    let marked = mask.filter(|m| !mask::is_empty(m));

    let (density, lesion) = match source {
        DensitySource::Centered | DensitySource::LesionAttenuated => match mask {
            Some(m) => {
                let weights = mask::lesion_weights(m, sigma, Normalization::FullRange);
                (base.attenuate(&weights)?, Some(Cow::Borrowed(m)))
            }
            None => (base.clone(), None),
        },
        DensitySource::LowerMiddleBand => {
            let region = Region::lower_middle(rows, cols);
            let attenuated = marked
                .map(|m| mask::lesion_weights(m, sigma, Normalization::Peak).restrict(region));
            let weights = match attenuated {
                Some(w) if w.has_mass() => w,
                Some(_) => {
                    warn!("Lesion covers the ruler band; using the unattenuated band.");
                    mask::region_weights(rows, cols, region)
                }
                None => mask::region_weights(rows, cols, region),
            };
            (base.attenuate(&weights)?, marked.map(Cow::Borrowed))
        }
        DensitySource::Peripheral => {
            let lesion = match marked {
                Some(m) => Cow::Borrowed(m),
                None => Cow::Owned(mask::circular_mask(rows, cols)),
            };
            let weights = mask::lesion_weights(&lesion, sigma, Normalization::FullRange);
            (base.attenuate(&weights)?, Some(lesion))
        }
    };

    if !density.has_mass() {
        warn!("Placement density for {}x{} canvas has no mass.", rows, cols);
        return Err(Error::DegenerateDensity);
    }
    Ok((density, lesion))
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb};

    use super::*;

    fn square(rows: usize, cols: usize, value: i16) -> ArtefactPatch {
        ArtefactPatch::from_delta(Raster::filled(rows, cols, 3, value)).unwrap()
    }

    fn box_mask(w: u32, h: u32, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if rows.contains(&y) && cols.contains(&x) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            Artefact::new(ArtefactKind::Bubble, Vec::new(), Some(1)),
            Err(Error::EmptyCatalog { .. })
        ));
        assert!(matches!(
            Artefact::from_tags("ruler", Some("diagonal"), vec![square(2, 2, 1)], None),
            Err(Error::UnknownArtefactType { .. })
        ));
    }

    #[test]
    fn tagged_empty_catalog_reports_its_tags() {
        match Artefact::from_tags("marking", Some("spot"), Vec::new(), None) {
            Err(Error::EmptyCatalog { category, subcategory }) => {
                assert_eq!(category, "marking");
                assert_eq!(subcategory.as_deref(), Some("spot"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn single_patch_lands_where_reported() {
        let image = RgbImage::new(100, 100);
        let mut artefact = Artefact::new(ArtefactKind::Bubble, vec![square(10, 10, 50)], Some(42))
            .unwrap()
            .with_augment(AugmentPolicy::disabled())
            .with_transform(TransformPolicy::disabled());

        let (out, report) = artefact.apply_with_report(&image, None).unwrap();
        assert_eq!(report.placements.len(), 1);
        let placement = report.placements[0];
        assert_eq!(placement.outcome, PlacementOutcome::Accepted);

        let area = placement.footprint(100, 100).unwrap();
        for (x, y, px) in out.enumerate_pixels() {
            let (r, c) = (y as usize, x as usize);
            let inside = (area.target_row..area.target_row + area.rows).contains(&r)
                && (area.target_col..area.target_col + area.cols).contains(&c);
            let expected = if inside { 50 } else { 0 };
            assert_eq!(px.0, [expected; 3], "pixel ({r}, {c})");
        }
    }

    #[test]
    fn seeded_instances_are_reproducible() {
        let image = RgbImage::from_pixel(64, 48, Rgb([120, 110, 100]));
        let patches = vec![square(6, 4, 40), square(3, 8, -60)];
        let mut a = Artefact::new(ArtefactKind::MarkingSpot, patches.clone(), Some(7)).unwrap();
        let mut b = Artefact::new(ArtefactKind::MarkingSpot, patches, Some(7)).unwrap();
        for _ in 0..3 {
            assert_eq!(a.apply(&image, None).unwrap(), b.apply(&image, None).unwrap());
        }
    }

    #[test]
    fn bubbles_never_overlap() {
        let image = RgbImage::new(120, 120);
        let patches = (0..4).map(|_| square(12, 12, 1)).collect();
        let mut artefact = Artefact::new(ArtefactKind::Bubble, patches, Some(3))
            .unwrap()
            .with_transform(TransformPolicy::disabled());

        for _ in 0..10 {
            let (out, report) = artefact.apply_with_report(&image, None).unwrap();
            // overlapping stamps would add up past 1
            assert!(out.as_raw().iter().all(|v| *v <= 1));
            let stamped = out.as_raw().iter().filter(|v| **v == 1).count() / 3;
            let claimed: usize = report
                .placements
                .iter()
                .filter(|p| p.is_placed())
                .filter_map(|p| p.footprint(120, 120))
                .map(|a| a.rows * a.cols)
                .sum();
            assert_eq!(stamped, claimed);
        }
    }

    #[test]
    fn marking_circle_goes_to_lesion_centroid() {
        let image = RgbImage::new(80, 60);
        let mask = box_mask(80, 60, 10..21, 40..51);
        let mut artefact = Artefact::new(ArtefactKind::MarkingCircle, vec![square(5, 5, 9)], Some(11))
            .unwrap()
            .with_transform(TransformPolicy::disabled());

        let (_, report) = artefact.apply_with_report(&image, Some(&mask)).unwrap();
        assert_eq!(report.placements.len(), 1);
        assert_eq!(report.placements[0].center, Position::new(15, 45));

        let (_, report) = artefact.apply_with_report(&image, None).unwrap();
        assert_eq!(report.placements[0].center, Position::new(30, 40));
        assert_eq!(artefact.cached_density_shape(), None);
    }

    #[test]
    fn horizontal_ruler_stays_in_lower_middle_band() {
        let image = RgbImage::new(300, 200);
        let mut artefact = Artefact::new(ArtefactKind::RulerHorizontal, vec![square(4, 20, -80)], Some(5))
            .unwrap()
            .with_transform(TransformPolicy::disabled());
        let band = Region::lower_middle(200, 300);
        let lesion = box_mask(300, 200, 60..140, 110..190);

        for mask in [None, Some(&lesion)] {
            for _ in 0..40 {
                let (_, report) = artefact.apply_with_report(&image, mask).unwrap();
                let center = report.placements[0].center;
                assert!(
                    band.contains(center.row as usize, center.col as usize),
                    "center {center:?}"
                );
            }
        }
    }

    #[test]
    fn horizontal_ruler_falls_back_to_band_under_covering_lesion() {
        let (w, h) = (90u32, 60u32);
        let image = RgbImage::new(w, h);
        let mut artefact = Artefact::new(ArtefactKind::RulerHorizontal, vec![square(2, 10, 40)], Some(13))
            .unwrap()
            .with_transform(TransformPolicy::disabled());
        let band = Region::lower_middle(h as usize, w as usize);
        let covering = GrayImage::from_pixel(w, h, Luma([255]));

        for _ in 0..30 {
            let (out, report) = artefact.apply_with_report(&image, Some(&covering)).unwrap();
            assert_eq!(report.placed(), 1);
            let center = report.placements[0].center;
            assert!(
                band.contains(center.row as usize, center.col as usize),
                "center {center:?}"
            );
            assert!(out.as_raw().iter().any(|v| *v > 0));
        }
    }

    #[test]
    fn vertical_ruler_avoids_synthetic_lesion() {
        let (w, h) = (120u32, 120u32);
        let image = RgbImage::new(w, h);
        let synthetic = mask::circular_mask(h as usize, w as usize);
        let mut artefact = Artefact::new(ArtefactKind::RulerVertical, vec![square(3, 3, 20)], Some(9))
            .unwrap()
            .with_transform(TransformPolicy::disabled());

        let empty = GrayImage::new(w, h);
        let mut outside = 0;
        let runs = 60;
        for i in 0..runs {
            let mask = if i % 2 == 0 { None } else { Some(&empty) };
            let (_, report) = artefact.apply_with_report(&image, mask).unwrap();
            let p = report.placements[0];
            if synthetic.get_pixel(p.center.col as u32, p.center.row as u32)[0] == 0 {
                outside += 1;
            }
            if p.outcome == PlacementOutcome::Accepted {
                assert!(!placement::touches_lesion(
                    &synthetic,
                    &square(3, 3, 20),
                    p.center
                ));
            }
        }
        assert!(outside * 10 >= runs * 9, "{outside} of {runs} outside");
    }

    #[test]
    fn density_is_cached_per_shape() {
        let mut artefact = Artefact::new(ArtefactKind::Bubble, vec![square(2, 2, 1)], Some(1)).unwrap();
        artefact.apply(&RgbImage::new(40, 30), None).unwrap();
        assert_eq!(artefact.cached_density_shape(), Some((30, 40)));
        artefact.apply(&RgbImage::new(40, 30), None).unwrap();
        assert_eq!(artefact.cached_density_shape(), Some((30, 40)));
        artefact.apply(&RgbImage::new(20, 50), None).unwrap();
        assert_eq!(artefact.cached_density_shape(), Some((50, 20)));
    }

    #[test]
    fn mask_extent_must_match() {
        let mut artefact = Artefact::new(ArtefactKind::Bubble, vec![square(2, 2, 1)], Some(1)).unwrap();
        let err = artefact
            .apply(&RgbImage::new(10, 10), Some(&GrayImage::new(10, 9)))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn fully_masked_canvas_is_degenerate() {
        let mut artefact = Artefact::new(ArtefactKind::Bubble, vec![square(2, 2, 1)], Some(1)).unwrap();
        let mask = GrayImage::from_pixel(30, 30, Luma([255]));
        assert!(matches!(
            artefact.apply(&RgbImage::new(30, 30), Some(&mask)),
            Err(Error::DegenerateDensity)
        ));
    }

    #[test]
    fn invalid_policies_fail_before_sampling() {
        let mut artefact = Artefact::new(ArtefactKind::Bubble, vec![square(2, 2, 1)], Some(1))
            .unwrap()
            .with_augment(AugmentPolicy::new(1.5, 0.0));
        assert!(matches!(
            artefact.apply(&RgbImage::new(10, 10), None),
            Err(Error::InvalidConfig(_))
        ));
    }
}
