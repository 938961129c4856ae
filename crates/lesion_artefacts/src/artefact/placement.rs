//! Placement loops: sample candidate centers, apply the collision rule, and
//! composite accepted patches into the working canvas.
use image::GrayImage;
use tracing::{debug, warn};

use crate::artefact::kind::{CollisionRule, Exhaustion, PlacementPolicy};
use crate::artefact::ArtefactKind;
use crate::embed::{embed_into, Overlap};
use crate::patch::ArtefactPatch;
use crate::raster::Raster;
use crate::sampling::{Position, PositionSampler};

/// What happened to one patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlacementOutcome {
    /// Composited at a position that passed the collision rule.
    Accepted,
    /// Every attempt was rejected and the patch was dropped.
    Skipped,
    /// Every attempt was rejected and the patch was composited at the last sample.
    Forced,
}

/// One patch handled during an application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    /// Patch center; for skipped patches the last rejected candidate.
    pub center: Position,
    /// Patch extent as `(rows, cols)`.
    pub extent: (usize, usize),
    /// Candidate positions drawn for this patch.
    pub attempts: usize,
    pub outcome: PlacementOutcome,
}

impl Placement {
    /// Whether the patch was composited.
    pub fn is_placed(&self) -> bool {
        self.outcome != PlacementOutcome::Skipped
    }

    /// Part of the patch rectangle that lies inside a `rows x cols` canvas.
    pub fn footprint(&self, rows: usize, cols: usize) -> Option<Overlap> {
        Overlap::locate(rows, cols, self.extent.0, self.extent.1, self.center)
    }
}

/// Result of one artefact application.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementReport {
    pub kind: ArtefactKind,
    /// One entry per patch in the augmented working set, in placement order.
    pub placements: Vec<Placement>,
    /// Total candidate positions drawn.
    pub positions_evaluated: usize,
    /// Total candidate positions rejected by the collision rule.
    pub positions_rejected: usize,
}

impl PlacementReport {
    pub fn new(kind: ArtefactKind) -> Self {
        Self {
            kind,
            placements: Vec::new(),
            positions_evaluated: 0,
            positions_rejected: 0,
        }
    }

    fn push(&mut self, placement: Placement, rejected: usize) {
        self.positions_evaluated += placement.attempts;
        self.positions_rejected += rejected;
        self.placements.push(placement);
    }

    pub fn count(&self, outcome: PlacementOutcome) -> usize {
        self.placements
            .iter()
            .filter(|p| p.outcome == outcome)
            .count()
    }

    /// Number of composited patches, forced ones included.
    pub fn placed(&self) -> usize {
        self.placements.iter().filter(|p| p.is_placed()).count()
    }
}

/// Canvas cells claimed by earlier placements of the same application.
pub struct OccupancyMask {
    cols: usize,
    cells: Vec<bool>,
}

impl OccupancyMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![false; rows * cols],
        }
    }

    pub fn is_free(&self, area: &Overlap) -> bool {
        area.cells()
            .all(|(r, c, _, _)| !self.cells[r * self.cols + c])
    }

    pub fn claim(&mut self, area: &Overlap) {
        for (r, c, _, _) in area.cells() {
            self.cells[r * self.cols + c] = true;
        }
    }
}

/// Whether any nonzero pixel of `patch` centered at `center` lands on a lesion pixel.
pub fn touches_lesion(mask: &GrayImage, patch: &ArtefactPatch, center: Position) -> bool {
    let (w, h) = mask.dimensions();
    let Some(overlap) = Overlap::locate(h as usize, w as usize, patch.rows(), patch.cols(), center)
    else {
        return false;
    };
    let delta = patch.delta();
    overlap.cells().any(|(tr, tc, pr, pc)| {
        mask.get_pixel(tc as u32, tr as u32)[0] != 0
            && delta.pixel(pr, pc).iter().any(|v| *v != 0)
    })
}

/// Composite one patch at a fixed center.
pub fn place_at(canvas: &mut Raster<i16>, patch: &ArtefactPatch, center: Position) -> Placement {
    embed_into(canvas, patch.delta(), center);
    debug!(
        "Placed {}x{} patch at ({}, {}).",
        patch.rows(),
        patch.cols(),
        center.row,
        center.col
    );
    Placement {
        center,
        extent: (patch.rows(), patch.cols()),
        attempts: 0,
        outcome: PlacementOutcome::Accepted,
    }
}

/// Place every patch in order with candidates drawn from `sampler`.
///
/// `lesion` is consulted only by [`CollisionRule::LesionIntersection`].
pub fn place_all(
    canvas: &mut Raster<i16>,
    patches: &[ArtefactPatch],
    sampler: &mut dyn PositionSampler,
    policy: &PlacementPolicy,
    lesion: Option<&GrayImage>,
    report: &mut PlacementReport,
) {
    let (rows, cols) = (canvas.rows(), canvas.cols());
    let mut occupancy = match policy.collision {
        CollisionRule::SelfOverlap => Some(OccupancyMask::new(rows, cols)),
        _ => None,
    };

    for patch in patches {
        let extent = (patch.rows(), patch.cols());
        let mut attempts = 0;
        let mut accepted = None;
        let mut last = Position::default();

        while attempts < policy.max_attempts.max(1) {
            attempts += 1;
            let candidate = sampler.sample();
            last = candidate;
            let ok = match policy.collision {
                CollisionRule::None => true,
                CollisionRule::SelfOverlap => {
                    let area = Overlap::locate(rows, cols, extent.0, extent.1, candidate);
                    match (occupancy.as_mut(), area) {
                        (Some(occupancy), Some(area)) if occupancy.is_free(&area) => {
                            occupancy.claim(&area);
                            true
                        }
                        (Some(_), Some(_)) => false,
                        // Nothing lands on the canvas, so nothing can collide.
                        _ => true,
                    }
                }
                CollisionRule::LesionIntersection => {
                    !lesion.is_some_and(|mask| touches_lesion(mask, patch, candidate))
                }
            };
            if ok {
                accepted = Some(candidate);
                break;
            }
        }

        let rejected = attempts - usize::from(accepted.is_some());
        let placement = match (accepted, policy.exhaustion) {
            (Some(center), _) => {
                embed_into(canvas, patch.delta(), center);
                Placement {
                    center,
                    extent,
                    attempts,
                    outcome: PlacementOutcome::Accepted,
                }
            }
            (None, Exhaustion::Skip) => {
                warn!(
                    "No free position for {}x{} patch after {} attempts; skipping.",
                    extent.0, extent.1, attempts
                );
                Placement {
                    center: last,
                    extent,
                    attempts,
                    outcome: PlacementOutcome::Skipped,
                }
            }
            (None, Exhaustion::Force) => {
                warn!(
                    "No valid position for {}x{} patch after {} attempts; placing at ({}, {}).",
                    extent.0, extent.1, attempts, last.row, last.col
                );
                embed_into(canvas, patch.delta(), last);
                Placement {
                    center: last,
                    extent,
                    attempts,
                    outcome: PlacementOutcome::Forced,
                }
            }
        };
        debug!(
            "Patch {}x{} at ({}, {}): {:?} after {} attempts.",
            extent.0, extent.1, placement.center.row, placement.center.col, placement.outcome, attempts
        );
        report.push(placement, rejected);
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::artefact::kind::DensitySource;

    /// Replays a fixed list of positions, repeating the last one.
    struct Scripted {
        positions: Vec<Position>,
        next: usize,
    }

    impl Scripted {
        fn new(positions: &[(i64, i64)]) -> Self {
            Self {
                positions: positions.iter().map(|(r, c)| Position::new(*r, *c)).collect(),
                next: 0,
            }
        }
    }

    impl PositionSampler for Scripted {
        fn sample(&mut self) -> Position {
            let i = self.next.min(self.positions.len() - 1);
            self.next += 1;
            self.positions[i]
        }
    }

    fn patch(rows: usize, cols: usize, value: i16) -> ArtefactPatch {
        ArtefactPatch::from_delta(Raster::filled(rows, cols, 3, value)).unwrap()
    }

    fn policy(collision: CollisionRule, max_attempts: usize, exhaustion: Exhaustion) -> PlacementPolicy {
        PlacementPolicy {
            density: DensitySource::LesionAttenuated,
            collision,
            max_attempts,
            exhaustion,
        }
    }

    #[test]
    fn self_overlap_retries_then_accepts() {
        let mut canvas = Raster::new(50, 50, 3);
        let patches = vec![patch(10, 10, 5), patch(10, 10, 5)];
        let mut sampler = Scripted::new(&[(20, 20), (22, 22), (25, 25), (40, 40)]);
        let mut report = PlacementReport::new(ArtefactKind::Bubble);
        place_all(
            &mut canvas,
            &patches,
            &mut sampler,
            &policy(CollisionRule::SelfOverlap, 10, Exhaustion::Skip),
            None,
            &mut report,
        );

        assert_eq!(report.placements[0].center, Position::new(20, 20));
        assert_eq!(report.placements[1].center, Position::new(40, 40));
        assert_eq!(report.placements[1].attempts, 3);
        assert_eq!(report.positions_evaluated, 4);
        assert_eq!(report.positions_rejected, 2);
        assert_eq!(canvas.get(20, 20, 0), Some(5));
        assert_eq!(canvas.get(40, 40, 0), Some(5));
        assert_eq!(canvas.get(30, 30, 0), Some(0));
    }

    #[test]
    fn self_overlap_skips_when_exhausted() {
        let mut canvas = Raster::new(30, 30, 3);
        let patches = vec![patch(6, 6, 7), patch(6, 6, 7)];
        let mut sampler = Scripted::new(&[(10, 10)]);
        let mut report = PlacementReport::new(ArtefactKind::MarkingSpot);
        place_all(
            &mut canvas,
            &patches,
            &mut sampler,
            &policy(CollisionRule::SelfOverlap, 10, Exhaustion::Skip),
            None,
            &mut report,
        );

        assert_eq!(report.count(PlacementOutcome::Accepted), 1);
        assert_eq!(report.count(PlacementOutcome::Skipped), 1);
        assert_eq!(report.placements[1].attempts, 10);
        assert_eq!(report.placed(), 1);
        // the second patch never stacked on the first
        assert_eq!(canvas.get(10, 10, 0), Some(7));
    }

    #[test]
    fn lesion_intersection_forces_last_sample() {
        let mut canvas = Raster::new(40, 40, 3);
        let mask = GrayImage::from_pixel(40, 40, Luma([255]));
        let patches = vec![patch(4, 4, -30)];
        let mut sampler = Scripted::new(&[(5, 5), (6, 6), (30, 12)]);
        let mut report = PlacementReport::new(ArtefactKind::RulerVertical);
        place_all(
            &mut canvas,
            &patches,
            &mut sampler,
            &policy(CollisionRule::LesionIntersection, 3, Exhaustion::Force),
            Some(&mask),
            &mut report,
        );

        let placement = report.placements[0];
        assert_eq!(placement.outcome, PlacementOutcome::Forced);
        assert_eq!(placement.center, Position::new(30, 12));
        assert_eq!(placement.attempts, 3);
        assert_eq!(canvas.get(30, 12, 0), Some(-30));
        assert_eq!(canvas.get(5, 5, 0), Some(0));
    }

    #[test]
    fn zero_pixels_do_not_touch_the_lesion() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([1]));
        let mut delta = Raster::filled(5, 5, 3, 9i16);
        for ch in 0..3 {
            delta.set(2, 2, ch, 0);
        }
        let hollow = ArtefactPatch::from_delta(delta).unwrap();
        assert!(!touches_lesion(&mask, &hollow, Position::new(10, 10)));
        assert!(touches_lesion(&mask, &hollow, Position::new(11, 10)));
        assert!(!touches_lesion(&mask, &hollow, Position::new(-10, -10)));
    }

    #[test]
    fn occupancy_tracks_claimed_cells() {
        let mut occupancy = OccupancyMask::new(10, 10);
        let a = Overlap::locate(10, 10, 4, 4, Position::new(2, 2)).unwrap();
        let b = Overlap::locate(10, 10, 4, 4, Position::new(4, 4)).unwrap();
        let c = Overlap::locate(10, 10, 4, 4, Position::new(8, 8)).unwrap();
        assert!(occupancy.is_free(&a));
        occupancy.claim(&a);
        assert!(!occupancy.is_free(&b));
        assert!(occupancy.is_free(&c));
    }

    #[test]
    fn footprint_is_clipped_to_canvas() {
        let placement = Placement {
            center: Position::new(1, 98),
            extent: (10, 10),
            attempts: 1,
            outcome: PlacementOutcome::Accepted,
        };
        let area = placement.footprint(100, 100).unwrap();
        assert_eq!((area.target_row, area.target_col), (0, 93));
        assert_eq!((area.rows, area.cols), (6, 7));
    }
}
