//! Compositing of signed artefact deltas into images.
//!
//! A patch is positioned by its center. Whatever part of it falls outside the
//! target is cut away, the remaining overlap is added with widened arithmetic,
//! and the sum is clamped to the target's element range.
use crate::raster::{Channel, Raster};
use crate::sampling::Position;

/// Rectangle where a patch centered at some position intersects a target.
///
/// Target coordinates start at `(target_row, target_col)`, patch coordinates at
/// `(patch_row, patch_col)`; both cover `rows x cols` elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlap {
    pub target_row: usize,
    pub target_col: usize,
    pub patch_row: usize,
    pub patch_col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Overlap {
    /// Locate a `patch_rows x patch_cols` patch centered at `center` inside a
    /// `target_rows x target_cols` target. Returns `None` when nothing overlaps.
    pub fn locate(
        target_rows: usize,
        target_cols: usize,
        patch_rows: usize,
        patch_cols: usize,
        center: Position,
    ) -> Option<Self> {
        let (row_start, row_skip, rows) = clip_axis(center.row, patch_rows, target_rows)?;
        let (col_start, col_skip, cols) = clip_axis(center.col, patch_cols, target_cols)?;
        Some(Self {
            target_row: row_start,
            target_col: col_start,
            patch_row: row_skip,
            patch_col: col_skip,
            rows,
            cols,
        })
    }

    /// Iterate `(target_row, target_col, patch_row, patch_col)` over the overlap.
    pub fn cells(self) -> impl Iterator<Item = (usize, usize, usize, usize)> {
        (0..self.rows).flat_map(move |dr| {
            (0..self.cols).map(move |dc| {
                (
                    self.target_row + dr,
                    self.target_col + dc,
                    self.patch_row + dr,
                    self.patch_col + dc,
                )
            })
        })
    }
}

/// Clip one axis. Returns `(target_start, patch_skip, len)`.
fn clip_axis(center: i64, patch_len: usize, target_len: usize) -> Option<(usize, usize, usize)> {
    let start = center - (patch_len / 2) as i64;
    let end = start + patch_len as i64;
    let clipped_start = start.max(0);
    let clipped_end = end.min(target_len as i64);
    if clipped_end <= clipped_start {
        return None;
    }
    Some((
        clipped_start as usize,
        (clipped_start - start) as usize,
        (clipped_end - clipped_start) as usize,
    ))
}

/// Add `patch` onto a copy of `target`, centered at `center`.
///
/// The result always has the target's shape and element type. A patch that
/// lies entirely outside the target leaves the copy unchanged. Channels beyond
/// the smaller of both channel counts are not touched.
pub fn embed<T: Channel>(target: &Raster<T>, patch: &Raster<i16>, center: Position) -> Raster<T> {
    let mut out = target.clone();
    embed_into(&mut out, patch, center);
    out
}

/// In-place form of [`embed`], used when the caller owns the working buffer.
pub(crate) fn embed_into<T: Channel>(target: &mut Raster<T>, patch: &Raster<i16>, center: Position) {
    let Some(overlap) = Overlap::locate(
        target.rows(),
        target.cols(),
        patch.rows(),
        patch.cols(),
        center,
    ) else {
        return;
    };

    let channels = target.channels().min(patch.channels());
    for (tr, tc, pr, pc) in overlap.cells() {
        let src = patch.pixel(pr, pc);
        let dst = target.pixel_mut(tr, tc);
        for ch in 0..channels {
            dst[ch] = T::saturate(dst[ch].widen() + i32::from(src[ch]));
        }
    }
}
