//! Row-major pixel storage shared by images and artefact deltas.
//!
//! [`Raster`] is a plain `rows x cols x channels` buffer. The element type decides
//! the valid value range through [`Channel`]; compositing widens to `i32`,
//! adds, and clamps back into that range.
use image::RgbImage;

use crate::error::{Error, Result};

/// Integer element type with a fixed valid range.
pub trait Channel: Copy + Default + Send + Sync + 'static {
    const MIN: i32;
    const MAX: i32;

    fn widen(self) -> i32;

    /// Narrow a widened value, saturating at the type's range.
    fn saturate(value: i32) -> Self;
}

impl Channel for u8 {
    const MIN: i32 = u8::MIN as i32;
    const MAX: i32 = u8::MAX as i32;

    #[inline]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline]
    fn saturate(value: i32) -> Self {
        value.clamp(<Self as Channel>::MIN, <Self as Channel>::MAX) as u8
    }
}

impl Channel for u16 {
    const MIN: i32 = u16::MIN as i32;
    const MAX: i32 = u16::MAX as i32;

    #[inline]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline]
    fn saturate(value: i32) -> Self {
        value.clamp(<Self as Channel>::MIN, <Self as Channel>::MAX) as u16
    }
}

impl Channel for i16 {
    const MIN: i32 = i16::MIN as i32;
    const MAX: i32 = i16::MAX as i32;

    #[inline]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline]
    fn saturate(value: i32) -> Self {
        value.clamp(<Self as Channel>::MIN, <Self as Channel>::MAX) as i16
    }
}

/// A `rows x cols x channels` pixel buffer in row-major, channel-interleaved order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster<T> {
    rows: usize,
    cols: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Channel> Raster<T> {
    /// Create a raster of the given shape, initializing all values to zero.
    pub fn new(rows: usize, cols: usize, channels: usize) -> Self {
        Self {
            rows,
            cols,
            channels,
            data: vec![T::default(); rows * cols * channels],
        }
    }

    /// Wrap an existing buffer, checking that its length matches the shape.
    pub fn from_raw(rows: usize, cols: usize, channels: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols * channels {
            return Err(Error::ShapeMismatch {
                expected: (rows, cols, channels),
                actual: (data.len(), 1, 1),
            });
        }
        Ok(Self {
            rows,
            cols,
            channels,
            data,
        })
    }

    /// Create a raster where every element holds `value`.
    pub fn filled(rows: usize, cols: usize, channels: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            channels,
            data: vec![value; rows * cols * channels],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(rows, cols, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<T> {
        self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        (row * self.cols + col) * self.channels
    }

    /// Get a single element, returning `None` if out of bounds.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<T> {
        if row >= self.rows || col >= self.cols || channel >= self.channels {
            return None;
        }
        Some(self.data[self.offset(row, col) + channel])
    }

    /// Set a single element. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: T) {
        if row >= self.rows || col >= self.cols || channel >= self.channels {
            return;
        }
        let i = self.offset(row, col) + channel;
        self.data[i] = value;
    }

    /// All channels of the pixel at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> &[T] {
        let start = self.offset(row, col);
        &self.data[start..start + self.channels]
    }

    pub fn pixel_mut(&mut self, row: usize, col: usize) -> &mut [T] {
        let start = self.offset(row, col);
        let channels = self.channels;
        &mut self.data[start..start + channels]
    }

    /// Convert every element into another channel type, saturating at its range.
    pub fn convert<U: Channel>(&self) -> Raster<U> {
        Raster {
            rows: self.rows,
            cols: self.cols,
            channels: self.channels,
            data: self.data.iter().map(|v| U::saturate(v.widen())).collect(),
        }
    }

    /// Mirror the raster along `axis` (0 flips rows, 1 flips columns).
    pub fn flipped(&self, axis: usize) -> Self {
        let mut out = Self::new(self.rows, self.cols, self.channels);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let (sr, sc) = if axis == 0 {
                    (self.rows - 1 - r, c)
                } else {
                    (r, self.cols - 1 - c)
                };
                out.pixel_mut(r, c).copy_from_slice(self.pixel(sr, sc));
            }
        }
        out
    }
}

impl Raster<u8> {
    /// Take ownership of an RGB image's buffer.
    pub fn from_rgb(image: RgbImage) -> Self {
        let (w, h) = image.dimensions();
        Self {
            rows: h as usize,
            cols: w as usize,
            channels: 3,
            data: image.into_raw(),
        }
    }

    /// Build an RGB image; only valid for three-channel rasters.
    pub fn into_rgb(self) -> Result<RgbImage> {
        if self.channels != 3 {
            return Err(Error::ShapeMismatch {
                expected: (self.rows, self.cols, 3),
                actual: self.shape(),
            });
        }
        let (rows, cols) = (self.rows, self.cols);
        RgbImage::from_raw(cols as u32, rows as u32, self.data)
            .ok_or_else(|| Error::Other(format!("cannot build {cols}x{rows} RGB image")))
    }
}
