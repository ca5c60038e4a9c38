//! Shared types for the figval validation engine.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::RequestError;

/// Re-export `GrayImage` so downstream crates can build mask pixels
/// without depending on `image` directly.
pub use image::GrayImage;

/// A pixel position on the canvas.
///
/// Rows grow downwards and columns grow to the right. In JSON payloads a
/// point is written as `[col, row]` (`[x, y]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Vertical position (pixels from top edge).
    pub row: i64,
    /// Horizontal position (pixels from left edge).
    pub col: i64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Shift the point by `(rows, cols)`.
    #[must_use]
    pub const fn translate(self, rows: i64, cols: i64) -> Self {
        Self::new(self.row + rows, self.col + cols)
    }

    /// The `[col, row]` pair used by JSON payloads.
    #[must_use]
    pub const fn to_xy(self) -> [i64; 2] {
        [self.col, self.row]
    }
}

/// The raster extent figures are validated against.
///
/// Both sides are strictly positive; use [`Canvas::new`] to construct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    height: u32,
    width: u32,
}

impl Canvas {
    /// Create a canvas of `height` x `width` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidCanvas`] if either side is zero.
    pub const fn new(height: u32, width: u32) -> Result<Self, RequestError> {
        if height == 0 || width == 0 {
            return Err(RequestError::InvalidCanvas { height, width });
        }
        Ok(Self { height, width })
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.height
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.width
    }

    /// The inclusive box covering every pixel of the canvas.
    #[must_use]
    pub fn rect(self) -> BoundingBox {
        BoundingBox::from_size(i64::from(self.height), i64::from(self.width))
    }
}

/// How coordinates of non-mask payloads are expressed.
///
/// Masks always carry an absolute pixel origin and ignore this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    /// Values are absolute pixel indices, rounded to the nearest pixel.
    #[default]
    Pixel,
    /// Values are fractions of the canvas: `0.0` is the first pixel and
    /// `1.0` the last one along each axis.
    Relative,
}

impl CoordinateSystem {
    /// Convert a payload `(x, y)` pair to an absolute pixel position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_pixel(self, x: f64, y: f64, canvas: Canvas) -> Point {
        let (x, y) = match self {
            Self::Pixel => (x, y),
            Self::Relative => (
                x * f64::from(canvas.width - 1),
                y * f64::from(canvas.height - 1),
            ),
        };
        Point::new(y.round() as i64, x.round() as i64)
    }
}

/// Configuration for batch validation and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Coordinate convention of non-mask payloads.
    pub coordinates: CoordinateSystem,

    /// Batches with at least this many figures are processed on the
    /// rayon thread pool. Smaller batches run on the calling thread.
    pub parallel_threshold: usize,
}

impl ValidationConfig {
    /// Default value for [`parallel_threshold`](Self::parallel_threshold).
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            coordinates: CoordinateSystem::default(),
            parallel_threshold: Self::DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}
