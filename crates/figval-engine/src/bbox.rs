//! Axis-aligned bounding boxes and canvas containment.
//!
//! Boxes are closed on all four sides: a box with `top == bottom` and
//! `left == right` covers exactly one pixel. Containment is exact integer
//! comparison with no tolerance.

use serde::{Deserialize, Serialize};

use crate::error::FigureError;
use crate::types::{Canvas, Point};

/// An inclusive pixel box. Always satisfies `top <= bottom` and
/// `left <= right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    top: i64,
    left: i64,
    bottom: i64,
    right: i64,
}

impl BoundingBox {
    /// Create a box from its four edges.
    ///
    /// Returns `None` if `top > bottom` or `left > right`.
    #[must_use]
    pub const fn new(top: i64, left: i64, bottom: i64, right: i64) -> Option<Self> {
        if top > bottom || left > right {
            return None;
        }
        Some(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// The box anchored at `(0, 0)` covering `height` x `width` pixels.
    ///
    /// Both sides must be at least 1.
    pub(crate) const fn from_size(height: i64, width: i64) -> Self {
        Self {
            top: 0,
            left: 0,
            bottom: height - 1,
            right: width - 1,
        }
    }

    /// The one-pixel box at `p`.
    #[must_use]
    pub const fn from_point(p: Point) -> Self {
        Self {
            top: p.row,
            left: p.col,
            bottom: p.row,
            right: p.col,
        }
    }

    /// Tightest box around a set of points, or `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut points = points.into_iter();
        let init = Self::from_point(*points.next()?);
        Some(points.fold(init, |b, p| Self {
            top: b.top.min(p.row),
            left: b.left.min(p.col),
            bottom: b.bottom.max(p.row),
            right: b.right.max(p.col),
        }))
    }

    /// Top edge (smallest row).
    #[must_use]
    pub const fn top(&self) -> i64 {
        self.top
    }

    /// Left edge (smallest column).
    #[must_use]
    pub const fn left(&self) -> i64 {
        self.left
    }

    /// Bottom edge (largest row).
    #[must_use]
    pub const fn bottom(&self) -> i64 {
        self.bottom
    }

    /// Right edge (largest column).
    #[must_use]
    pub const fn right(&self) -> i64 {
        self.right
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn height(&self) -> i64 {
        self.bottom - self.top + 1
    }

    /// Number of columns covered.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Number of pixels covered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn area(&self) -> f64 {
        (self.height() * self.width()) as f64
    }

    /// `[top, left, bottom, right]`, the order used on the wire.
    #[must_use]
    pub const fn to_array(&self) -> [i64; 4] {
        [self.top, self.left, self.bottom, self.right]
    }

    /// Corners clockwise from the top-left: left-top, right-top,
    /// right-bottom, left-bottom.
    #[must_use]
    pub const fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.top, self.left),
            Point::new(self.top, self.right),
            Point::new(self.bottom, self.right),
            Point::new(self.bottom, self.left),
        ]
    }

    /// Whether `other` lies entirely inside `self` (edges may touch).
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.top <= other.top
            && self.left <= other.left
            && self.bottom >= other.bottom
            && self.right >= other.right
    }

    /// Shift the box by `(rows, cols)`.
    #[must_use]
    pub const fn translate(&self, rows: i64, cols: i64) -> Self {
        Self {
            top: self.top + rows,
            left: self.left + cols,
            bottom: self.bottom + rows,
            right: self.right + cols,
        }
    }
}

/// Check that `bbox` lies within the canvas.
///
/// # Errors
///
/// Returns [`FigureError::OutOfBounds`] if any edge of `bbox` leaves the
/// canvas.
pub fn ensure_within(canvas: Canvas, bbox: &BoundingBox) -> Result<(), FigureError> {
    if canvas.rect().contains(bbox) {
        Ok(())
    } else {
        Err(FigureError::OutOfBounds {
            bbox: *bbox,
            canvas,
        })
    }
}
