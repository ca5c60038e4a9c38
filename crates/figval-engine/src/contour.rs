//! Contour extraction: turn a mask into a single polygon.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! one at runtime. Conversion succeeds only when tracing yields exactly
//! one contour: holes and disjoint regions each add a contour and make
//! the mask unconvertible.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::error::{ConversionError, FigureError, StructureError};
use crate::geometry::Polygon;
use crate::mask::Mask;
use crate::structure::MIN_RING_POINTS;
use crate::types::Point;

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,
}

/// One traced boundary, in buffer coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Boundary pixels in tracing order.
    pub points: Vec<Point>,
    /// `true` for the boundary of a hole, `false` for an outer boundary.
    pub is_hole: bool,
}

/// Trait for contour tracing strategies.
///
/// Input: a mask buffer (nonzero pixels = foreground).
/// Output: every outer and hole boundary found.
pub trait ContourTracer {
    /// Trace contours in the given mask buffer.
    fn trace(&self, pixels: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, pixels: &GrayImage) -> Vec<Contour> {
        match *self {
            Self::BorderFollowing => trace_border_following(pixels),
        }
    }
}

fn trace_border_following(pixels: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<u32>(pixels)
        .into_iter()
        .map(|c| Contour {
            points: c
                .points
                .into_iter()
                .map(|p| Point::new(i64::from(p.y), i64::from(p.x)))
                .collect(),
            is_hole: matches!(c.border_type, BorderType::Hole),
        })
        .collect()
}

/// Copy of `pixels` inside a one-pixel empty border.
///
/// Border following only starts an outer boundary at a background to
/// foreground transition, so foreground on the buffer edge needs the
/// frame to be traced.
fn with_empty_border(pixels: &GrayImage) -> GrayImage {
    let mut framed = GrayImage::new(pixels.width() + 2, pixels.height() + 2);
    image::imageops::replace(&mut framed, pixels, 1, 1);
    framed
}

/// Trace `mask` and return its single contour as a polygon in canvas
/// coordinates.
///
/// # Errors
///
/// Returns [`ConversionError::ContourCount`] unless exactly one contour is
/// found, and [`StructureError::ShortExterior`] if that contour has fewer
/// than three points (a one- or two-pixel mask).
pub fn mask_to_polygon(mask: &Mask, tracer: &impl ContourTracer) -> Result<Polygon, FigureError> {
    let mut contours = tracer.trace(&with_empty_border(mask.pixels()));
    if contours.len() != 1 {
        return Err(ConversionError::ContourCount(contours.len()).into());
    }
    let contour = contours.remove(0);
    if contour.points.len() < MIN_RING_POINTS {
        return Err(StructureError::ShortExterior.into());
    }

    // Frame coordinates are one pixel down and right of buffer ones.
    let origin = mask.origin().translate(-1, -1);
    let exterior = contour
        .points
        .into_iter()
        .map(|p| p.translate(origin.row, origin.col))
        .collect();
    Polygon::new(exterior, Vec::new()).ok_or_else(|| StructureError::ShortExterior.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::bbox::BoundingBox;
    use crate::error::ErrorKind;

    fn filled(width: u32, height: u32, inside: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([if inside(x, y) { 255 } else { 0 }]))
    }

    #[test]
    fn default_is_border_following() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
    }

    #[test]
    fn empty_image_produces_no_contours() {
        let img = GrayImage::new(10, 10);
        assert!(ContourTracerKind::BorderFollowing.trace(&img).is_empty());
    }

    #[test]
    fn filled_rectangle_has_one_outer_contour() {
        let img = filled(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
        let contours = ContourTracerKind::BorderFollowing.trace(&img);
        assert_eq!(contours.len(), 1);
        assert!(!contours[0].is_hole);
        assert!(contours[0].points.len() >= 4);
    }

    #[test]
    fn ring_has_outer_and_hole_contours() {
        let img = filled(10, 10, |x, y| {
            (1..9).contains(&x) && (1..9).contains(&y) && !((4..6).contains(&x) && (4..6).contains(&y))
        });
        let contours = ContourTracerKind::BorderFollowing.trace(&img);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours.iter().filter(|c| c.is_hole).count(), 1);
    }

    #[test]
    fn rectangle_mask_converts_to_polygon_with_same_bbox() {
        let img = filled(8, 6, |x, y| (1..7).contains(&x) && (2..5).contains(&y));
        let mask = Mask::from_pixels(&img, Point::new(100, 50)).unwrap();
        let polygon = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap();

        assert!(polygon.interiors().is_empty());
        assert_eq!(polygon.bbox(), mask.bbox());
        assert_eq!(
            mask.bbox(),
            BoundingBox::new(102, 51, 104, 56).unwrap()
        );
    }

    #[test]
    fn fully_foreground_mask_traces_its_outline() {
        let img = filled(4, 3, |_, _| true);
        let mask = Mask::from_pixels(&img, Point::new(7, 9)).unwrap();
        let polygon = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap();
        assert_eq!(polygon.bbox(), mask.bbox());
        assert_eq!(polygon.bbox().to_array(), [7, 9, 9, 12]);
        for corner in mask.bbox().corners() {
            assert!(polygon.exterior().contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn edge_touching_ring_is_not_mistaken_for_its_hole() {
        let img = filled(6, 6, |x, y| !((2..4).contains(&x) && (2..4).contains(&y)));
        let mask = Mask::from_pixels(&img, Point::new(0, 0)).unwrap();
        let err = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap_err();
        assert!(matches!(
            err,
            FigureError::Conversion(ConversionError::ContourCount(2))
        ));
    }

    #[test]
    fn disjoint_regions_report_contour_count() {
        let img = filled(10, 4, |x, _| x < 3 || x > 6);
        let mask = Mask::from_pixels(&img, Point::new(0, 0)).unwrap();
        let err = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap_err();
        assert!(matches!(
            err,
            FigureError::Conversion(ConversionError::ContourCount(2))
        ));
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn mask_with_hole_is_not_convertible() {
        let img = filled(5, 5, |x, y| !(x == 2 && y == 2));
        let mask = Mask::from_pixels(&img, Point::new(0, 0)).unwrap();
        let err = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap_err();
        assert!(matches!(
            err,
            FigureError::Conversion(ConversionError::ContourCount(2))
        ));
    }

    #[test]
    fn single_pixel_mask_is_too_small() {
        let img = filled(3, 3, |x, y| x == 1 && y == 1);
        let mask = Mask::from_pixels(&img, Point::new(0, 0)).unwrap();
        let err = mask_to_polygon(&mask, &ContourTracerKind::BorderFollowing).unwrap_err();
        assert!(matches!(
            err,
            FigureError::Structure(StructureError::ShortExterior)
        ));
    }
}
