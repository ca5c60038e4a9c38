//! Shape-specific structural rules.
//!
//! Rules run against the submitted payload rather than the decoded
//! geometry, so they judge what the client sent even where the decoder
//! is lenient. Only polygons have rules today.

use serde_json::Value;

use crate::error::StructureError;
use crate::geometry::ShapeKind;

/// Minimum number of points in a polygon ring.
pub const MIN_RING_POINTS: usize = 3;

/// Apply the rules of `kind` to a payload that already decoded.
///
/// # Errors
///
/// Returns the first [`StructureError`] found.
pub fn check(kind: ShapeKind, payload: &Value) -> Result<(), StructureError> {
    match kind {
        ShapeKind::Polygon => check_polygon(payload),
        ShapeKind::Rectangle
        | ShapeKind::Polyline
        | ShapeKind::Point
        | ShapeKind::Keypoints
        | ShapeKind::Bitmap
        | ShapeKind::AlphaMask => Ok(()),
    }
}

fn check_polygon(payload: &Value) -> Result<(), StructureError> {
    let points = &payload["points"];
    if ring_len(&points["exterior"]) < MIN_RING_POINTS {
        return Err(StructureError::ShortExterior);
    }
    if let Some(interiors) = points["interior"].as_array()
        && interiors.iter().any(|r| ring_len(r) < MIN_RING_POINTS)
    {
        return Err(StructureError::ShortInterior);
    }
    Ok(())
}

fn ring_len(ring: &Value) -> usize {
    ring.as_array().map_or(0, Vec::len)
}
