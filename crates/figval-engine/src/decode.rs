//! Geometry decoder: shape tag + JSON payload -> [`Geometry`].
//!
//! The shape tag selects one decode routine. Vector shapes read
//! `[x, y]` pairs and convert them to pixels with the configured
//! [`CoordinateSystem`]; masks go through the [`mask`](crate::mask) codec
//! and keep their absolute origin.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::bbox::BoundingBox;
use crate::error::DecodeError;
use crate::geometry::{Geometry, Keypoints, Node, Polygon, Polyline, ShapeKind};
use crate::mask::{self, MAX_COORDINATE, MaskKind};
use crate::types::{Canvas, CoordinateSystem, Point};

/// A decoded geometry plus whether decoding normalized it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The canonical geometry.
    pub geometry: Geometry,
    /// `true` when the canonical form differs from what was submitted
    /// (a trimmed bitmap). Callers return the canonical JSON in that case.
    pub geometry_changed: bool,
}

impl Decoded {
    const fn unchanged(geometry: Geometry) -> Self {
        Self {
            geometry,
            geometry_changed: false,
        }
    }
}

/// Settings shared by every decode routine.
#[derive(Debug, Clone, Copy)]
struct Context {
    canvas: Canvas,
    coordinates: CoordinateSystem,
}

type DecodeFn = fn(&Value, Context) -> Result<Decoded, DecodeError>;

fn decoder(kind: ShapeKind) -> DecodeFn {
    match kind {
        ShapeKind::Rectangle => decode_rectangle,
        ShapeKind::Polygon => decode_polygon,
        ShapeKind::Polyline => decode_polyline,
        ShapeKind::Point => decode_point,
        ShapeKind::Keypoints => decode_keypoints,
        ShapeKind::Bitmap => decode_bitmap,
        ShapeKind::AlphaMask => decode_alpha_mask,
    }
}

/// Decode `payload` as a geometry of shape `tag`.
///
/// # Errors
///
/// Returns [`DecodeError::UnsupportedGeometry`] for an unknown tag and
/// other [`DecodeError`] variants for malformed payloads.
pub fn decode(
    tag: &str,
    payload: &Value,
    canvas: Canvas,
    coordinates: CoordinateSystem,
) -> Result<Decoded, DecodeError> {
    let kind =
        ShapeKind::from_tag(tag).ok_or_else(|| DecodeError::UnsupportedGeometry(tag.to_string()))?;
    decoder(kind)(
        payload,
        Context {
            canvas,
            coordinates,
        },
    )
}

fn decode_rectangle(payload: &Value, ctx: Context) -> Result<Decoded, DecodeError> {
    let (exterior, _) = read_points(payload, ctx)?;
    if exterior.len() != 2 {
        return Err(DecodeError::invalid(
            "exterior",
            format!("rectangle needs exactly 2 points, got {}", exterior.len()),
        ));
    }
    let bbox = BoundingBox::from_points(&exterior)
        .ok_or_else(|| DecodeError::invalid("exterior", "no points"))?;
    Ok(Decoded::unchanged(Geometry::Rectangle(bbox)))
}

/// Ring sizes are not checked here; see [`crate::structure`].
fn decode_polygon(payload: &Value, ctx: Context) -> Result<Decoded, DecodeError> {
    let (exterior, interiors) = read_points(payload, ctx)?;
    let polygon = Polygon::new(exterior, interiors)
        .ok_or_else(|| DecodeError::invalid("exterior", "polygon has no points"))?;
    Ok(Decoded::unchanged(Geometry::Polygon(polygon)))
}

fn decode_polyline(payload: &Value, ctx: Context) -> Result<Decoded, DecodeError> {
    let (exterior, _) = read_points(payload, ctx)?;
    if exterior.len() < 2 {
        return Err(DecodeError::invalid(
            "exterior",
            format!("line needs at least 2 points, got {}", exterior.len()),
        ));
    }
    let line = Polyline::new(exterior)
        .ok_or_else(|| DecodeError::invalid("exterior", "line has no points"))?;
    Ok(Decoded::unchanged(Geometry::Polyline(line)))
}

fn decode_point(payload: &Value, ctx: Context) -> Result<Decoded, DecodeError> {
    let (exterior, _) = read_points(payload, ctx)?;
    match exterior.as_slice() {
        &[p] => Ok(Decoded::unchanged(Geometry::Point(p))),
        other => Err(DecodeError::invalid(
            "exterior",
            format!("point needs exactly 1 point, got {}", other.len()),
        )),
    }
}

fn decode_keypoints(payload: &Value, ctx: Context) -> Result<Decoded, DecodeError> {
    let entries = payload
        .get("nodes")
        .ok_or(DecodeError::MissingField("nodes"))?
        .as_object()
        .ok_or_else(|| DecodeError::invalid("nodes", "expected an object keyed by node id"))?;

    let mut nodes = BTreeMap::new();
    for (id, entry) in entries {
        let loc = entry.get("loc").ok_or(DecodeError::MissingField("loc"))?;
        let disabled = match entry.get("disabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(DecodeError::invalid("disabled", "expected a boolean")),
        };
        nodes.insert(
            id.clone(),
            Node {
                location: read_point(loc, "loc", ctx)?,
                disabled,
            },
        );
    }
    let graph =
        Keypoints::new(nodes).ok_or_else(|| DecodeError::invalid("nodes", "graph has no nodes"))?;
    Ok(Decoded::unchanged(Geometry::Keypoints(graph)))
}

fn decode_bitmap(payload: &Value, _ctx: Context) -> Result<Decoded, DecodeError> {
    let decoded = mask::decode_mask(payload, MaskKind::Bitmap)?;
    let geometry_changed = decoded.geometry_changed();
    Ok(Decoded {
        geometry: Geometry::Bitmap(decoded.mask),
        geometry_changed,
    })
}

/// Alpha masks are trimmed like bitmaps, but the trim is not reported.
fn decode_alpha_mask(payload: &Value, _ctx: Context) -> Result<Decoded, DecodeError> {
    let decoded = mask::decode_mask(payload, MaskKind::AlphaMask)?;
    Ok(Decoded::unchanged(Geometry::AlphaMask(decoded.mask)))
}

/// Read `points.exterior` and the optional `points.interior`.
fn read_points(payload: &Value, ctx: Context) -> Result<(Vec<Point>, Vec<Vec<Point>>), DecodeError> {
    let points = payload
        .get("points")
        .ok_or(DecodeError::MissingField("points"))?;
    let exterior = read_ring(
        points
            .get("exterior")
            .ok_or(DecodeError::MissingField("exterior"))?,
        "exterior",
        ctx,
    )?;
    let interiors = match points.get("interior") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rings)) => rings
            .iter()
            .map(|r| read_ring(r, "interior", ctx))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(DecodeError::invalid("interior", "expected a list of rings")),
    };
    Ok((exterior, interiors))
}

fn read_ring(value: &Value, field: &'static str, ctx: Context) -> Result<Vec<Point>, DecodeError> {
    value
        .as_array()
        .ok_or_else(|| DecodeError::invalid(field, "expected a list of [x, y] points"))?
        .iter()
        .map(|p| read_point(p, field, ctx))
        .collect()
}

fn read_point(value: &Value, field: &'static str, ctx: Context) -> Result<Point, DecodeError> {
    let (x, y) = match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => (
            x.as_f64().filter(|v| v.is_finite()),
            y.as_f64().filter(|v| v.is_finite()),
        ),
        _ => return Err(DecodeError::invalid(field, "expected an [x, y] point")),
    };
    let (Some(x), Some(y)) = (x, y) else {
        return Err(DecodeError::invalid(field, "coordinates must be finite numbers"));
    };
    let point = ctx.coordinates.to_pixel(x, y, ctx.canvas);
    if point.row.unsigned_abs() > MAX_COORDINATE.unsigned_abs()
        || point.col.unsigned_abs() > MAX_COORDINATE.unsigned_abs()
    {
        return Err(DecodeError::invalid(field, "coordinate out of range"));
    }
    Ok(point)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};
    use serde_json::json;

    use super::*;

    fn canvas() -> Canvas {
        Canvas::new(100, 200).unwrap()
    }

    fn decode_px(tag: &str, payload: &Value) -> Result<Decoded, DecodeError> {
        decode(tag, payload, canvas(), CoordinateSystem::Pixel)
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = decode_px("cuboid", &json!({})).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedGeometry("cuboid".to_string()));
        assert_eq!(err.to_string(), "unsupported geometry type: cuboid");
    }

    #[test]
    fn rectangle_corners_are_sorted() {
        let payload = json!({"points": {"exterior": [[30, 40], [10, 5]], "interior": []}});
        let decoded = decode_px("rectangle", &payload).unwrap();
        assert_eq!(decoded.geometry.to_bbox().to_array(), [5, 10, 40, 30]);
        assert!(!decoded.geometry_changed);
    }

    #[test]
    fn rectangle_needs_two_points() {
        let payload = json!({"points": {"exterior": [[0, 0], [1, 1], [2, 2]]}});
        assert!(matches!(
            decode_px("rectangle", &payload),
            Err(DecodeError::InvalidField {
                field: "exterior",
                ..
            })
        ));
    }

    #[test]
    fn polygon_decodes_without_counting_points() {
        let payload = json!({"points": {"exterior": [[0, 0], [5, 5]], "interior": [[[1, 1]]]}});
        let decoded = decode_px("polygon", &payload).unwrap();
        let Geometry::Polygon(polygon) = decoded.geometry else {
            unreachable!("expected a polygon");
        };
        assert_eq!(polygon.exterior().len(), 2);
        assert_eq!(polygon.interiors().len(), 1);
    }

    #[test]
    fn empty_polygon_is_rejected() {
        let payload = json!({"points": {"exterior": [], "interior": []}});
        assert!(decode_px("polygon", &payload).is_err());
    }

    #[test]
    fn missing_points_is_reported() {
        assert_eq!(
            decode_px("polygon", &json!({})).unwrap_err(),
            DecodeError::MissingField("points")
        );
        assert_eq!(
            decode_px("polygon", &json!({"points": {}})).unwrap_err(),
            DecodeError::MissingField("exterior")
        );
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let payload = json!({"points": {"exterior": [["a", 0], [1, 1], [2, 0]]}});
        assert!(matches!(
            decode_px("polygon", &payload),
            Err(DecodeError::InvalidField { .. })
        ));
    }

    #[test]
    fn huge_coordinates_are_rejected() {
        let payload = json!({"points": {"exterior": [[1e300, 0]]}});
        assert!(decode_px("point", &payload).is_err());
    }

    #[test]
    fn fractional_coordinates_round() {
        let payload = json!({"points": {"exterior": [[2.4, 7.6]], "interior": []}});
        let decoded = decode_px("point", &payload).unwrap();
        assert_eq!(decoded.geometry, Geometry::Point(Point::new(8, 2)));
    }

    #[test]
    fn relative_coordinates_scale_to_canvas() {
        let payload = json!({"points": {"exterior": [[0.0, 0.0], [1.0, 1.0]], "interior": []}});
        let decoded = decode("rectangle", &payload, canvas(), CoordinateSystem::Relative).unwrap();
        assert_eq!(decoded.geometry.to_bbox(), canvas().rect());
    }

    #[test]
    fn line_alias_and_minimum_length() {
        let ok = json!({"points": {"exterior": [[0, 0], [3, 4]], "interior": []}});
        assert!(decode_px("polyline", &ok).is_ok());
        assert!(decode_px("line", &ok).is_ok());
        let short = json!({"points": {"exterior": [[0, 0]], "interior": []}});
        assert!(decode_px("line", &short).is_err());
    }

    #[test]
    fn graph_nodes_decode() {
        let payload = json!({"nodes": {
            "nose": {"loc": [10, 20]},
            "tail": {"loc": [30, 5], "disabled": true},
        }});
        let decoded = decode_px("graph", &payload).unwrap();
        assert_eq!(decoded.geometry.to_bbox().to_array(), [5, 10, 20, 30]);
        let Geometry::Keypoints(graph) = &decoded.geometry else {
            unreachable!("expected keypoints");
        };
        let nodes = graph.nodes();
        assert!(nodes["tail"].disabled);
        assert!(!nodes["nose"].disabled);
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert!(decode_px("graph", &json!({"nodes": {}})).is_err());
    }

    #[test]
    fn vector_shapes_round_trip_through_json() {
        let payloads = [
            json!({"points": {"exterior": [[1, 2], [30, 40]], "interior": []}, "shape": "rectangle", "geometryType": "rectangle"}),
            json!({"points": {"exterior": [[0, 0], [10, 0], [10, 10]], "interior": [[[2, 2], [3, 2], [3, 3]]]}, "shape": "polygon", "geometryType": "polygon"}),
            json!({"points": {"exterior": [[0, 0], [10, 5]], "interior": []}, "shape": "line", "geometryType": "line"}),
            json!({"points": {"exterior": [[7, 9]], "interior": []}, "shape": "point", "geometryType": "point"}),
            json!({"nodes": {"a": {"loc": [1, 2]}, "b": {"loc": [3, 4], "disabled": true}}, "shape": "graph", "geometryType": "graph"}),
        ];
        for payload in payloads {
            let tag = payload["geometryType"].as_str().unwrap();
            let decoded = decode_px(tag, &payload).unwrap();
            assert_eq!(decoded.geometry.to_json().unwrap(), payload);
        }
    }

    #[test]
    fn bitmap_trim_is_reported_but_alpha_mask_trim_is_not() {
        let pixels = GrayImage::from_fn(4, 4, |x, y| Luma([if x < 2 && y < 2 { 255 } else { 0 }]));
        let data = mask::encode_pixels(&pixels).unwrap();

        let bitmap = decode_px("bitmap", &json!({"bitmap": {"data": data, "origin": [0, 0]}})).unwrap();
        assert!(bitmap.geometry_changed);
        assert_eq!(bitmap.geometry.to_bbox().to_array(), [0, 0, 1, 1]);

        let alpha =
            decode_px("alpha_mask", &json!({"alpha_mask": {"data": data, "origin": [0, 0]}})).unwrap();
        assert!(!alpha.geometry_changed);
        assert_eq!(alpha.geometry.to_bbox().to_array(), [0, 0, 1, 1]);
    }

    #[test]
    fn trimmed_bitmap_round_trips_to_itself() {
        let pixels = GrayImage::from_fn(5, 3, |x, _| Luma([if x == 3 { 255 } else { 0 }]));
        let payload = json!({"bitmap": {"data": mask::encode_pixels(&pixels).unwrap(), "origin": [4, 6]}});
        let first = decode_px("bitmap", &payload).unwrap();
        assert!(first.geometry_changed);

        let canonical = first.geometry.to_json().unwrap();
        let second = decode_px("bitmap", &canonical).unwrap();
        assert!(!second.geometry_changed);
        assert_eq!(second.geometry, first.geometry);
    }
}
