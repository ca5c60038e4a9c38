//! Canonical in-memory geometries, one variant per shape tag.
//!
//! Every variant knows its bounding box, its area and how to write
//! itself back as canonical JSON. Values are never mutated after
//! construction.

use std::collections::BTreeMap;

use geo::{Area, Coord, LineString};
use serde_json::{Map, Value, json};

use crate::bbox::BoundingBox;
use crate::error::EncodeError;
use crate::mask::{self, Mask, MaskKind};
use crate::types::Point;

/// Shape tags understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// `rectangle`
    Rectangle,
    /// `polygon`
    Polygon,
    /// `line` (alias `polyline`)
    Polyline,
    /// `point`
    Point,
    /// `graph` (alias `keypoints`)
    Keypoints,
    /// `bitmap`
    Bitmap,
    /// `alpha_mask`
    AlphaMask,
}

/// Tag lookup table, including accepted aliases.
const SHAPE_TAGS: &[(&str, ShapeKind)] = &[
    ("rectangle", ShapeKind::Rectangle),
    ("polygon", ShapeKind::Polygon),
    ("line", ShapeKind::Polyline),
    ("polyline", ShapeKind::Polyline),
    ("point", ShapeKind::Point),
    ("graph", ShapeKind::Keypoints),
    ("keypoints", ShapeKind::Keypoints),
    ("bitmap", ShapeKind::Bitmap),
    ("alpha_mask", ShapeKind::AlphaMask),
];

impl ShapeKind {
    /// Look up a shape tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        SHAPE_TAGS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|&(_, kind)| kind)
    }

    /// Canonical tag written to JSON.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::Polyline => "line",
            Self::Point => "point",
            Self::Keypoints => "graph",
            Self::Bitmap => MaskKind::Bitmap.field(),
            Self::AlphaMask => MaskKind::AlphaMask.field(),
        }
    }
}

/// A polygon: exterior ring plus zero or more holes. Rings are closed
/// implicitly (the last point connects back to the first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    exterior: Vec<Point>,
    interiors: Vec<Vec<Point>>,
    bbox: BoundingBox,
}

impl Polygon {
    /// Create a polygon, or `None` if `exterior` is empty.
    #[must_use]
    pub fn new(exterior: Vec<Point>, interiors: Vec<Vec<Point>>) -> Option<Self> {
        let bbox = BoundingBox::from_points(&exterior)?;
        Some(Self {
            exterior,
            interiors,
            bbox,
        })
    }

    /// The outer ring.
    #[must_use]
    pub fn exterior(&self) -> &[Point] {
        &self.exterior
    }

    /// The holes.
    #[must_use]
    pub fn interiors(&self) -> &[Vec<Point>] {
        &self.interiors
    }

    /// Box around the exterior ring.
    #[must_use]
    pub const fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Enclosed area: exterior minus holes.
    #[must_use]
    pub fn area(&self) -> f64 {
        geo::Polygon::new(
            ring(&self.exterior),
            self.interiors.iter().map(|r| ring(r)).collect(),
        )
        .unsigned_area()
    }
}

/// An open polyline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polyline {
    points: Vec<Point>,
    bbox: BoundingBox,
}

impl Polyline {
    /// Create a polyline, or `None` if `points` is empty.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Option<Self> {
        let bbox = BoundingBox::from_points(&points)?;
        Some(Self { points, bbox })
    }

    /// Vertices in drawing order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// A named keypoint of a [`Keypoints`] graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Location on the canvas.
    pub location: Point,
    /// Whether the annotator marked the keypoint as not visible.
    pub disabled: bool,
}

/// Keypoints keyed by node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypoints {
    nodes: BTreeMap<String, Node>,
    bbox: BoundingBox,
}

impl Keypoints {
    /// Create a graph, or `None` if it has no nodes.
    #[must_use]
    pub fn new(nodes: BTreeMap<String, Node>) -> Option<Self> {
        let bbox = BoundingBox::from_points(nodes.values().map(|n| &n.location))?;
        Some(Self { nodes, bbox })
    }

    /// The nodes.
    #[must_use]
    pub const fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.nodes
    }
}

/// A decoded figure geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Axis-aligned rectangle; its box is the geometry itself.
    Rectangle(BoundingBox),
    /// Polygon with optional holes.
    Polygon(Polygon),
    /// Open polyline.
    Polyline(Polyline),
    /// Single point.
    Point(Point),
    /// Named keypoints.
    Keypoints(Keypoints),
    /// Binary mask.
    Bitmap(Mask),
    /// Mask with alpha values.
    AlphaMask(Mask),
}

impl Geometry {
    /// Shape tag of this geometry.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Rectangle(_) => ShapeKind::Rectangle,
            Self::Polygon(_) => ShapeKind::Polygon,
            Self::Polyline(_) => ShapeKind::Polyline,
            Self::Point(_) => ShapeKind::Point,
            Self::Keypoints(_) => ShapeKind::Keypoints,
            Self::Bitmap(_) => ShapeKind::Bitmap,
            Self::AlphaMask(_) => ShapeKind::AlphaMask,
        }
    }

    /// Area in pixels. Zero for shapes without extent (points, lines,
    /// keypoints); foreground pixel count for masks.
    #[must_use]
    pub fn area(&self) -> f64 {
        match self {
            Self::Rectangle(b) => b.area(),
            Self::Polygon(p) => p.area(),
            Self::Polyline(_) | Self::Point(_) | Self::Keypoints(_) => 0.0,
            Self::Bitmap(m) | Self::AlphaMask(m) => m.area(),
        }
    }

    /// Axis-aligned bounding box.
    ///
    /// Polygons use their exterior ring only; masks use the trimmed box.
    #[must_use]
    pub fn to_bbox(&self) -> BoundingBox {
        match self {
            Self::Rectangle(b) => *b,
            Self::Polygon(p) => p.bbox(),
            Self::Polyline(line) => line.bbox,
            Self::Point(p) => BoundingBox::from_point(*p),
            Self::Keypoints(graph) => graph.bbox,
            Self::Bitmap(m) | Self::AlphaMask(m) => m.bbox(),
        }
    }

    /// Canonical JSON representation, tagged with `shape` and
    /// `geometryType`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if mask pixels cannot be encoded.
    pub fn to_json(&self) -> Result<Value, EncodeError> {
        let mut body = match self {
            Self::Rectangle(b) => json!({
                "points": {
                    "exterior": [[b.left(), b.top()], [b.right(), b.bottom()]],
                    "interior": [],
                }
            }),
            Self::Polygon(p) => json!({
                "points": {
                    "exterior": xy_list(p.exterior()),
                    "interior": p.interiors().iter().map(|r| xy_list(r)).collect::<Vec<_>>(),
                }
            }),
            Self::Polyline(line) => json!({
                "points": {"exterior": xy_list(line.points()), "interior": []}
            }),
            Self::Point(p) => json!({
                "points": {"exterior": [p.to_xy()], "interior": []}
            }),
            Self::Keypoints(graph) => {
                let nodes: Map<String, Value> = graph
                    .nodes()
                    .iter()
                    .map(|(id, node)| {
                        let mut entry = json!({"loc": node.location.to_xy()});
                        if node.disabled {
                            entry["disabled"] = Value::Bool(true);
                        }
                        (id.clone(), entry)
                    })
                    .collect();
                json!({"nodes": nodes})
            }
            Self::Bitmap(m) | Self::AlphaMask(m) => {
                let mut body = Map::new();
                body.insert(
                    self.kind().tag().to_string(),
                    json!({
                        "origin": m.origin().to_xy(),
                        "data": mask::encode_pixels(m.pixels())?,
                    }),
                );
                Value::Object(body)
            }
        };
        let tag = Value::from(self.kind().tag());
        body["shape"] = tag.clone();
        body["geometryType"] = tag;
        Ok(body)
    }
}

fn ring(points: &[Point]) -> LineString<f64> {
    #[allow(clippy::cast_precision_loss)]
    let coords = points
        .iter()
        .map(|p| Coord {
            x: p.col as f64,
            y: p.row as f64,
        })
        .collect();
    LineString::new(coords)
}

fn xy_list(points: &[Point]) -> Vec<[i64; 2]> {
    points.iter().map(|p| p.to_xy()).collect()
}
