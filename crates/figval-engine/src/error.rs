//! Error types.
//!
//! Every per-figure failure is a [`FigureError`]. It never escapes the
//! batch: the orchestrators turn it into that figure's `error` entry and
//! carry on with the next figure. Only a malformed request envelope
//! (see [`RequestError`]) fails a whole call.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::types::Canvas;

/// Malformed or missing data in a shape payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The shape tag is not in the decoder table.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// A required field is absent.
    #[error("missing field \"{0}\"")]
    MissingField(&'static str),

    /// A field is present but has the wrong type or value.
    #[error("invalid field \"{field}\": {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The mask `data` string is not base64(zlib(PNG)) of a usable mask.
    #[error("failed to decode mask data: {0}")]
    MaskData(String),

    /// The decoded mask has no foreground pixel.
    #[error("mask contains no foreground pixels")]
    EmptyMask,
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Shape-specific structural rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// A polygon exterior ring with fewer than three points.
    #[error("exterior contour with less than 3 points")]
    ShortExterior,

    /// A polygon interior ring with fewer than three points.
    #[error("interior contour with less than 3 points")]
    ShortInterior,
}

/// A mask that cannot be turned into a single polygon.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Only bitmaps can be converted.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// Contour tracing did not yield exactly one contour.
    #[error("Found {0} contours instead of one. The mask may have gaps or multiple regions.")]
    ContourCount(usize),
}

/// Failure to serialize a geometry back to its canonical JSON.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The mask pixels could not be written as PNG.
    #[error("failed to encode mask: {0}")]
    MaskImage(#[from] image::ImageError),
}

/// Everything that can go wrong while processing one figure.
#[derive(Debug, thiserror::Error)]
pub enum FigureError {
    /// The payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The figure's bounding box leaves the canvas.
    #[error(
        "Figure with corners {} is out of image bounds: {}x{}",
        corner_listing(.bbox),
        .canvas.height(),
        .canvas.width()
    )]
    OutOfBounds {
        /// Bounding box of the rejected figure.
        bbox: BoundingBox,
        /// Canvas it was checked against.
        canvas: Canvas,
    },

    /// A shape-specific rule was violated.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Mask-to-polygon conversion failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The normalized geometry could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl FigureError {
    /// Machine-readable category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::OutOfBounds { .. } => ErrorKind::Bounds,
            Self::Structure(_) => ErrorKind::Structure,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }
}

/// Category of a [`FigureError`], exposed next to the message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// See [`FigureError::Decode`].
    Decode,
    /// See [`FigureError::OutOfBounds`].
    Bounds,
    /// See [`FigureError::Structure`].
    Structure,
    /// See [`FigureError::Conversion`].
    Conversion,
    /// See [`FigureError::Encode`].
    Encode,
}

/// A request envelope that cannot be processed at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Canvas sides must be strictly positive.
    #[error("invalid canvas size: {height}x{width}")]
    InvalidCanvas {
        /// Requested height.
        height: u32,
        /// Requested width.
        width: u32,
    },
}

/// Render the corners of `bbox` as `['ltop(col, row)', ...]`, clockwise
/// from the top-left corner.
fn corner_listing(bbox: &BoundingBox) -> String {
    let labelled: Vec<String> = ["ltop", "rtop", "rbot", "lbot"]
        .iter()
        .zip(bbox.corners())
        .map(|(label, p)| format!("'{label}({}, {})'", p.col, p.row))
        .collect();
    format!("[{}]", labelled.join(", "))
}
