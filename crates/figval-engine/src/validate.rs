//! Figure validation: decode, measure, bounds-check and rule-check each
//! submitted figure.

use serde_json::Value;

use crate::batch::{self, GEOMETRY_TYPE};
use crate::bbox::{self, BoundingBox};
use crate::decode;
use crate::diagnostics::{BatchDiagnostics, Clock, WebClock};
use crate::error::{DecodeError, FigureError};
use crate::structure;
use crate::types::{Canvas, ValidationConfig};

/// Key holding the shape payload of a submitted figure.
pub const GEOMETRY: &str = "geometry";

/// A successfully validated figure.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureValidation {
    /// Area in pixels.
    pub area: f64,
    /// Bounding box of the canonical geometry.
    pub bbox: BoundingBox,
    /// Canonical JSON, present only when it differs from the submission.
    pub geometry: Option<Value>,
}

/// Per-request validation options.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions<'a> {
    /// Canvas every figure must fit in.
    pub canvas: Canvas,
    /// Skip the canvas containment check.
    pub skip_bounds: bool,
    /// Engine configuration.
    pub config: &'a ValidationConfig,
}

/// Validate a single `{"geometryType": ..., "geometry": ...}` figure.
///
/// Steps, in order: decode, bounding box and area, canvas containment
/// (unless skipped), shape-specific rules.
///
/// # Errors
///
/// Returns the first [`FigureError`] raised by any step.
pub fn validate_figure(figure: &Value, options: &BatchOptions<'_>) -> Result<FigureValidation, FigureError> {
    let tag = figure
        .get(GEOMETRY_TYPE)
        .ok_or(DecodeError::MissingField(GEOMETRY_TYPE))?
        .as_str()
        .ok_or_else(|| DecodeError::invalid(GEOMETRY_TYPE, "expected a string"))?;
    let payload = figure
        .get(GEOMETRY)
        .ok_or(DecodeError::MissingField(GEOMETRY))?;

    let decoded = decode::decode(tag, payload, options.canvas, options.config.coordinates)?;
    let geometry = &decoded.geometry;
    let bbox = geometry.to_bbox();
    let area = geometry.area();

    if !options.skip_bounds {
        bbox::ensure_within(options.canvas, &bbox)?;
    }
    structure::check(geometry.kind(), payload)?;

    let normalized = if decoded.geometry_changed {
        Some(geometry.to_json()?)
    } else {
        None
    };
    Ok(FigureValidation {
        area,
        bbox,
        geometry: normalized,
    })
}

/// Validate every figure, one result per figure in input order.
#[must_use]
pub fn validate_batch(
    figures: &[Value],
    options: &BatchOptions<'_>,
) -> Vec<Result<FigureValidation, FigureError>> {
    validate_batch_with_diagnostics(figures, options, &WebClock).0
}

/// Like [`validate_batch`], also returning timing diagnostics.
pub fn validate_batch_with_diagnostics<C: Clock + Sync>(
    figures: &[Value],
    options: &BatchOptions<'_>,
    clock: &C,
) -> (Vec<Result<FigureValidation, FigureError>>, BatchDiagnostics) {
    batch::run(figures, options.config, clock, |figure| {
        validate_figure(figure, options)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};
    use serde_json::json;

    use super::*;
    use crate::error::{ErrorKind, StructureError};
    use crate::mask;

    fn options(config: &ValidationConfig, skip_bounds: bool) -> BatchOptions<'_> {
        BatchOptions {
            canvas: Canvas::new(100, 200).unwrap(),
            skip_bounds,
            config,
        }
    }

    fn rectangle(left: i64, top: i64, right: i64, bottom: i64) -> Value {
        json!({
            "geometryType": "rectangle",
            "geometry": {"points": {"exterior": [[left, top], [right, bottom]], "interior": []}},
        })
    }

    #[test]
    fn full_canvas_rectangle_is_valid() {
        let config = ValidationConfig::default();
        let result = validate_figure(&rectangle(0, 0, 199, 99), &options(&config, false)).unwrap();
        assert_eq!(result.bbox.to_array(), [0, 0, 99, 199]);
        assert!((result.area - 20_000.0).abs() < f64::EPSILON);
        assert!(result.geometry.is_none());
    }

    #[test]
    fn rectangle_one_pixel_out_is_rejected() {
        let config = ValidationConfig::default();
        let err = validate_figure(&rectangle(0, 0, 200, 99), &options(&config, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bounds);
        assert_eq!(
            err.to_string(),
            "Figure with corners ['ltop(0, 0)', 'rtop(200, 0)', 'rbot(200, 99)', 'lbot(0, 99)'] \
             is out of image bounds: 100x200",
        );
    }

    #[test]
    fn skip_bounds_keeps_measurements() {
        let config = ValidationConfig::default();
        let figure = rectangle(-5, -5, 10, 10);
        assert!(validate_figure(&figure, &options(&config, false)).is_err());
        let result = validate_figure(&figure, &options(&config, true)).unwrap();
        assert_eq!(result.bbox.to_array(), [-5, -5, 10, 10]);
        assert!((result.area - 256.0).abs() < f64::EPSILON);
    }

    #[test]
    fn polygon_rules_apply_after_decoding() {
        let config = ValidationConfig::default();
        let figure = json!({
            "geometryType": "polygon",
            "geometry": {"points": {"exterior": [[0, 0], [5, 5]], "interior": []}},
        });
        let err = validate_figure(&figure, &options(&config, false)).unwrap_err();
        assert!(matches!(err, FigureError::Structure(StructureError::ShortExterior)));
    }

    #[test]
    fn bounds_are_checked_before_structure() {
        let config = ValidationConfig::default();
        let figure = json!({
            "geometryType": "polygon",
            "geometry": {"points": {"exterior": [[0, 0], [500, 5]], "interior": []}},
        });
        let err = validate_figure(&figure, &options(&config, false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bounds);
    }

    #[test]
    fn missing_figure_fields_are_decode_errors() {
        let config = ValidationConfig::default();
        let opts = options(&config, false);
        let no_type = json!({"geometry": {}});
        let no_geometry = json!({"geometryType": "polygon"});
        let bad_type = json!({"geometryType": 7, "geometry": {}});
        for figure in [no_type, no_geometry, bad_type] {
            assert_eq!(validate_figure(&figure, &opts).unwrap_err().kind(), ErrorKind::Decode);
        }
    }

    #[test]
    fn trimmed_bitmap_returns_normalized_geometry() {
        let config = ValidationConfig::default();
        let pixels = GrayImage::from_fn(6, 6, |x, y| Luma([if (2..4).contains(&x) && y < 3 { 255 } else { 0 }]));
        let figure = json!({
            "geometryType": "bitmap",
            "geometry": {"bitmap": {"data": mask::encode_pixels(&pixels).unwrap(), "origin": [10, 20]}},
        });
        let result = validate_figure(&figure, &options(&config, false)).unwrap();
        assert_eq!(result.bbox.to_array(), [20, 12, 22, 13]);
        assert!((result.area - 6.0).abs() < f64::EPSILON);
        let normalized = result.geometry.unwrap();
        assert_eq!(normalized["bitmap"]["origin"], json!([12, 20]));
        assert_eq!(normalized["geometryType"], "bitmap");
    }

    #[test]
    fn tight_bitmap_has_no_normalized_geometry() {
        let config = ValidationConfig::default();
        let pixels = GrayImage::from_pixel(3, 3, Luma([255]));
        let figure = json!({
            "geometryType": "bitmap",
            "geometry": {"bitmap": {"data": mask::encode_pixels(&pixels).unwrap(), "origin": [0, 0]}},
        });
        let result = validate_figure(&figure, &options(&config, false)).unwrap();
        assert!(result.geometry.is_none());
    }

    #[test]
    fn batch_isolates_failures() {
        let config = ValidationConfig::default();
        let figures = vec![
            rectangle(0, 0, 10, 10),
            json!({"geometryType": "cuboid", "geometry": {}}),
            rectangle(5, 5, 20, 20),
        ];
        let results = validate_batch(&figures, &options(&config, false));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().bbox.to_array(), [0, 0, 10, 10]);
        assert_eq!(
            results[1].as_ref().unwrap_err().to_string(),
            "unsupported geometry type: cuboid"
        );
        assert_eq!(results[2].as_ref().unwrap().bbox.to_array(), [5, 5, 20, 20]);
    }
}
