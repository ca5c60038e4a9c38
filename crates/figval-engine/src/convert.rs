//! Bitmap to polygon conversion.

use serde_json::Value;

use crate::batch::{self, GEOMETRY_TYPE};
use crate::contour::{self, ContourTracerKind};
use crate::diagnostics::{BatchDiagnostics, Clock, WebClock};
use crate::error::{ConversionError, DecodeError, FigureError};
use crate::geometry::{Geometry, ShapeKind};
use crate::mask::{self, MaskKind};
use crate::types::ValidationConfig;
use crate::validate::GEOMETRY;

/// Convert one bitmap figure to the canonical JSON of a polygon.
///
/// The mask body may sit next to `geometryType` or under a nested
/// `geometry` object; both forms are accepted.
///
/// # Errors
///
/// Returns [`ConversionError::UnsupportedGeometry`] for any tag other than
/// `bitmap`, a [`DecodeError`] for a malformed mask, and
/// [`ConversionError::ContourCount`] unless the mask traces to exactly
/// one contour.
pub fn convert_figure(figure: &Value, tracer: ContourTracerKind) -> Result<Value, FigureError> {
    let tag = figure
        .get(GEOMETRY_TYPE)
        .ok_or(DecodeError::MissingField(GEOMETRY_TYPE))?
        .as_str()
        .ok_or_else(|| DecodeError::invalid(GEOMETRY_TYPE, "expected a string"))?;
    if ShapeKind::from_tag(tag) != Some(ShapeKind::Bitmap) {
        return Err(ConversionError::UnsupportedGeometry(tag.to_string()).into());
    }

    let payload = figure.get(GEOMETRY).unwrap_or(figure);
    let decoded = mask::decode_mask(payload, MaskKind::Bitmap)?;
    let polygon = contour::mask_to_polygon(&decoded.mask, &tracer)?;
    Ok(Geometry::Polygon(polygon).to_json()?)
}

/// Convert every figure, one result per figure in input order.
#[must_use]
pub fn convert_batch(figures: &[Value], config: &ValidationConfig) -> Vec<Result<Value, FigureError>> {
    convert_batch_with_diagnostics(figures, config, &WebClock).0
}

/// Like [`convert_batch`], also returning timing diagnostics.
pub fn convert_batch_with_diagnostics<C: Clock + Sync>(
    figures: &[Value],
    config: &ValidationConfig,
    clock: &C,
) -> (Vec<Result<Value, FigureError>>, BatchDiagnostics) {
    batch::run(figures, config, clock, |figure| {
        convert_figure(figure, ContourTracerKind::default())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn bitmap_figure(pixels: &GrayImage, origin: [i64; 2]) -> Value {
        json!({
            "geometryType": "bitmap",
            "bitmap": {"data": mask::encode_pixels(pixels).unwrap(), "origin": origin},
        })
    }

    fn block(width: u32, height: u32, inside: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([if inside(x, y) { 255 } else { 0 }]))
    }

    #[test]
    fn filled_block_becomes_polygon() {
        let pixels = block(10, 10, |x, y| (2..8).contains(&x) && (3..6).contains(&y));
        let polygon = convert_figure(&bitmap_figure(&pixels, [40, 30]), ContourTracerKind::default()).unwrap();

        assert_eq!(polygon["geometryType"], "polygon");
        assert_eq!(polygon["points"]["interior"], json!([]));
        let exterior = polygon["points"]["exterior"].as_array().unwrap();
        let xs: Vec<i64> = exterior.iter().map(|p| p[0].as_i64().unwrap()).collect();
        let ys: Vec<i64> = exterior.iter().map(|p| p[1].as_i64().unwrap()).collect();
        assert_eq!(xs.iter().min(), Some(&42));
        assert_eq!(xs.iter().max(), Some(&47));
        assert_eq!(ys.iter().min(), Some(&33));
        assert_eq!(ys.iter().max(), Some(&35));
    }

    #[test]
    fn nested_geometry_body_is_accepted() {
        let pixels = block(4, 4, |_, _| true);
        let figure = json!({
            "geometryType": "bitmap",
            "geometry": {"bitmap": {"data": mask::encode_pixels(&pixels).unwrap(), "origin": [0, 0]}},
        });
        assert!(convert_figure(&figure, ContourTracerKind::default()).is_ok());
    }

    #[test]
    fn two_regions_report_contour_count() {
        let pixels = block(12, 4, |x, _| x < 4 || x > 7);
        let err = convert_figure(&bitmap_figure(&pixels, [0, 0]), ContourTracerKind::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Found 2 contours instead of one. The mask may have gaps or multiple regions."
        );
    }

    #[test]
    fn only_bitmaps_convert() {
        for tag in ["polygon", "alpha_mask", "cuboid"] {
            let err = convert_figure(&json!({"geometryType": tag}), ContourTracerKind::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conversion);
            assert_eq!(err.to_string(), format!("unsupported geometry type: {tag}"));
        }
    }

    #[test]
    fn missing_mask_body_is_a_decode_error() {
        let err = convert_figure(&json!({"geometryType": "bitmap"}), ContourTracerKind::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn batch_keeps_order() {
        let good = bitmap_figure(&block(3, 3, |_, _| true), [1, 1]);
        let figures = vec![json!({"geometryType": "polygon"}), good];
        let results = convert_batch(&figures, &ValidationConfig::default());
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
