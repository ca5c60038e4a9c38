//! figval-engine: figure validation and normalization (sans-IO).
//!
//! Checks annotation figures (rectangles, polygons, lines, points,
//! keypoint graphs, bitmaps, alpha masks) against a raster canvas:
//! decode -> bounding box and area -> canvas containment ->
//! shape-specific rules -> normalized geometry for trimmed bitmaps.
//! Also converts single-region bitmaps to polygons.
//!
//! This crate has **no I/O dependencies**: it takes JSON values and
//! returns structured results. Reading requests lives in `figval`.

pub mod api;
pub mod batch;
pub mod bbox;
pub mod contour;
pub mod convert;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod structure;
pub mod types;
pub mod validate;

pub use api::{
    ConversionRequest, ConversionResponse, FigureResult, FigureValidationData, ValidationRequest,
    ValidationResponse,
};
pub use bbox::BoundingBox;
pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::{BatchDiagnostics, Clock, WebClock};
pub use error::{ErrorKind, FigureError, RequestError};
pub use geometry::{Geometry, ShapeKind};
pub use types::{Canvas, CoordinateSystem, Point, ValidationConfig};

use validate::BatchOptions;

/// Run `ValidateFigures` on a request.
///
/// Per-figure failures land in the response; they never fail the call.
///
/// # Errors
///
/// Returns [`RequestError::InvalidCanvas`] if either canvas side is zero.
pub fn validate_figures(
    request: &ValidationRequest,
    config: &ValidationConfig,
) -> Result<ValidationResponse, RequestError> {
    validate_figures_with_diagnostics(request, config, &WebClock).map(|(response, _)| response)
}

/// Like [`validate_figures`], also returning timing diagnostics.
///
/// # Errors
///
/// Returns [`RequestError::InvalidCanvas`] if either canvas side is zero.
pub fn validate_figures_with_diagnostics<C: Clock + Sync>(
    request: &ValidationRequest,
    config: &ValidationConfig,
    clock: &C,
) -> Result<(ValidationResponse, BatchDiagnostics), RequestError> {
    let options = BatchOptions {
        canvas: Canvas::new(request.height, request.width)?,
        skip_bounds: request.skip_bounds_validation,
        config,
    };
    let (results, diagnostics) =
        validate::validate_batch_with_diagnostics(&request.figures, &options, clock);
    let response = ValidationResponse {
        figure_validations: results.into_iter().map(FigureResult::from).collect(),
    };
    Ok((response, diagnostics))
}

/// Run `ConvertMaskToPolygon` on a request.
#[must_use]
pub fn convert_masks(request: &ConversionRequest, config: &ValidationConfig) -> ConversionResponse {
    convert_masks_with_diagnostics(request, config, &WebClock).0
}

/// Like [`convert_masks`], also returning timing diagnostics.
pub fn convert_masks_with_diagnostics<C: Clock + Sync>(
    request: &ConversionRequest,
    config: &ValidationConfig,
    clock: &C,
) -> (ConversionResponse, BatchDiagnostics) {
    let (results, diagnostics) =
        convert::convert_batch_with_diagnostics(&request.figures, config, clock);
    let response = ConversionResponse {
        converted_figures: results.into_iter().map(FigureResult::from).collect(),
    };
    (response, diagnostics)
}
