//! Request and response types of the two engine operations.
//!
//! Field names are camelCase on the wire. Every response holds exactly
//! one result per submitted figure, in submission order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, FigureError};
use crate::validate::FigureValidation;

/// Input of `ValidateFigures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Canvas height in pixels.
    pub height: u32,
    /// Canvas width in pixels.
    pub width: u32,
    /// Figures as `{"geometryType": ..., "geometry": ...}` objects.
    pub figures: Vec<Value>,
    /// Skip the canvas containment check for every figure.
    #[serde(default)]
    pub skip_bounds_validation: bool,
}

/// Output of `ValidateFigures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// One entry per request figure.
    pub figure_validations: Vec<FigureResult<FigureValidationData>>,
}

/// Measurements of a valid figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureValidationData {
    /// Area in pixels.
    pub area: f64,
    /// `[top, left, bottom, right]`, inclusive.
    pub geometry_bbox: [i64; 4],
    /// Normalized geometry, `null` unless the stored form must change.
    pub geometry: Option<Value>,
}

impl From<FigureValidation> for FigureValidationData {
    fn from(v: FigureValidation) -> Self {
        Self {
            area: v.area,
            geometry_bbox: v.bbox.to_array(),
            geometry: v.geometry,
        }
    }
}

/// Input of `ConvertMaskToPolygon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Bitmap figures.
    pub figures: Vec<Value>,
}

/// Output of `ConvertMaskToPolygon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    /// One entry per request figure; `data` is the polygon JSON.
    pub converted_figures: Vec<FigureResult<Value>>,
}

/// Outcome of one figure: exactly one of `data` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureResult<T> {
    /// Result payload on success.
    pub data: Option<T>,
    /// Human-readable message on failure.
    pub error: Option<String>,
    /// Category of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> FigureResult<T> {
    /// `true` when the figure succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.data.is_some()
    }
}

impl<T, U: Into<T>> From<Result<U, FigureError>> for FigureResult<T> {
    fn from(result: Result<U, FigureError>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data.into()),
                error: None,
                error_kind: None,
            },
            Err(e) => Self {
                data: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            },
        }
    }
}
