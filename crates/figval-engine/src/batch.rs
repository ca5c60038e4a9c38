//! Per-figure fan-out shared by validation and conversion.
//!
//! Each figure is processed independently and its error is kept with it:
//! one bad figure never affects another. Large batches are spread over
//! the rayon thread pool; `collect` on an indexed parallel iterator keeps
//! results in request order.

use rayon::prelude::*;
use serde_json::Value;

use crate::diagnostics::{BatchDiagnostics, Clock, FigureDiagnostics, duration_ms};
use crate::error::FigureError;
use crate::types::ValidationConfig;

/// Key holding the shape tag of a submitted figure.
pub const GEOMETRY_TYPE: &str = "geometryType";

/// Run `op` on every figure, returning one result per figure in input
/// order together with timing diagnostics.
pub fn run<T, F, C>(
    figures: &[Value],
    config: &ValidationConfig,
    clock: &C,
    op: F,
) -> (Vec<Result<T, FigureError>>, BatchDiagnostics)
where
    T: Send,
    F: Fn(&Value) -> Result<T, FigureError> + Sync,
    C: Clock + Sync,
{
    let started = clock.now();
    let parallel = figures.len() >= config.parallel_threshold;

    let timed = |(index, figure): (usize, &Value)| {
        let figure_started = clock.now();
        let result = op(figure);
        let duration = clock.elapsed(&figure_started);
        match &result {
            Ok(_) => log::debug!("figure {index} done in {:.3}ms", duration_ms(duration)),
            Err(e) => log::debug!(
                "figure {index} failed in {:.3}ms: {e}",
                duration_ms(duration)
            ),
        }
        let diagnostics = FigureDiagnostics {
            index,
            shape: figure
                .get(GEOMETRY_TYPE)
                .and_then(Value::as_str)
                .map(str::to_string),
            duration,
            error: result.as_ref().err().map(FigureError::kind),
        };
        (result, diagnostics)
    };

    let outcomes: Vec<_> = if parallel {
        figures.par_iter().enumerate().map(timed).collect()
    } else {
        figures.iter().enumerate().map(timed).collect()
    };
    let (results, figure_diagnostics): (Vec<_>, Vec<_>) = outcomes.into_iter().unzip();

    let diagnostics =
        BatchDiagnostics::new(figure_diagnostics, clock.elapsed(&started), parallel);
    log::info!(
        "processed {} figures ({} ok, {} failed) in {:.3}ms",
        diagnostics.summary.figure_count,
        diagnostics.summary.ok_count,
        diagnostics.summary.failed_count,
        duration_ms(diagnostics.total_duration),
    );
    (results, diagnostics)
}
