//! Batch diagnostics: per-figure timing and outcome counts.
//!
//! Every batch call collects diagnostics alongside its results; callers
//! that do not need them drop them.
//!
//! Figure timings are taken from a [`Clock`]. The default [`WebClock`]
//! reads `web_time::Instant`, so the engine times figures the same way
//! in a browser worker as on a server. In JSON every duration is a
//! number of seconds.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// `#[serde(with)]` adapter writing a `Duration` as seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration {seconds}: {e}")))
    }
}

/// Diagnostics for one figure of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureDiagnostics {
    /// Position of the figure in the request.
    pub index: usize,
    /// Shape tag as submitted, if any.
    pub shape: Option<String>,
    /// Wall-clock processing time (seconds).
    #[serde(with = "seconds")]
    pub duration: Duration,
    /// `None` on success, otherwise the category of the failure.
    pub error: Option<ErrorKind>,
}

/// Diagnostics collected from one batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDiagnostics {
    /// One entry per figure, in request order.
    pub figures: Vec<FigureDiagnostics>,
    /// Total wall-clock duration of the batch (seconds).
    #[serde(with = "seconds")]
    pub total_duration: Duration,
    /// Whether figures were processed on the rayon thread pool.
    pub parallel: bool,
    /// Summary counts.
    pub summary: BatchSummary,
}

/// Summary counts across a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Figures processed.
    pub figure_count: usize,
    /// Figures that succeeded.
    pub ok_count: usize,
    /// Figures that failed.
    pub failed_count: usize,
    /// Failures per error category.
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,
}

impl BatchDiagnostics {
    /// Assemble diagnostics from per-figure entries.
    #[must_use]
    pub fn new(figures: Vec<FigureDiagnostics>, total_duration: Duration, parallel: bool) -> Self {
        let mut errors_by_kind = BTreeMap::new();
        for kind in figures.iter().filter_map(|f| f.error) {
            *errors_by_kind.entry(kind).or_insert(0) += 1;
        }
        let failed_count = errors_by_kind.values().sum();
        let summary = BatchSummary {
            figure_count: figures.len(),
            ok_count: figures.len() - failed_count,
            failed_count,
            errors_by_kind,
        };
        Self {
            figures,
            total_duration,
            parallel,
            summary,
        }
    }

    /// The slowest figure, if any.
    #[must_use]
    pub fn slowest(&self) -> Option<&FigureDiagnostics> {
        self.figures.iter().max_by_key(|f| f.duration)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Batch Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Figures: {} ({} ok, {} failed) | {}",
            self.summary.figure_count,
            self.summary.ok_count,
            self.summary.failed_count,
            if self.parallel { "parallel" } else { "sequential" },
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));

        if !self.summary.errors_by_kind.is_empty() {
            lines.push(String::new());
            lines.push(format!("{:<24} {:>8}", "Error kind", "Count"));
            lines.push("-".repeat(40));
            for (kind, count) in &self.summary.errors_by_kind {
                lines.push(format!("{:<24} {count:>8}", format!("{kind:?}")));
            }
        }

        if let Some(slowest) = self.slowest() {
            lines.push(String::new());
            lines.push(format!(
                "Slowest figure: #{} ({}) {:.3}ms",
                slowest.index,
                slowest.shape.as_deref().unwrap_or("?"),
                duration_ms(slowest.duration),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
pub(crate) fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
