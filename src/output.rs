//! Result types returned by the report entry points.

use crate::model::{Conflict, MissingInfo, NormalizedData, ReportSections};
use serde::Serialize;

/// Everything a report run produced.
///
/// `markdown` is the deliverable; the remaining fields expose the
/// intermediate data so hosts can audit what the report was built from.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    /// Rendered Markdown document.
    pub markdown: String,
    /// The seven generated sections, as parsed.
    pub sections: ReportSections,
    /// Areas, findings and linked thermal readings after normalization.
    pub normalized: NormalizedData,
    pub conflicts: Vec<Conflict>,
    pub missing: Vec<MissingInfo>,
    pub stats: RunStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Backend identity used for extraction (`mock` in mock mode).
    pub extraction_backend: String,
    /// Backend identity used for report generation.
    pub generation_backend: String,
    /// Characters of inspection text sent for extraction, after filtering.
    pub inspection_chars: usize,
    /// Characters of thermal text sent for extraction.
    pub thermal_chars: usize,
    pub areas: usize,
    pub general_observations: usize,
    pub thermal_readings: usize,
    /// Readings attached to a named area.
    pub linked_readings: usize,
    /// Readings left in the general bucket.
    pub general_thermal_findings: usize,
    pub conflicts: usize,
    pub missing: usize,
    /// Wall-clock time spent in extraction calls.
    pub extraction_duration_ms: u64,
    /// Wall-clock time spent generating the report sections.
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}
