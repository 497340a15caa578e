//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages. The CLI uses this to drive
//! its spinner; a host application can forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use ddr_assist::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         eprintln!("{stage}: {detail}");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The stages of a report run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Read both source documents to plain text.
    ReadInputs,
    /// Extract impacted areas from the inspection report.
    ExtractInspection,
    /// Extract temperature readings from the thermal report.
    ExtractThermal,
    /// Normalize, deduplicate and link areas with thermal readings.
    Normalize,
    /// Run the conflict and missing-data checks.
    Analyze,
    /// Generate the report sections.
    GenerateReport,
    /// Render the final Markdown.
    Render,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::ReadInputs,
        Stage::ExtractInspection,
        Stage::ExtractThermal,
        Stage::Normalize,
        Stage::Analyze,
        Stage::GenerateReport,
        Stage::Render,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::ReadInputs => "Reading reports",
            Stage::ExtractInspection => "Extracting inspection data",
            Stage::ExtractThermal => "Extracting thermal readings",
            Stage::Normalize => "Normalizing areas",
            Stage::Analyze => "Checking conflicts and gaps",
            Stage::GenerateReport => "Generating report",
            Stage::Render => "Rendering Markdown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as it moves through each [`Stage`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run sequentially, so events never overlap.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first stage.
    ///
    /// # Arguments
    /// * `total_stages`: number of stages the run will go through
    fn on_run_start(&self, total_stages: usize) {
        let _ = total_stages;
    }

    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    ///
    /// # Arguments
    /// * `stage`: the stage that finished
    /// * `detail`: short human-readable summary (e.g. "3 areas")
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called once after the last stage succeeded.
    fn on_run_complete(&self) {}
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
