//! # ddr-assist
//!
//! Turn a property inspection report and a thermal imaging report into a
//! Detailed Diagnostic Report (DDR) in Markdown.
//!
//! ## Why this crate?
//!
//! Inspection reports are long, repetitive and written for the inspector,
//! not the owner. Thermal reports list raw temperatures per image. This crate
//! uses a language model only where judgement on free text is needed
//! (extraction and final wording) and keeps every decision in between
//! deterministic: normalization, deduplication, thermal linking, conflict
//! detection and gap detection are plain Rust and fully unit-tested.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inspection.pdf   thermal.pdf
//!      │                │
//!      ├─ 1. Read     PDF text layer (pdfium) or plain text
//!      ├─ 2. Clean    whitespace rules + keyword line filter
//!      ├─ 3. Extract  LLM → JSON (repaired) → areas / readings
//!      ├─ 4. Merge    normalize → deduplicate → link thermal readings
//!      ├─ 5. Check    lexical conflicts + missing data
//!      ├─ 6. Report   LLM → seven sections
//!      └─ 7. Render   Markdown
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddr_assist::{diagnose, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Local Ollama by default; .provider_name("gemini") etc. for hosted models
//!     let config = PipelineConfig::builder().cache_enabled(true).build()?;
//!     let report = diagnose("inspection.pdf", "thermal.pdf", &config).await?;
//!     println!("{}", report.markdown);
//!     for conflict in &report.conflicts {
//!         eprintln!("{conflict}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | Provider | Selected by | Credentials |
//! |----------|-------------|-------------|
//! | Ollama (default) | `provider_name("ollama")` | none, local server |
//! | Any `edgequake-llm` provider | `provider_name("gemini" / "openai" / …)` | provider API key env var |
//! | Mock | `use_mock(true)` | none, canned answers |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ddr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod diagnose;
pub mod error;
pub mod gateway;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, RetryPolicy};
pub use diagnose::{diagnose, diagnose_sync, diagnose_texts, diagnose_to_file};
pub use error::{BackendError, DdrError, GenerationError};
pub use gateway::{FileCache, GatewayMode, GenerationBackend, GenerationGateway};
pub use model::{
    Area, Conflict, ConflictKind, ExtractionResult, MissingInfo, NormalizedArea, NormalizedData,
    ReportSections, ThermalReading,
};
pub use output::{DiagnosticReport, RunStats};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
