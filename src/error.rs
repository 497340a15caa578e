//! Error types for the ddr-assist library.
//!
//! Three layers reflect three distinct failure surfaces:
//!
//! * [`DdrError`] (**fatal**): the report run cannot proceed (unreadable
//!   input, generation failure, unparseable thermal or report response).
//!   Returned as `Err(DdrError)` from the top-level `diagnose*` functions.
//!   No output file is written when one of these is raised.
//!
//! * [`GenerationError`]: the generation gateway gave up because the backend is
//!   unreachable, returned a non-retryable error, timed out, or kept
//!   rate-limiting past the retry budget. Always wrapped into
//!   [`DdrError::Generation`] by the pipeline.
//!
//! * [`BackendError`]: a single raw backend failure. The gateway's retry
//!   wrapper classifies these as rate-limit-like (retry) or fatal
//!   (propagate as [`GenerationError`]).
//!
//! Inspection-extraction parse failures are deliberately absent: they are
//! recovered locally into an empty-but-valid result. Cache I/O failures are
//! likewise swallowed as misses.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ddr-assist library.
#[derive(Debug, Error)]
pub enum DdrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Report file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was opened but its text could not be extracted.
    #[error("Failed to extract text from '{path}': {detail}")]
    TextExtractionFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library for PDF text extraction.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, install pdfium system-wide,\n\
or pass the reports as plain-text files instead.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Generation errors ─────────────────────────────────────────────────
    /// The generation gateway failed; the run cannot continue.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The thermal extraction response could not be repaired into JSON.
    ///
    /// Thermal data has no safe empty default, so this is always fatal.
    #[error("Failed to parse thermal extraction JSON: {detail}")]
    ExtractionParse { detail: String },

    /// The report response could not be parsed into the seven report sections.
    #[error("Failed to parse diagnostic report JSON: {detail}")]
    ReportGeneration { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures surfaced by the generation gateway.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The configured provider could not be constructed (missing API key etc.).
    #[error("Generation provider '{provider}' is not configured.\n{hint}")]
    NotConfigured { provider: String, hint: String },

    /// The backend returned an error that retrying will not fix.
    #[error("Generation backend '{backend}' failed: {detail}")]
    Backend { backend: String, detail: String },

    /// The backend kept rate-limiting until the retry budget ran out.
    #[error("Generation backend '{backend}' still rate-limited after {attempts} attempts.\nLast error: {last_error}")]
    RetriesExhausted {
        backend: String,
        attempts: u32,
        last_error: String,
    },
}

/// A single raw failure reported by a generation backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The request reached the service but failed (HTTP error, API error).
    #[error("{0}")]
    Request(String),

    /// The service could not be reached at all.
    #[error("could not connect to {endpoint}: {detail}")]
    Unreachable { endpoint: String, detail: String },

    /// The call did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}
