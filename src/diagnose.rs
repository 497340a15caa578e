//! Report entry points: two documents in, one diagnostic report out.
//!
//! Stages run strictly one after another. The extractors are independent
//! but are still awaited in sequence, so a run makes at most three
//! generation calls and never more than one at a time.

use crate::config::PipelineConfig;
use crate::error::DdrError;
use crate::gateway::GenerationGateway;
use crate::output::{DiagnosticReport, RunStats};
use crate::pipeline::extract::{InspectionExtractor, ThermalExtractor};
use crate::pipeline::report::ReportBuilder;
use crate::pipeline::{conflicts, dedup, input, link, missing, normalize, preprocess, render};
use crate::progress::Stage;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate a diagnostic report from an inspection and a thermal report.
///
/// Each path may point at a PDF (text layer via pdfium) or a plain-text
/// file.
///
/// # Errors
/// Any failure is fatal: unreadable input, a generation failure, an
/// unparseable thermal response or an unparseable report response. An
/// unparseable *inspection* response is not an error; the run continues
/// with no areas.
pub async fn diagnose(
    inspection_path: impl AsRef<Path>,
    thermal_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<DiagnosticReport, DdrError> {
    let start = Instant::now();
    let inspection_path = inspection_path.as_ref();
    let thermal_path = thermal_path.as_ref();
    info!(
        "Starting report: inspection={} thermal={}",
        inspection_path.display(),
        thermal_path.display()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(Stage::ALL.len());
        cb.on_stage_start(Stage::ReadInputs);
    }

    // ── Step 1: Read both documents ──────────────────────────────────────
    let inspection_text = input::extract_text(inspection_path).await?;
    let thermal_text = input::extract_text(thermal_path).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(
            Stage::ReadInputs,
            &format!(
                "{} + {} chars",
                inspection_text.chars().count(),
                thermal_text.chars().count()
            ),
        );
    }

    run(&inspection_text, &thermal_text, config, start).await
}

/// Generate a report from already-extracted document text.
///
/// Skips [`Stage::ReadInputs`]; everything else matches [`diagnose`].
pub async fn diagnose_texts(
    inspection_text: &str,
    thermal_text: &str,
    config: &PipelineConfig,
) -> Result<DiagnosticReport, DdrError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(Stage::ALL.len() - 1);
    }
    run(inspection_text, thermal_text, config, Instant::now()).await
}

/// Generate a report and write its Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename), so a failed run never leaves a
/// partial file behind.
pub async fn diagnose_to_file(
    inspection_path: impl AsRef<Path>,
    thermal_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunStats, DdrError> {
    let report = diagnose(inspection_path, thermal_path, config).await?;
    write_markdown(output_path.as_ref(), &report.markdown).await?;
    Ok(report.stats)
}

/// Synchronous wrapper around [`diagnose`].
///
/// Creates a temporary tokio runtime internally.
pub fn diagnose_sync(
    inspection_path: impl AsRef<Path>,
    thermal_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<DiagnosticReport, DdrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DdrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(diagnose(inspection_path, thermal_path, config))
}

/// Write `markdown` to `path` through a sibling temp file.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), DdrError> {
    let write_err = |e| DdrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Report written to {}", path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    inspection_raw: &str,
    thermal_raw: &str,
    config: &PipelineConfig,
    start: Instant,
) -> Result<DiagnosticReport, DdrError> {
    let progress = config.progress_callback.as_ref();

    // ── Step 2: Clean and filter ─────────────────────────────────────────
    let mut inspection_text = preprocess::clean_text(inspection_raw);
    if config.filter_sections {
        let filtered = preprocess::extract_relevant_sections(&inspection_text);
        if filtered.is_empty() && !inspection_text.is_empty() {
            warn!("Section filter removed every inspection line; no keywords matched");
        }
        inspection_text = filtered;
    }
    let thermal_text = preprocess::clean_text(thermal_raw);
    debug!(
        "Prepared {} inspection chars, {} thermal chars",
        inspection_text.chars().count(),
        thermal_text.chars().count()
    );

    // ── Step 3: Build gateways ───────────────────────────────────────────
    let extraction_gateway = Arc::new(GenerationGateway::from_config(
        config,
        &config.extraction_model,
    )?);
    let generation_gateway = Arc::new(GenerationGateway::from_config(
        config,
        &config.generation_model,
    )?);
    info!(
        "Extraction via {} ({:?}), generation via {}",
        extraction_gateway.identity(),
        extraction_gateway.mode(),
        generation_gateway.identity()
    );

    // ── Step 4: Extract ──────────────────────────────────────────────────
    let extraction_start = Instant::now();

    if let Some(cb) = progress {
        cb.on_stage_start(Stage::ExtractInspection);
    }
    let inspection = InspectionExtractor::new(
        Arc::clone(&extraction_gateway),
        config.extraction_temperature,
        config.max_input_chars,
    )
    .extract(&inspection_text)
    .await?;
    if let Some(cb) = progress {
        cb.on_stage_complete(
            Stage::ExtractInspection,
            &format!("{} areas", inspection.areas().len()),
        );
        cb.on_stage_start(Stage::ExtractThermal);
    }

    let thermal = ThermalExtractor::new(
        Arc::clone(&extraction_gateway),
        config.extraction_temperature,
        config.max_input_chars,
    )
    .extract(&thermal_text)
    .await?;
    if let Some(cb) = progress {
        cb.on_stage_complete(
            Stage::ExtractThermal,
            &format!("{} readings", thermal.thermal_readings().len()),
        );
    }
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 5: Normalize, deduplicate, link ─────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Normalize);
    }
    let normalized = normalize::normalize(&inspection, &thermal);
    let normalized = dedup::deduplicate(normalized);
    let normalized = link::link(normalized);
    let linked_readings = normalized.linked_reading_count() - normalized.general_thermal_findings.len();
    if let Some(cb) = progress {
        cb.on_stage_complete(
            Stage::Normalize,
            &format!("{} areas, {} linked readings", normalized.areas.len(), linked_readings),
        );
    }

    // ── Step 6: Conflicts and gaps ───────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Analyze);
    }
    let conflicts = conflicts::detect_conflicts(&normalized);
    let missing = missing::detect_missing(&normalized);
    for conflict in &conflicts {
        warn!("{}", conflict);
    }
    if let Some(cb) = progress {
        cb.on_stage_complete(
            Stage::Analyze,
            &format!("{} conflicts, {} gaps", conflicts.len(), missing.len()),
        );
    }

    // ── Step 7: Generate report sections ─────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::GenerateReport);
    }
    let generation_start = Instant::now();
    let sections = ReportBuilder::new(Arc::clone(&generation_gateway), config.generation_temperature)
        .build(&normalized, &conflicts, &missing)
        .await?;
    let generation_duration_ms = generation_start.elapsed().as_millis() as u64;
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::GenerateReport, "7 sections");
    }

    // ── Step 8: Render ───────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Render);
    }
    let markdown = render::render_markdown(&sections, Local::now().naive_local());
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Render, &format!("{} chars", markdown.len()));
        cb.on_run_complete();
    }

    let stats = RunStats {
        extraction_backend: extraction_gateway.identity(),
        generation_backend: generation_gateway.identity(),
        inspection_chars: inspection_text.chars().count(),
        thermal_chars: thermal_text.chars().count(),
        areas: normalized.areas.len(),
        general_observations: inspection.general_observations().len(),
        thermal_readings: normalized.thermal_readings.len(),
        linked_readings,
        general_thermal_findings: normalized.general_thermal_findings.len(),
        conflicts: conflicts.len(),
        missing: missing.len(),
        extraction_duration_ms,
        generation_duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Report complete: {} areas, {} conflicts, {} gaps, {}ms total",
        stats.areas, stats.conflicts, stats.missing, stats.total_duration_ms
    );

    Ok(DiagnosticReport {
        markdown,
        sections,
        normalized,
        conflicts,
        missing,
        stats,
    })
}
