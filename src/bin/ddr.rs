//! CLI binary for ddr-assist.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use ddr_assist::{
    diagnose, diagnose_to_file, FileCache, PipelineConfig, PipelineProgressCallback,
    ProgressCallback, RetryPolicy, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner for the running stage plus a log line per
/// finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_stages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building diagnostic report ({total_stages} stages)…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut started) = self.stage_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix(stage.label());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let elapsed_ms = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} {:<30} {:<28} {}",
            green("✓"),
            stage.label(),
            dim(detail),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_run_complete(&self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Local Ollama (default provider), report to stdout
  ddr inspection.pdf thermal.pdf

  # Write to a file, cache responses between runs
  ddr inspection.pdf thermal.pdf -o ddr.md --cache

  # Hosted model through edgequake-llm
  ddr --provider gemini --extraction-model gemini-2.0-flash \
      --generation-model gemini-2.0-flash inspection.pdf thermal.pdf

  # Offline dry run with canned responses
  ddr --mock inspection.txt thermal.txt

  # Full structured output (sections, normalized data, conflicts, stats)
  ddr --json inspection.pdf thermal.pdf > ddr.json

  # Drop every cached response
  ddr --clear-cache

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (--provider gemini)
  OPENAI_API_KEY          OpenAI API key (--provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (--provider anthropic)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF input
  RUST_LOG                Override the log filter

INPUTS:
  PDF files are read through their text layer (pdfium). Scanned PDFs without
  a text layer yield no text; pass a .txt export instead.
"#;

/// Generate a Detailed Diagnostic Report from inspection and thermal reports.
#[derive(Parser, Debug)]
#[command(
    name = "ddr",
    version,
    about = "Generate a Detailed Diagnostic Report from inspection and thermal reports",
    long_about = "Reads a property inspection report and a thermal imaging report (PDF or text), \
extracts impacted areas and temperature readings with a language model, checks them for \
conflicts and gaps, and writes a seven-section Markdown report. Supports a local Ollama \
server and any provider available through edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Inspection report (PDF or text).
    #[arg(required_unless_present = "clear_cache")]
    inspection: Option<PathBuf>,

    /// Thermal report (PDF or text).
    #[arg(required_unless_present = "clear_cache")]
    thermal: Option<PathBuf>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "DDR_OUTPUT")]
    output: Option<PathBuf>,

    /// Generation provider: ollama, gemini, openai, anthropic, …
    #[arg(long, env = "DDR_PROVIDER", default_value = "ollama")]
    provider: String,

    /// Model used for structured extraction.
    #[arg(long, env = "DDR_EXTRACTION_MODEL", default_value = "llama3.2")]
    extraction_model: String,

    /// Model used to write the report.
    #[arg(long, env = "DDR_GENERATION_MODEL", default_value = "llama3.2")]
    generation_model: String,

    /// Ollama server base URL.
    #[arg(long, env = "OLLAMA_BASE_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Use canned responses instead of a real backend.
    #[arg(long, env = "DDR_MOCK")]
    mock: bool,

    /// Cache backend responses on disk.
    #[arg(long, env = "DDR_CACHE")]
    cache: bool,

    /// Cache directory.
    #[arg(long, env = "DDR_CACHE_DIR", default_value = "data/cache")]
    cache_dir: PathBuf,

    /// Delete every cached response before running (or on its own).
    #[arg(long)]
    clear_cache: bool,

    /// Retries on rate-limit errors.
    #[arg(long, env = "DDR_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// First retry delay in milliseconds.
    #[arg(long, env = "DDR_RETRY_INITIAL_MS", default_value_t = 1_000)]
    retry_initial_ms: u64,

    /// Maximum retry delay in milliseconds.
    #[arg(long, env = "DDR_RETRY_MAX_MS", default_value_t = 60_000)]
    retry_max_ms: u64,

    /// Max output tokens per generation call.
    #[arg(long, env = "DDR_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Characters of report text sent for extraction.
    #[arg(long, env = "DDR_MAX_INPUT_CHARS", default_value_t = 20_000)]
    max_input_chars: usize,

    /// Per-call backend timeout in seconds.
    #[arg(long, env = "DDR_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Send the whole inspection text instead of keyword-matching lines.
    #[arg(long, env = "DDR_NO_FILTER")]
    no_filter: bool,

    /// Output structured JSON (DiagnosticReport) instead of Markdown.
    #[arg(long, env = "DDR_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DDR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DDR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DDR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level logs when active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Cache maintenance ────────────────────────────────────────────────
    if cli.clear_cache {
        let removed = FileCache::new(&cli.cache_dir)
            .clear()
            .with_context(|| format!("Failed to clear cache at {}", cli.cache_dir.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} Removed {} cached responses from {}",
                green("✔"),
                removed,
                cli.cache_dir.display()
            );
        }
    }

    let (Some(inspection), Some(thermal)) = (cli.inspection.clone(), cli.thermal.clone()) else {
        return Ok(());
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = diagnose_to_file(&inspection, &thermal, output_path, &config)
            .await
            .context("Report generation failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} areas  {} conflicts  {} gaps  {}ms  →  {}",
                green("✔"),
                stats.areas,
                stats.conflicts,
                stats.missing,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let report = diagnose(&inspection, &thermal, &config)
            .await
            .context("Report generation failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(report.markdown.as_bytes())
                .context("Failed to write to stdout")?;
            handle.write_all(b"\n").ok();
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} areas  {} readings ({} linked)  {} conflicts  {} gaps  {}ms",
                dim("—"),
                report.stats.areas,
                report.stats.thermal_readings,
                report.stats.linked_readings,
                report.stats.conflicts,
                report.stats.missing,
                report.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let retry = RetryPolicy {
        max_retries: cli.max_retries,
        initial_delay_ms: cli.retry_initial_ms,
        max_delay_ms: cli.retry_max_ms,
        ..RetryPolicy::default()
    };

    let mut builder = PipelineConfig::builder()
        .provider_name(&cli.provider)
        .extraction_model(&cli.extraction_model)
        .generation_model(&cli.generation_model)
        .ollama_base_url(&cli.ollama_url)
        .use_mock(cli.mock)
        .cache_enabled(cli.cache)
        .cache_dir(&cli.cache_dir)
        .retry(retry)
        .max_output_tokens(cli.max_tokens)
        .max_input_chars(cli.max_input_chars)
        .request_timeout_secs(cli.timeout)
        .filter_sections(!cli.no_filter);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
