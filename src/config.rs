//! Configuration types for a diagnostic report run.
//!
//! Every knob the pipeline consumes lives in [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The config is passed explicitly into the
//! gateway and extractors at construction, so two runs with different
//! settings can coexist in one process (and in one test binary).

use crate::error::DdrError;
use crate::gateway::GenerationBackend;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a diagnostic report run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use ddr_assist::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .provider_name("gemini")
///     .generation_model("gemini-2.0-flash")
///     .cache_enabled(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Generation provider name: "ollama" (direct HTTP) or any provider
    /// understood by `edgequake_llm::ProviderFactory` ("gemini", "openai",
    /// "anthropic", …). Default: "ollama".
    pub provider_name: String,

    /// Model used by the inspection and thermal extractors. Default: "llama3.2".
    pub extraction_model: String,

    /// Model used by the report builder. Default: "llama3.2".
    pub generation_model: String,

    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub ollama_base_url: String,

    /// Pre-constructed backend. Takes precedence over `provider_name` and
    /// is shared by extraction and report generation.
    pub backend: Option<Arc<dyn GenerationBackend>>,

    /// Sampling temperature for the extractors. Default: 0.0.
    ///
    /// Extraction must copy facts, not paraphrase them.
    pub extraction_temperature: f32,

    /// Sampling temperature for the report builder. Default: 0.0.
    pub generation_temperature: f32,

    /// Maximum tokens the backend may generate per call. Default: 8192.
    pub max_output_tokens: usize,

    /// Backoff policy for rate-limited backend calls.
    pub retry: RetryPolicy,

    /// Answer every prompt from canned responses instead of a backend.
    /// Default: false.
    pub use_mock: bool,

    /// Consult and fill the on-disk response cache. Default: false.
    pub cache_enabled: bool,

    /// Directory holding cached responses. Default: `data/cache`.
    pub cache_dir: PathBuf,

    /// Input text is truncated to this many characters before prompting.
    /// Default: 20 000.
    pub max_input_chars: usize,

    /// Per-backend-call timeout in seconds. Default: 300.
    ///
    /// Local models on CPU can take minutes for a long extraction prompt.
    pub request_timeout_secs: u64,

    /// Keep only keyword-bearing lines of the inspection text before
    /// extraction. Default: true.
    pub filter_sections: bool,

    /// Optional progress callback for per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider_name: "ollama".to_string(),
            extraction_model: "llama3.2".to_string(),
            generation_model: "llama3.2".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            backend: None,
            extraction_temperature: 0.0,
            generation_temperature: 0.0,
            max_output_tokens: 8192,
            retry: RetryPolicy::default(),
            use_mock: false,
            cache_enabled: false,
            cache_dir: PathBuf::from("data/cache"),
            max_input_chars: 20_000,
            request_timeout_secs: 300,
            filter_sections: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("provider_name", &self.provider_name)
            .field("extraction_model", &self.extraction_model)
            .field("generation_model", &self.generation_model)
            .field("ollama_base_url", &self.ollama_base_url)
            .field(
                "backend",
                &self.backend.as_ref().map(|_| "<dyn GenerationBackend>"),
            )
            .field("extraction_temperature", &self.extraction_temperature)
            .field("generation_temperature", &self.generation_temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("retry", &self.retry)
            .field("use_mock", &self.use_mock)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_dir", &self.cache_dir)
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("filter_sections", &self.filter_sections)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Per-call timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    /// Use the same model for extraction and report generation.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.config.extraction_model = model.clone();
        self.config.generation_model = model;
        self
    }

    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.config.extraction_model = model.into();
        self
    }

    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    pub fn ollama_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn extraction_temperature(mut self, t: f32) -> Self {
        self.config.extraction_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn generation_temperature(mut self, t: f32) -> Self {
        self.config.generation_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.retry.max_retries = n;
        self
    }

    pub fn use_mock(mut self, v: bool) -> Self {
        self.config.use_mock = v;
        self
    }

    pub fn cache_enabled(mut self, v: bool) -> Self {
        self.config.cache_enabled = v;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn filter_sections(mut self, v: bool) -> Self {
        self.config.filter_sections = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DdrError> {
        let c = &self.config;
        if c.max_input_chars == 0 {
            return Err(DdrError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(DdrError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(DdrError::InvalidConfig(
                "request_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !c.use_mock && c.backend.is_none() && c.provider_name.trim().is_empty() {
            return Err(DdrError::InvalidConfig(
                "a provider name is required unless mock mode or a pre-built backend is used"
                    .into(),
            ));
        }
        c.retry.validate()?;
        Ok(self.config)
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────

/// Exponential backoff for rate-limited backend calls.
///
/// With the defaults the wait sequence is 1 s → 2 s → 4 s, each capped at
/// `max_delay_ms`. A wait time suggested by the server in the error message
/// replaces the computed delay for that attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 3 (so at most 4 calls).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds. Default: 1000.
    pub initial_delay_ms: u64,
    /// Upper bound for any computed delay, in milliseconds. Default: 60 000.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays. Default: 2.0.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Computed backoff before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry as i32);
        let ms = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(ms as u64)
    }

    fn validate(&self) -> Result<(), DdrError> {
        if self.backoff_multiplier < 1.0 {
            return Err(DdrError::InvalidConfig(format!(
                "backoff multiplier must be ≥ 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(DdrError::InvalidConfig(format!(
                "initial retry delay ({}ms) exceeds the maximum delay ({}ms)",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}
