//! Generation backends: the services that actually turn a prompt into text.
//!
//! Every backend implements [`GenerationBackend`]; the gateway never knows
//! which one it holds. Three implementations ship with the crate:
//!
//! | Backend | Service | Identity |
//! |---------|---------|----------|
//! | [`OllamaBackend`] | local Ollama server, `/api/generate` | `ollama:{model}` |
//! | [`LlmProviderBackend`] | any `edgequake_llm` provider (gemini, openai, anthropic, …) | `{provider}:{model}` |
//! | [`MockBackend`] | canned answers, no network | `mock` |
//!
//! The identity string is part of every cache key, so it must be stable for
//! a given backend + model configuration.

use crate::config::PipelineConfig;
use crate::error::{BackendError, GenerationError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The capability the gateway requires of a text-generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, BackendError>;

    /// Stable `{service}:{model}` identity, used as a cache-key component.
    fn identity(&self) -> String;
}

/// Resolve the backend for `model`, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`): used as-is for every model.
/// 2. **Mock mode** (`config.use_mock`): canned answers.
/// 3. **Ollama** (`provider_name == "ollama"`): direct HTTP to
///    `config.ollama_base_url`.
/// 4. **Any other provider name**: [`ProviderFactory::create_llm_provider`],
///    which reads the matching API key (`GEMINI_API_KEY`, `OPENAI_API_KEY`, …)
///    from the environment.
pub fn resolve_backend(
    config: &PipelineConfig,
    model: &str,
) -> Result<Arc<dyn GenerationBackend>, GenerationError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if config.use_mock {
        return Ok(Arc::new(MockBackend));
    }

    let provider = config.provider_name.trim().to_lowercase();
    if provider == "ollama" {
        let backend = OllamaBackend::new(&config.ollama_base_url, model, config.request_timeout())?;
        return Ok(Arc::new(backend));
    }

    Ok(Arc::new(LlmProviderBackend::from_factory(&provider, model)?))
}

// ── Ollama ───────────────────────────────────────────────────────────────

/// Local Ollama server, called through its non-streaming generate endpoint.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured {
                provider: "ollama".to_string(),
                hint: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        debug!("POST {} (model {}, {} prompt chars)", url, self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout {
                        secs: self.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    BackendError::Unreachable {
                        endpoint: self.base_url.clone(),
                        detail: format!(
                            "{e}\nMake sure Ollama is running and the model is installed: ollama pull {}",
                            self.model
                        ),
                    }
                } else {
                    BackendError::Request(format!("Ollama request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Request(format!(
                "Ollama returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Request(format!("Unexpected Ollama response body: {e}")))?;

        Ok(parsed.response)
    }

    fn identity(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Adapter from an `edgequake_llm` chat provider to [`GenerationBackend`].
pub struct LlmProviderBackend {
    provider: Arc<dyn LLMProvider>,
    identity: String,
}

impl LlmProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, identity: impl Into<String>) -> Self {
        Self {
            provider,
            identity: identity.into(),
        }
    }

    /// Instantiate a named provider with the given model.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, GenerationError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            GenerationError::NotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}:{model}")))
    }
}

#[async_trait]
impl GenerationBackend for LlmProviderBackend {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, BackendError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = CompletionOptions {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Request(format!("{e}")))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.identity, response.prompt_tokens, response.completion_tokens
        );

        Ok(response.content)
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}

// ── Mock ─────────────────────────────────────────────────────────────────

const MOCK_REPORT: &str = r#"{
  "property_summary": "Dampness observed in Hall.",
  "area_observations": "Hall shows dampness at skirting level.",
  "root_cause": "Possible water ingress at skirting level.",
  "severity": "Moderate due to visible dampness.",
  "recommendations": "Inspect waterproofing and repair affected area.",
  "additional_notes": "Based strictly on provided structured data.",
  "missing_info": "Not Available"
}"#;

const MOCK_THERMAL: &str = r#"{
  "thermal_readings": [
    {
      "image_id": "Image_1",
      "hotspot": "32.5°C",
      "coldspot": "24.1°C"
    }
  ]
}"#;

const MOCK_INSPECTION: &str = r#"{
  "areas": [
    {
      "area_name": "Hall",
      "negative_findings": ["Observed dampness at skirting level"],
      "positive_findings": []
    }
  ],
  "general_observations": []
}"#;

/// Offline backend answering from canned responses.
///
/// The answer is chosen by the JSON keys the prompt asks for. The report
/// prompt is checked first because it embeds the normalized data, which
/// itself contains a `"thermal_readings"` key.
pub struct MockBackend;

impl MockBackend {
    pub fn respond(prompt: &str) -> &'static str {
        if prompt.contains("\"property_summary\"") {
            MOCK_REPORT
        } else if prompt.contains("\"thermal_readings\"") {
            MOCK_THERMAL
        } else if prompt.contains("\"areas\"") && prompt.contains("\"general_observations\"") {
            MOCK_INSPECTION
        } else {
            "{}"
        }
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<String, BackendError> {
        Ok(Self::respond(prompt).to_string())
    }

    fn identity(&self) -> String {
        "mock".to_string()
    }
}
