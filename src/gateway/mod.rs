//! Generation gateway: the single entry point for "prompt in, text out".
//!
//! ## Modes
//!
//! | Mode | Backend | Cache | Retry |
//! |------|---------|-------|-------|
//! | [`GatewayMode::Mock`] | canned answers | no | no |
//! | [`GatewayMode::Live`] | resolved backend | no | yes |
//! | [`GatewayMode::CachedLive`] | resolved backend | yes | yes |
//!
//! In the cached mode a hit returns without calling the backend; a miss
//! calls through the retry wrapper and stores the result. Each backend call
//! is bounded by the configured request timeout.

pub mod backend;
pub mod cache;
pub mod retry;

pub use backend::{resolve_backend, GenerationBackend, LlmProviderBackend, MockBackend, OllamaBackend};
pub use cache::{cache_key, CacheEntry, CacheStore, FileCache};
pub use retry::{classify, with_backoff, FailureClass};

use crate::config::{PipelineConfig, RetryPolicy};
use crate::error::{BackendError, GenerationError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Mock,
    Live,
    CachedLive,
}

/// Routes prompts to a backend, applying cache, retry and timeout.
#[derive(Clone)]
pub struct GenerationGateway {
    backend: Arc<dyn GenerationBackend>,
    cache: Option<Arc<dyn CacheStore>>,
    mode: GatewayMode,
    retry: RetryPolicy,
    max_tokens: usize,
    timeout: Duration,
}

impl std::fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationGateway")
            .field("backend", &self.backend.identity())
            .field("mode", &self.mode)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationGateway {
    /// A live gateway over `backend` without caching.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        retry: RetryPolicy,
        max_tokens: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            cache: None,
            mode: GatewayMode::Live,
            retry,
            max_tokens,
            timeout,
        }
    }

    /// An offline gateway answering from [`MockBackend`].
    pub fn mock() -> Self {
        Self {
            mode: GatewayMode::Mock,
            ..Self::new(
                Arc::new(MockBackend),
                RetryPolicy::default(),
                0,
                Duration::from_secs(1),
            )
        }
    }

    /// Attach a cache. Has no effect in mock mode.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        if self.mode != GatewayMode::Mock {
            self.cache = Some(cache);
            self.mode = GatewayMode::CachedLive;
        }
        self
    }

    /// Build the gateway for `model` from pipeline configuration.
    pub fn from_config(config: &PipelineConfig, model: &str) -> Result<Self, GenerationError> {
        if config.use_mock && config.backend.is_none() {
            return Ok(Self::mock());
        }

        let backend = resolve_backend(config, model)?;
        let gateway = Self::new(
            backend,
            config.retry.clone(),
            config.max_output_tokens,
            config.request_timeout(),
        );

        if config.cache_enabled {
            Ok(gateway.with_cache(Arc::new(FileCache::new(&config.cache_dir))))
        } else {
            Ok(gateway)
        }
    }

    pub fn mode(&self) -> GatewayMode {
        self.mode
    }

    pub fn identity(&self) -> String {
        self.backend.identity()
    }

    /// Generate text for `prompt` at `temperature`.
    pub async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        match (self.mode, &self.cache) {
            (GatewayMode::Mock, _) => self
                .backend
                .generate(prompt, temperature, self.max_tokens)
                .await
                .map_err(|e| GenerationError::Backend {
                    backend: self.identity(),
                    detail: e.to_string(),
                }),
            (GatewayMode::CachedLive, Some(cache)) => {
                let identity = self.identity();
                let key = cache_key(&identity, temperature, prompt);
                if let Some(hit) = cache.get(&key) {
                    return Ok(hit);
                }
                let response = self.call_with_retry(prompt, temperature).await?;
                cache.set(&key, &CacheEntry::new(prompt, &identity, temperature, &response));
                Ok(response)
            }
            _ => self.call_with_retry(prompt, temperature).await,
        }
    }

    async fn call_with_retry(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let backend = &self.backend;
        let max_tokens = self.max_tokens;
        let timeout = self.timeout;

        debug!("{}: generating ({} prompt chars)", backend.identity(), prompt.len());

        with_backoff(
            &self.retry,
            &backend.identity(),
            move |_attempt| async move {
                match tokio::time::timeout(timeout, backend.generate(prompt, temperature, max_tokens)).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::Timeout {
                        secs: timeout.as_secs(),
                    }),
                }
            },
            tokio::time::sleep,
        )
        .await
    }
}
