//! Builder for configuring gateway instances

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::Gateway;
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::{GatewayConfig, ProviderKind};
use crate::providers::gate::{ConcurrencyGate, DEFAULT_MAX_CONCURRENT};
use crate::providers::retry::RetryConfig;
use crate::providers::{
    GeminiAuth, GeminiProvider, GenerateProvider, OpenAiProvider, StubProvider, TokenSource,
};
use crate::usage::{PriceTable, UsageAccumulator};
use crate::{GatewayError, Result};

/// Main entry point for creating gateway instances.
pub struct Munin;

impl Munin {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> MuninBuilder {
        MuninBuilder::new()
    }

    /// Build a gateway from the process environment (see
    /// [`GatewayConfig::from_env()`]).
    pub fn from_env() -> Result<Gateway> {
        MuninBuilder::from_config(GatewayConfig::from_env()?).build()
    }
}

/// Builder for configuring gateway instances.
pub struct MuninBuilder {
    provider: Option<ProviderKind>,
    gemini_key: Option<String>,
    gemini_token_source: Option<Arc<dyn TokenSource>>,
    gemini_base_url: Option<String>,
    openai_key: Option<String>,
    openai_base_url: Option<String>,
    default_model: Option<String>,
    max_concurrent: usize,
    timeout: Duration,
    task_timeouts: HashMap<String, Duration>,
    cache: Option<CacheConfig>,
    retry: RetryConfig,
    chat_fallback: bool,
    prefer_responses: Option<bool>,
    stub_text: Option<String>,
    prices: Option<PriceTable>,
}

impl MuninBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            gemini_key: None,
            gemini_token_source: None,
            gemini_base_url: None,
            openai_key: None,
            openai_base_url: None,
            default_model: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(60),
            task_timeouts: HashMap::new(),
            cache: Some(CacheConfig::default()),
            retry: RetryConfig::default(),
            chat_fallback: true,
            prefer_responses: None,
            stub_text: None,
            prices: None,
        }
    }

    /// Seed the builder from a resolved [`GatewayConfig`].
    pub fn from_config(config: GatewayConfig) -> Self {
        let mut builder = Self::new();
        builder.provider = Some(config.provider);
        builder.gemini_key = config.gemini_api_key;
        builder.gemini_base_url = config.gemini_base_url;
        builder.openai_key = config.openai_api_key;
        builder.openai_base_url = config.openai_base_url;
        builder.default_model = config.default_model;
        builder.max_concurrent = config.max_concurrent;
        builder.timeout = config.timeout;
        builder.task_timeouts = config.task_timeouts;
        builder.cache = config.cache;
        builder.retry = config.retry;
        builder.chat_fallback = config.chat_fallback;
        builder
    }

    /// Configure the Gemini provider with an API key.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = Some(api_key.into());
        self
    }

    /// Configure the Gemini provider with an OAuth2 token source.
    pub fn gemini_oauth(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.gemini_token_source = Some(source);
        self
    }

    /// Override the Gemini base URL (testing).
    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(url.into());
        self
    }

    /// Configure the OpenAI-compatible provider.
    pub fn openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = Some(api_key.into());
        self
    }

    /// Point the OpenAI-compatible provider at a non-canonical host.
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = Some(url.into());
        self
    }

    /// Select a provider explicitly instead of inferring from keys.
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.provider = Some(kind);
        self
    }

    /// Run offline: every call answered by the stub with `text`.
    pub fn offline(mut self, text: impl Into<String>) -> Self {
        self.provider = Some(ProviderKind::Stub);
        self.stub_text = Some(text.into());
        self
    }

    /// Set the default model for calls that don't override it.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the concurrency gate size.
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set the overall call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the timeout for one task profile.
    pub fn task_timeout(mut self, task: impl Into<String>, timeout: Duration) -> Self {
        self.task_timeouts.insert(task.into(), timeout);
        self
    }

    /// Configure the response cache (replaces the default config).
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Disable the response cache.
    pub fn no_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Set retry behaviour.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Enable or disable the responses→chat-completions fallback.
    pub fn chat_fallback(mut self, enabled: bool) -> Self {
        self.chat_fallback = enabled;
        self
    }

    /// Force the OpenAI adapter's initial protocol (testing).
    pub fn prefer_responses(mut self, enabled: bool) -> Self {
        self.prefer_responses = Some(enabled);
        self
    }

    /// Attach a price table for cost estimation.
    pub fn price_table(mut self, prices: PriceTable) -> Self {
        self.prices = Some(prices);
        self
    }

    fn select_provider(&self) -> Result<ProviderKind> {
        if let Some(kind) = self.provider {
            return Ok(kind);
        }
        if self.openai_key.is_some() {
            return Ok(ProviderKind::OpenAi);
        }
        if self.gemini_key.is_some() || self.gemini_token_source.is_some() {
            return Ok(ProviderKind::Gemini);
        }
        Err(GatewayError::NoProvider)
    }

    /// Build the gateway.
    ///
    /// Misconfiguration (no provider, missing credential) fails here,
    /// before any network attempt is possible.
    pub fn build(self) -> Result<Gateway> {
        let kind = self.select_provider()?;
        let gate = ConcurrencyGate::new(self.max_concurrent);

        let provider: Arc<dyn GenerateProvider> = match kind {
            ProviderKind::Stub => Arc::new(match self.stub_text {
                Some(text) => StubProvider::with_text(text),
                None => StubProvider::new(),
            }),
            ProviderKind::Gemini => {
                let auth = if let Some(source) = self.gemini_token_source {
                    GeminiAuth::OAuth(source)
                } else if let Some(key) = self.gemini_key {
                    GeminiAuth::ApiKey(key)
                } else {
                    return Err(GatewayError::Configuration(
                        "gemini provider selected but no credential configured".to_string(),
                    ));
                };
                let provider = match self.gemini_base_url {
                    Some(url) => {
                        GeminiProvider::with_base_url(auth, url, gate, self.retry.clone())
                    }
                    None => GeminiProvider::new(auth, gate, self.retry.clone()),
                };
                Arc::new(provider)
            }
            ProviderKind::OpenAi => {
                let key = self.openai_key.ok_or_else(|| {
                    GatewayError::Configuration(
                        "openai provider selected but no credential configured".to_string(),
                    )
                })?;
                let mut provider = match self.openai_base_url {
                    Some(url) => {
                        OpenAiProvider::with_base_url(key, url, gate, self.retry.clone())
                    }
                    None => OpenAiProvider::new(key, gate, self.retry.clone()),
                };
                provider = provider.chat_fallback(self.chat_fallback);
                if let Some(prefer) = self.prefer_responses {
                    provider = provider.prefer_responses(prefer);
                }
                Arc::new(provider)
            }
        };

        let cache = self.cache.as_ref().map(ResponseCache::new);

        Ok(Gateway::new(
            provider,
            cache,
            UsageAccumulator::new(self.prices),
            self.default_model,
            self.timeout,
            self.task_timeouts,
        ))
    }
}

impl Default for MuninBuilder {
    fn default() -> Self {
        Self::new()
    }
}
