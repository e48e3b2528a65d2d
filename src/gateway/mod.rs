//! The gateway object: cache, gate, adapter, and accounting composed
//! behind one `generate` entry point.

mod builder;

pub use builder::{Munin, MuninBuilder};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::cache::response::cache_key;
use crate::providers::traits::GenerateProvider;
use crate::telemetry;
use crate::traits::ModelGateway;
use crate::types::{GenerateOptions, GenerateRequest, GenerateResponse};
use crate::usage::{UsageAccumulator, UsageSummary};
use crate::{GatewayError, Result};

/// The single entry point every rule engine, extractor, and judge in the
/// backend shares.
///
/// Constructed once at process start (see [`Munin::builder()`] /
/// [`Munin::from_env()`]) and passed by reference into every caller.
/// There is no global state: tests construct isolated instances freely.
pub struct Gateway {
    provider: Arc<dyn GenerateProvider>,
    cache: Option<ResponseCache>,
    usage: UsageAccumulator,
    default_model: Option<String>,
    timeout: Duration,
    task_timeouts: HashMap<String, Duration>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("cache", &self.cache.is_some())
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .field("task_timeouts", &self.task_timeouts)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub(crate) fn new(
        provider: Arc<dyn GenerateProvider>,
        cache: Option<ResponseCache>,
        usage: UsageAccumulator,
        default_model: Option<String>,
        timeout: Duration,
        task_timeouts: HashMap<String, Duration>,
    ) -> Self {
        Self {
            provider,
            cache,
            usage,
            default_model,
            timeout,
            task_timeouts,
        }
    }

    /// Timeout budget for a call, honoring per-task overrides.
    fn timeout_for(&self, task: Option<&str>) -> Duration {
        task.and_then(|t| self.task_timeouts.get(t).copied())
            .unwrap_or(self.timeout)
    }

    /// Snapshot of accumulated usage, for reporting.
    pub fn usage_summary(&self) -> UsageSummary {
        self.usage.summary()
    }

    /// Generate text for a prompt.
    ///
    /// Cache check → slot acquisition → provider send, with retries,
    /// capability mutation, and protocol fallback handled inside the
    /// adapter, all bounded by one wall-clock deadline fixed here.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateResponse> {
        let model = options
            .model
            .clone()
            .or_else(|| self.default_model.clone())
            .ok_or_else(|| {
                GatewayError::Configuration("no model configured and none requested".to_string())
            })?;

        let cacheable = self.cache.is_some() && options.is_deterministic();
        let key = cache_key(&model, options.prompt_version.as_deref(), prompt);

        if cacheable
            && let Some(cache) = &self.cache
            && let Some(text) = cache.get(key).await
        {
            debug!(model = %model, "response cache hit");
            return Ok(GenerateResponse {
                text,
                usage: None,
                model: Some(model),
                protocol: None,
            });
        }

        let deadline = Instant::now() + self.timeout_for(options.task.as_deref());
        let request = GenerateRequest {
            prompt: prompt.to_string(),
            model: model.clone(),
            schema: options.schema.clone(),
            temperature: options.temperature,
        };

        let started = Instant::now();
        let result = self.provider.generate(&request, deadline).await;
        let elapsed = started.elapsed();

        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "provider" => self.provider.name().to_string(),
        )
        .record(elapsed.as_secs_f64());

        match result {
            Ok(response) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "provider" => self.provider.name().to_string(),
                    "status" => "ok",
                )
                .increment(1);
                self.usage
                    .record(&model, response.protocol, response.usage.as_ref(), elapsed);
                if cacheable && let Some(cache) = &self.cache {
                    cache.insert(key, response.text.clone()).await;
                }
                Ok(response)
            }
            Err(e) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "provider" => self.provider.name().to_string(),
                    "status" => "error",
                )
                .increment(1);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ModelGateway for Gateway {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateResponse> {
        Gateway::generate(self, prompt, options).await
    }
}
