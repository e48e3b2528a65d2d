//! Environment-style configuration, consumed once at gateway construction.
//!
//! The deployment sets `MUNIN_*` variables (plus the usual provider key
//! variables) and the backend calls [`GatewayConfig::from_env()`] exactly
//! once at startup. Nothing in the crate reads the environment after
//! construction.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `MUNIN_PROVIDER` | `gemini` \| `openai` \| `stub` | inferred from keys |
//! | `MUNIN_OFFLINE` | `1`/`true` forces the stub adapter | off |
//! | `MUNIN_MODEL` | default model id | required (except stub) |
//! | `MUNIN_MAX_CONCURRENT` | concurrency gate size | 3 |
//! | `MUNIN_TIMEOUT_SECS` | overall call deadline | 60 |
//! | `MUNIN_TASK_TIMEOUTS` | `task=secs,...` overrides | none |
//! | `MUNIN_MAX_ATTEMPTS` | retry attempts per call | 4 |
//! | `MUNIN_CACHE` | `0`/`false` disables the cache | on |
//! | `MUNIN_CACHE_TTL_SECS` | cache entry TTL | 3600 |
//! | `MUNIN_CACHE_MAX_ENTRIES` | cache capacity | 10000 |
//! | `MUNIN_CHAT_FALLBACK` | `0`/`false` disables protocol fallback | on |
//! | `GEMINI_API_KEY` / `GEMINI_BASE_URL` | Gemini credentials | — |
//! | `OPENAI_API_KEY` / `OPENAI_BASE_URL` | OpenAI credentials | — |

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::providers::gate::DEFAULT_MAX_CONCURRENT;
use crate::providers::retry::RetryConfig;
use crate::{GatewayError, Result};

/// Which provider adapter the gateway runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Stub,
}

/// Everything the gateway needs, resolved once at startup.
#[derive(Clone)]
pub struct GatewayConfig {
    pub provider: ProviderKind,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    /// Model used when a call doesn't override it.
    pub default_model: Option<String>,
    pub max_concurrent: usize,
    /// Overall call deadline, including all retries.
    pub timeout: Duration,
    /// Per-task overrides, e.g. a longer budget for large extractions.
    pub task_timeouts: HashMap<String, Duration>,
    /// `None` disables caching entirely.
    pub cache: Option<CacheConfig>,
    pub retry: RetryConfig,
    pub chat_fallback: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Stub,
            gemini_api_key: None,
            gemini_base_url: None,
            openai_api_key: None,
            openai_base_url: None,
            default_model: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(60),
            task_timeouts: HashMap::new(),
            cache: Some(CacheConfig::default()),
            retry: RetryConfig::default(),
            chat_fallback: true,
        }
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    ///
    /// Fails fast with [`GatewayError::Configuration`] on unparseable
    /// values and with [`GatewayError::NoProvider`] when no provider can
    /// be selected — before any network attempt is possible.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_base_url: env_opt("GEMINI_BASE_URL"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
            default_model: env_opt("MUNIN_MODEL"),
            ..Self::default()
        };

        let offline = env_opt("MUNIN_OFFLINE").is_some_and(|v| parse_flag(&v));
        config.provider = if offline {
            ProviderKind::Stub
        } else {
            match env_opt("MUNIN_PROVIDER").as_deref() {
                Some(name) => parse_provider(name)?,
                None if config.openai_api_key.is_some() => ProviderKind::OpenAi,
                None if config.gemini_api_key.is_some() => ProviderKind::Gemini,
                None => return Err(GatewayError::NoProvider),
            }
        };

        if let Some(n) = env_opt("MUNIN_MAX_CONCURRENT") {
            config.max_concurrent = parse_number(&n, "MUNIN_MAX_CONCURRENT")?;
        }
        if let Some(secs) = env_opt("MUNIN_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number(&secs, "MUNIN_TIMEOUT_SECS")?);
        }
        if let Some(spec) = env_opt("MUNIN_TASK_TIMEOUTS") {
            config.task_timeouts = parse_task_timeouts(&spec)?;
        }
        if let Some(n) = env_opt("MUNIN_MAX_ATTEMPTS") {
            config.retry = config
                .retry
                .max_attempts(parse_number(&n, "MUNIN_MAX_ATTEMPTS")?);
        }

        let cache_enabled = env_opt("MUNIN_CACHE").is_none_or(|v| parse_flag(&v));
        config.cache = if cache_enabled {
            let mut cache = CacheConfig::default();
            if let Some(secs) = env_opt("MUNIN_CACHE_TTL_SECS") {
                cache = cache.ttl(Duration::from_secs(parse_number(
                    &secs,
                    "MUNIN_CACHE_TTL_SECS",
                )?));
            }
            if let Some(n) = env_opt("MUNIN_CACHE_MAX_ENTRIES") {
                cache = cache.max_entries(parse_number(&n, "MUNIN_CACHE_MAX_ENTRIES")?);
            }
            Some(cache)
        } else {
            None
        };

        if let Some(v) = env_opt("MUNIN_CHAT_FALLBACK") {
            config.chat_fallback = parse_flag(&v);
        }

        Ok(config)
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// "1"/"true"/"yes"/"on" → true (case-insensitive); everything else false.
pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn parse_provider(name: &str) -> Result<ProviderKind> {
    match name.to_ascii_lowercase().as_str() {
        "gemini" => Ok(ProviderKind::Gemini),
        "openai" => Ok(ProviderKind::OpenAi),
        "stub" => Ok(ProviderKind::Stub),
        other => Err(GatewayError::Configuration(format!(
            "unknown provider '{other}' (expected gemini, openai, or stub)"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, var: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| GatewayError::Configuration(format!("invalid value '{value}' for {var}")))
}

/// Parse a `task=secs,task=secs` list into per-task timeout overrides.
pub(crate) fn parse_task_timeouts(spec: &str) -> Result<HashMap<String, Duration>> {
    let mut timeouts = HashMap::new();
    for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
        let (task, secs) = entry.split_once('=').ok_or_else(|| {
            GatewayError::Configuration(format!(
                "invalid task timeout '{entry}' (expected task=secs)"
            ))
        })?;
        let secs: u64 = parse_number(secs.trim(), "MUNIN_TASK_TIMEOUTS")?;
        timeouts.insert(task.trim().to_string(), Duration::from_secs(secs));
    }
    Ok(timeouts)
}
