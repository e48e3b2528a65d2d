//! Caching subsystem.
//!
//! One cache: [`response::ResponseCache`], the content-addressed LRU + TTL
//! store for deterministic generate responses. Activated via the builder's
//! `.response_cache()` method (on by default from
//! [`GatewayConfig`](crate::config::GatewayConfig)). See the [`response`]
//! module docs for keying and backend-pluggability notes.

pub mod response;

pub use response::{CacheBackend, CacheConfig, ResponseCache};
