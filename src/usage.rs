//! Process-wide usage accounting.
//!
//! [`UsageAccumulator`] keeps per-model and global running totals of
//! calls, tokens, latency, and (when a price table is configured) an
//! estimated cost, plus a per-protocol call count. Reporting only — the
//! gateway never consults it for a control decision. Token counters are
//! also mirrored to the `metrics` facade for operators who scrape
//! instead of polling [`summary()`].
//!
//! [`summary()`]: UsageAccumulator::summary

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry;
use crate::types::{Protocol, Usage};

/// Per-million-token prices for one model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Optional model → price mapping for cost estimation.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: HashMap<String, ModelPrice>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a price for a model id.
    pub fn price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    fn estimate(&self, model: &str, usage: &Usage) -> Option<f64> {
        let price = self.prices.get(model)?;
        Some(
            f64::from(usage.input_tokens) / 1e6 * price.input_per_mtok
                + f64::from(usage.output_tokens) / 1e6 * price.output_per_mtok,
        )
    }
}

/// Running totals for one model (or the global aggregate).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTotals {
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Sum of call latencies, including retries.
    pub total_latency: Duration,
    /// Estimated cost in the price table's currency; 0 without a table.
    pub estimated_cost: f64,
}

impl ModelTotals {
    fn add(&mut self, usage: Option<&Usage>, latency: Duration, cost: Option<f64>) {
        self.calls += 1;
        if let Some(u) = usage {
            self.input_tokens += u64::from(u.input_tokens);
            self.output_tokens += u64::from(u.output_tokens);
            self.total_tokens += u64::from(u.total_tokens);
        }
        self.total_latency += latency;
        self.estimated_cost += cost.unwrap_or(0.0);
    }
}

/// Snapshot returned by [`UsageAccumulator::summary`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    pub per_model: HashMap<String, ModelTotals>,
    /// Calls served per wire protocol (cache hits excluded — they never
    /// reach a provider).
    pub per_protocol: HashMap<String, u64>,
    pub totals: ModelTotals,
}

/// Write-mostly accumulator of usage records.
///
/// A single mutex is plenty: contention is negligible next to network
/// latency, and no lock is held across an await point.
pub struct UsageAccumulator {
    inner: Mutex<UsageSummary>,
    prices: Option<PriceTable>,
}

impl UsageAccumulator {
    pub fn new(prices: Option<PriceTable>) -> Self {
        Self {
            inner: Mutex::new(UsageSummary::default()),
            prices,
        }
    }

    /// Record one completed call.
    pub fn record(
        &self,
        model: &str,
        protocol: Option<Protocol>,
        usage: Option<&Usage>,
        latency: Duration,
    ) {
        let cost = usage.and_then(|u| self.prices.as_ref().and_then(|p| p.estimate(model, u)));

        {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            inner
                .per_model
                .entry(model.to_string())
                .or_default()
                .add(usage, latency, cost);
            if let Some(protocol) = protocol {
                *inner
                    .per_protocol
                    .entry(protocol.as_str().to_string())
                    .or_default() += 1;
            }
            inner.totals.add(usage, latency, cost);
        }

        if let Some(u) = usage {
            metrics::counter!(telemetry::TOKENS_TOTAL,
                "model" => model.to_string(),
                "direction" => "input",
            )
            .increment(u64::from(u.input_tokens));
            metrics::counter!(telemetry::TOKENS_TOTAL,
                "model" => model.to_string(),
                "direction" => "output",
            )
            .increment(u64::from(u.output_tokens));
        }
    }

    /// Snapshot of the current totals.
    pub fn summary(&self) -> UsageSummary {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
