//! Tests for [`UsageAccumulator`] — reporting-only totals and cost
//! estimation.

use std::time::Duration;

use munin::types::{Protocol, Usage};
use munin::usage::{ModelPrice, PriceTable, UsageAccumulator};

fn usage(input: u32, output: u32) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
    }
}

#[test]
fn totals_accumulate_across_records() {
    let accumulator = UsageAccumulator::new(None);

    accumulator.record(
        "gpt-4o-mini",
        Some(Protocol::Responses),
        Some(&usage(100, 20)),
        Duration::from_millis(300),
    );
    accumulator.record(
        "gpt-4o-mini",
        Some(Protocol::Responses),
        Some(&usage(50, 10)),
        Duration::from_millis(200),
    );
    accumulator.record(
        "gemini-pro",
        Some(Protocol::GenerateContent),
        Some(&usage(10, 5)),
        Duration::from_millis(100),
    );

    let summary = accumulator.summary();
    assert_eq!(summary.totals.calls, 3);
    assert_eq!(summary.totals.input_tokens, 160);
    assert_eq!(summary.totals.output_tokens, 35);
    assert_eq!(summary.totals.total_latency, Duration::from_millis(600));

    let mini = &summary.per_model["gpt-4o-mini"];
    assert_eq!(mini.calls, 2);
    assert_eq!(mini.input_tokens, 150);

    assert_eq!(summary.per_protocol["responses"], 2);
    assert_eq!(summary.per_protocol["generate_content"], 1);
}

#[test]
fn missing_usage_still_counts_the_call() {
    let accumulator = UsageAccumulator::new(None);
    accumulator.record("stub", Some(Protocol::Stub), None, Duration::ZERO);

    let summary = accumulator.summary();
    assert_eq!(summary.totals.calls, 1);
    assert_eq!(summary.totals.total_tokens, 0);
}

#[test]
fn price_table_estimates_cost() {
    let prices = PriceTable::new().price(
        "gpt-4o-mini",
        ModelPrice {
            input_per_mtok: 0.15,
            output_per_mtok: 0.60,
        },
    );
    let accumulator = UsageAccumulator::new(Some(prices));

    accumulator.record(
        "gpt-4o-mini",
        Some(Protocol::Responses),
        Some(&usage(1_000_000, 1_000_000)),
        Duration::from_secs(1),
    );

    let summary = accumulator.summary();
    assert!((summary.totals.estimated_cost - 0.75).abs() < 1e-9);
    assert!((summary.per_model["gpt-4o-mini"].estimated_cost - 0.75).abs() < 1e-9);
}

#[test]
fn unpriced_model_costs_zero() {
    let prices = PriceTable::new();
    let accumulator = UsageAccumulator::new(Some(prices));

    accumulator.record(
        "unknown-model",
        Some(Protocol::ChatCompletions),
        Some(&usage(1000, 1000)),
        Duration::from_secs(1),
    );

    assert_eq!(accumulator.summary().totals.estimated_cost, 0.0);
}
