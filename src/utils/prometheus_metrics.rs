// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_histogram, Counter, Encoder, Histogram, TextEncoder};

use crate::error::{MetricError, Result};

// Metrics from the combine executors
pub static EXAMPLES_COMBINED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "combine_examples_combined_total",
        "Total number of inputs folded into an accumulator."
    )
    .expect("Failed to register EXAMPLES_COMBINED_TOTAL counter")
});

pub static ACCUMULATOR_MERGES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "combine_accumulator_merges_total",
        "Total number of pairwise accumulator merges."
    )
    .expect("Failed to register ACCUMULATOR_MERGES_TOTAL counter")
});

pub static COMBINER_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "combine_combiner_errors_total",
        "Total number of inputs a combiner rejected."
    )
    .expect("Failed to register COMBINER_ERRORS_TOTAL counter")
});

pub static SLICE_RESULTS_EMITTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "combine_slice_results_emitted_total",
        "Total number of per-slice outputs extracted from accumulators."
    )
    .expect("Failed to register SLICE_RESULTS_EMITTED_TOTAL counter")
});

// Metrics from the evaluator
pub static EVALUATION_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "evaluator_evaluation_duration_seconds",
        "Histogram of full evaluation run durations (slicing through extraction)."
    )
    .expect("Failed to register EVALUATION_DURATION_SECONDS histogram")
});

/// Renders the default registry in the Prometheus text exposition format.
pub fn gather_metrics_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| MetricError::Unexpected(format!("Could not encode prometheus metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| MetricError::Unexpected(format!("Prometheus metrics UTF-8 error: {}", e)))
}
