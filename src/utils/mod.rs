// Utils

pub mod prometheus_metrics;

pub use prometheus_metrics::gather_metrics_text;
