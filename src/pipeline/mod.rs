// src/pipeline/mod.rs

pub mod readers;
pub mod standardize;

pub use standardize::{to_standard_metric_inputs, RawExample};
