#![allow(non_snake_case)]

// Declare the modules that form the library's public API
pub mod config;
pub mod data_model;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod metrics;
pub mod pipeline;
pub mod slicer;
pub mod utils;

pub use data_model::{EvalResults, ExampleWeights, MetricKey, NormalizedInput, SliceKey};
pub use error::{MetricError, Result};
pub use evaluator::Evaluator;
pub use executor::{CombinePerKey, Combiner, LocalExecutor, ParallelExecutor};
