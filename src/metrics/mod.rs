// src/metrics/mod.rs

mod example_count;
mod metric_types;

pub use example_count::{
    ExampleCount, ExampleCountAccumulator, ExampleCountCombiner, WeightShape, EXAMPLE_COUNT_NAME,
};
pub use metric_types::MetricComputation;
