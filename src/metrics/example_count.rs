use std::collections::BTreeMap;

use itertools::iproduct;
use tracing::debug;

use crate::data_model::{ExampleWeights, MetricKey, NormalizedInput};
use crate::error::{MetricError, Result};
use crate::executor::Combiner;
use crate::metrics::MetricComputation;

pub const EXAMPLE_COUNT_NAME: &str = "example_count";

/// Where the example weight lives inside `example_weights`, fixed once from
/// the configured model and output names. An empty name means that nesting
/// level is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightShape {
    Flat,
    ByModel {
        model_name: String,
    },
    ByOutput {
        output_name: String,
    },
    ByModelAndOutput {
        model_name: String,
        output_name: String,
    },
}

impl WeightShape {
    pub fn from_names(model_name: &str, output_name: &str) -> Self {
        match (model_name.is_empty(), output_name.is_empty()) {
            (true, true) => WeightShape::Flat,
            (false, true) => WeightShape::ByModel {
                model_name: model_name.to_string(),
            },
            (true, false) => WeightShape::ByOutput {
                output_name: output_name.to_string(),
            },
            (false, false) => WeightShape::ByModelAndOutput {
                model_name: model_name.to_string(),
                output_name: output_name.to_string(),
            },
        }
    }

    /// First weight at this shape's location.
    pub fn weight_of(&self, weights: &ExampleWeights) -> Result<f64> {
        match self {
            WeightShape::Flat => weights.first_value(),
            WeightShape::ByModel { model_name } => weights.get("model", model_name)?.first_value(),
            WeightShape::ByOutput { output_name } => {
                weights.get("output", output_name)?.first_value()
            }
            WeightShape::ByModelAndOutput {
                model_name,
                output_name,
            } => weights
                .get("model", model_name)?
                .get("output", output_name)?
                .first_value(),
        }
    }
}

/// Running sum of example weights (or of 1.0 per example when unweighted).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExampleCountAccumulator {
    sum: f64,
}

impl ExampleCountAccumulator {
    pub fn new() -> Self {
        ExampleCountAccumulator { sum: 0.0 }
    }

    pub fn update(&mut self, weight: f64) {
        self.sum += weight;
    }

    pub fn merge(&mut self, other: ExampleCountAccumulator) {
        self.sum += other.sum;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

/// Counts examples for one (model, output) pair, optionally weighted.
#[derive(Debug, Clone)]
pub struct ExampleCountCombiner {
    key: MetricKey,
    shape: WeightShape,
}

impl ExampleCountCombiner {
    pub fn new(model_name: &str, output_name: &str, example_weighted: bool) -> Self {
        ExampleCountCombiner {
            key: MetricKey::new(EXAMPLE_COUNT_NAME, model_name, output_name, example_weighted),
            shape: WeightShape::from_names(model_name, output_name),
        }
    }

    pub fn metric_key(&self) -> &MetricKey {
        &self.key
    }

    pub fn weight_shape(&self) -> &WeightShape {
        &self.shape
    }
}

impl Combiner for ExampleCountCombiner {
    type Input = NormalizedInput;
    type Accumulator = ExampleCountAccumulator;
    type Output = BTreeMap<MetricKey, f64>;

    fn name(&self) -> &'static str {
        "ExampleCountCombiner"
    }

    fn create_accumulator(&self) -> ExampleCountAccumulator {
        ExampleCountAccumulator::new()
    }

    fn add_input(
        &self,
        accumulator: &mut ExampleCountAccumulator,
        input: &NormalizedInput,
    ) -> Result<()> {
        if !self.key.example_weighted {
            accumulator.update(1.0);
            return Ok(());
        }
        let weights = input
            .example_weights
            .as_ref()
            .ok_or(MetricError::MissingExampleWeights)?;
        accumulator.update(self.shape.weight_of(weights)?);
        Ok(())
    }

    fn merge_accumulators(
        &self,
        mut left: ExampleCountAccumulator,
        right: ExampleCountAccumulator,
    ) -> ExampleCountAccumulator {
        left.merge(right);
        left
    }

    fn extract_output(&self, accumulator: ExampleCountAccumulator) -> BTreeMap<MetricKey, f64> {
        let mut output = BTreeMap::new();
        output.insert(self.key.clone(), accumulator.value());
        output
    }
}

/// The example count metric definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleCount;

impl ExampleCount {
    pub fn name(&self) -> &'static str {
        EXAMPLE_COUNT_NAME
    }

    /// One computation per (model, output) pair. An empty name list counts as `[""]`.
    pub fn computations(
        &self,
        model_names: &[String],
        output_names: &[String],
        example_weighted: bool,
    ) -> Vec<MetricComputation<ExampleCountCombiner>> {
        let unnamed = [String::new()];
        let model_names = if model_names.is_empty() { &unnamed[..] } else { model_names };
        let output_names = if output_names.is_empty() { &unnamed[..] } else { output_names };

        let computations: Vec<_> = iproduct!(model_names, output_names)
            .map(|(model_name, output_name)| {
                let combiner = ExampleCountCombiner::new(model_name, output_name, example_weighted);
                MetricComputation::new(vec![combiner.metric_key().clone()], combiner)
            })
            .collect();
        debug!(
            num_computations = computations.len(),
            example_weighted, "Built example count computations"
        );
        computations
    }
}
