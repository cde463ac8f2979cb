// src/evaluator.rs

use std::collections::HashSet;

use tracing::{debug, info, info_span, instrument, warn};

use crate::config::{EvalConfig, ExecutionConfig, ExecutionMode, MetricConfig};
use crate::data_model::{EvalResults, NormalizedInput};
use crate::error::{MetricError, Result};
use crate::executor::{CombinePerKey, LocalExecutor, ParallelExecutor};
use crate::metrics::{ExampleCount, ExampleCountCombiner, MetricComputation};
use crate::slicer::{slice_inputs, SliceSpec};
use crate::utils::prometheus_metrics::EVALUATION_DURATION_SECONDS;

/// Runs a fixed set of metric computations over sliced inputs.
pub struct Evaluator {
    computations: Vec<MetricComputation<ExampleCountCombiner>>,
    slicing_specs: Vec<SliceSpec>,
}

impl Evaluator {
    pub fn new(
        computations: Vec<MetricComputation<ExampleCountCombiner>>,
        slicing_specs: Vec<SliceSpec>,
    ) -> Self {
        if computations.is_empty() {
            warn!("Evaluator created with no metric computations.");
        }
        Evaluator {
            computations,
            slicing_specs,
        }
    }

    /// Builds the computations for every configured metric, fanned out over
    /// the configured model and output names.
    #[instrument(skip(config), fields(num_metrics = config.metrics.len()))]
    pub fn from_config(config: &EvalConfig) -> Result<Self> {
        config.validate()?;

        let mut computations = Vec::new();
        for (i, metric_config) in config.metrics.iter().enumerate() {
            let metric_span = info_span!("metric", index = i, metric_type = metric_config.name());
            let _enter = metric_span.enter();

            match metric_config {
                MetricConfig::ExampleCount(params) => {
                    debug!(params = ?params, "Adding ExampleCount");
                    computations.extend(ExampleCount.computations(
                        &config.model_names,
                        &config.output_names,
                        params.example_weighted,
                    ));
                }
            }
        }

        let mut seen = HashSet::new();
        for key in computations.iter().flat_map(|c| c.keys.iter()) {
            if !seen.insert(key.clone()) {
                return Err(MetricError::ConfigValidationError(format!(
                    "EvalConfig: metric key '{}' is produced more than once",
                    key
                )));
            }
        }

        info!(
            "Evaluator built with {} computations over {} slicing specs.",
            computations.len(),
            config.slicing_specs.len()
        );
        Ok(Evaluator::new(computations, config.slicing_specs.clone()))
    }

    pub fn computations(&self) -> &[MetricComputation<ExampleCountCombiner>] {
        &self.computations
    }

    pub fn slicing_specs(&self) -> &[SliceSpec] {
        &self.slicing_specs
    }

    /// Slices `inputs` and runs every computation through `executor`.
    #[instrument(skip_all, fields(executor = executor.name(), num_inputs = inputs.len()))]
    pub fn evaluate<E: CombinePerKey>(
        &self,
        executor: &E,
        inputs: &[NormalizedInput],
    ) -> Result<EvalResults> {
        let timer = EVALUATION_DURATION_SECONDS.start_timer();
        let pairs = slice_inputs(inputs, &self.slicing_specs);

        let mut results = EvalResults::new();
        for computation in &self.computations {
            let per_slice = executor.combine_per_key(&pairs, &computation.combiner)?;
            for (slice_key, metrics) in per_slice {
                results.entry(slice_key).or_default().extend(metrics);
            }
        }
        timer.observe_duration();

        info!(
            num_slices = results.len(),
            num_computations = self.computations.len(),
            "Evaluation complete"
        );
        Ok(results)
    }
}

/// Evaluates with the engine selected by `execution`.
pub fn evaluate_with_execution(
    evaluator: &Evaluator,
    execution: &ExecutionConfig,
    inputs: &[NormalizedInput],
) -> Result<EvalResults> {
    execution.validate()?;
    match execution.mode {
        ExecutionMode::Local => evaluator.evaluate(&LocalExecutor::new(), inputs),
        ExecutionMode::Parallel => {
            let executor = ParallelExecutor::new(execution.num_partitions, execution.num_threads)?;
            evaluator.evaluate(&executor, inputs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExampleCountParams;
    use crate::data_model::{MetricKey, SliceKey};
    use serde_json::json;

    fn config(weighted: &[bool]) -> EvalConfig {
        EvalConfig {
            model_names: vec![String::new()],
            output_names: vec![String::new()],
            metrics: weighted
                .iter()
                .map(|w| {
                    MetricConfig::ExampleCount(ExampleCountParams {
                        example_weighted: *w,
                    })
                })
                .collect(),
            slicing_specs: vec![],
            execution: ExecutionConfig::default(),
        }
    }

    fn inputs() -> Vec<NormalizedInput> {
        [("da", 0.5), ("da", 1.5), ("en", 2.0)]
            .iter()
            .map(|(lang, w)| {
                serde_json::from_value(json!({
                    "example_weights": [w],
                    "features": {"lang": lang}
                }))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_weighted_and_unweighted_side_by_side() {
        let evaluator = Evaluator::from_config(&config(&[false, true])).unwrap();
        assert_eq!(evaluator.computations().len(), 2);

        let results = evaluator.evaluate(&LocalExecutor::new(), &inputs()).unwrap();
        assert_eq!(results.len(), 1);
        let overall = &results[&SliceKey::overall()];
        assert_eq!(overall[&MetricKey::new("example_count", "", "", false)], 3.0);
        assert!((overall[&MetricKey::new("example_count", "", "", true)] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_metric_keys_rejected() {
        assert!(matches!(
            Evaluator::from_config(&config(&[true, true])),
            Err(MetricError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_slices_by_feature() {
        let mut cfg = config(&[true]);
        cfg.slicing_specs = vec![
            SliceSpec::overall(),
            SliceSpec {
                columns: vec!["lang".to_string()],
                ..Default::default()
            },
        ];
        cfg.execution.mode = ExecutionMode::Parallel;
        cfg.execution.num_partitions = 2;
        let evaluator = Evaluator::from_config(&cfg).unwrap();
        let results = evaluate_with_execution(&evaluator, &cfg.execution, &inputs()).unwrap();

        let key = MetricKey::new("example_count", "", "", true);
        assert_eq!(results.len(), 3);
        assert!((results[&SliceKey::overall()][&key] - 4.0).abs() < 1e-6);
        assert!((results[&SliceKey::from_pairs([("lang", "da")])][&key] - 2.0).abs() < 1e-6);
        assert!((results[&SliceKey::from_pairs([("lang", "en")])][&key] - 2.0).abs() < 1e-6);
    }
}
