use crate::error::{MetricError, Result};
use crate::slicer::SliceSpec;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Represents the overall evaluation configuration read from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct EvalConfig {
    #[serde(default = "default_names")]
    pub model_names: Vec<String>,
    #[serde(default = "default_names")]
    pub output_names: Vec<String>,
    pub metrics: Vec<MetricConfig>,
    #[serde(default)] // Overall slice only
    pub slicing_specs: Vec<SliceSpec>,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_names() -> Vec<String> {
    vec![String::new()]
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(MetricError::ConfigValidationError(
                "EvalConfig: at least one metric must be configured".to_string(),
            ));
        }
        validate_names("model_names", &self.model_names)?;
        validate_names("output_names", &self.output_names)?;
        for metric_config in &self.metrics {
            metric_config.validate()?;
        }
        for (idx, spec) in self.slicing_specs.iter().enumerate() {
            validate_slice_spec(idx, spec)?;
        }
        self.execution.validate()
    }
}

fn validate_names(field: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(MetricError::ConfigValidationError(format!(
                "EvalConfig: duplicate entry '{}' in {}",
                name, field
            )));
        }
    }
    Ok(())
}

fn validate_slice_spec(idx: usize, spec: &SliceSpec) -> Result<()> {
    for column in spec.columns.iter().chain(spec.feature_values.keys()) {
        if column.trim().is_empty() {
            return Err(MetricError::ConfigValidationError(format!(
                "SliceSpec at index {}: column names must not be empty",
                idx
            )));
        }
    }
    if let Some(column) = spec
        .columns
        .iter()
        .find(|c| spec.feature_values.contains_key(c.as_str()))
    {
        return Err(MetricError::ConfigValidationError(format!(
            "SliceSpec at index {}: column '{}' is listed in both columns and feature_values",
            idx, column
        )));
    }
    Ok(())
}

/// A single metric entry. The `type` field selects the variant.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MetricConfig {
    ExampleCount(ExampleCountParams),
}

impl MetricConfig {
    pub fn name(&self) -> &'static str {
        match self {
            MetricConfig::ExampleCount(_) => "ExampleCount",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            MetricConfig::ExampleCount(_) => Ok(()),
        }
    }
}

/// Parameters for the ExampleCount metric.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExampleCountParams {
    #[serde(default)]
    pub example_weighted: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Local,
    Parallel,
}

/// Which combine engine runs the computations.
#[derive(Deserialize, Debug, Clone)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,
    pub num_threads: Option<usize>, // None uses the global rayon pool
}

fn default_num_partitions() -> usize {
    4
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            mode: ExecutionMode::Local,
            num_partitions: default_num_partitions(),
            num_threads: None,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_partitions == 0 {
            return Err(MetricError::ConfigValidationError(
                "ExecutionConfig: num_partitions must be greater than 0".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(MetricError::ConfigValidationError(
                "ExecutionConfig: num_threads must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads and parses the evaluation configuration YAML file.
pub fn load_eval_config<P: AsRef<Path>>(config_path: P) -> Result<EvalConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        MetricError::ConfigError(format!(
            "Failed to read eval config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    serde_yaml::from_str(&config_content).map_err(|e| {
        MetricError::ConfigError(format!(
            "Failed to parse eval config YAML from '{}': {}",
            path_ref.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> EvalConfig {
        serde_yaml::from_str(yaml).expect("yaml should parse")
    }

    #[test]
    fn test_defaults() {
        let config = parse("metrics:\n  - type: ExampleCount\n");
        assert_eq!(config.model_names, vec![String::new()]);
        assert_eq!(config.output_names, vec![String::new()]);
        assert!(config.slicing_specs.is_empty());
        assert_eq!(config.execution.mode, ExecutionMode::Local);
        assert_eq!(config.execution.num_partitions, 4);
        match &config.metrics[0] {
            MetricConfig::ExampleCount(params) => assert!(!params.example_weighted),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_metrics_invalid() {
        let config = parse("metrics: []\n");
        assert!(matches!(
            config.validate(),
            Err(MetricError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_duplicate_model_names_invalid() {
        let config = parse("model_names: [a, a]\nmetrics:\n  - type: ExampleCount\n");
        match config.validate() {
            Err(MetricError::ConfigValidationError(msg)) => {
                assert!(msg.contains("model_names"));
            }
            other => panic!("Expected ConfigValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_slice_spec_column_conflict_invalid() {
        let config = parse(
            r#"
metrics:
  - type: ExampleCount
slicing_specs:
  - columns: [lang]
    feature_values:
      lang: da
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_partitions_invalid() {
        let config = parse(
            "metrics:\n  - type: ExampleCount\nexecution:\n  mode: parallel\n  num_partitions: 0\n",
        );
        assert!(config.validate().is_err());
    }
}
