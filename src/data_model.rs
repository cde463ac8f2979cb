use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{MetricError, Result};

/// Per-example weights, nested under model and output names when those are configured.
///
/// The nesting is driven by the evaluation config: a flat sequence when neither
/// a model nor an output name is set, one level of mapping for either, and
/// model → output → sequence when both are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleWeights {
    Values(Vec<f64>),
    Keyed(BTreeMap<String, ExampleWeights>),
}

impl ExampleWeights {
    pub fn kind(&self) -> &'static str {
        match self {
            ExampleWeights::Values(_) => "sequence",
            ExampleWeights::Keyed(_) => "mapping",
        }
    }

    /// Looks up one nesting level. `level` names the level in errors ("model" or "output").
    pub fn get(&self, level: &'static str, key: &str) -> Result<&ExampleWeights> {
        match self {
            ExampleWeights::Keyed(map) => {
                map.get(key).ok_or_else(|| MetricError::MissingWeightKey {
                    level,
                    key: key.to_string(),
                })
            }
            ExampleWeights::Values(_) => Err(MetricError::WeightShapeMismatch {
                expected: "mapping",
                found: "sequence",
            }),
        }
    }

    /// First weight of a flat sequence. Values past index 0 are not read.
    pub fn first_value(&self) -> Result<f64> {
        match self {
            ExampleWeights::Values(values) => values
                .first()
                .copied()
                .ok_or(MetricError::EmptyExampleWeights),
            ExampleWeights::Keyed(_) => Err(MetricError::WeightShapeMismatch {
                expected: "sequence",
                found: "mapping",
            }),
        }
    }
}

/// One evaluated example after standardization. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInput {
    #[serde(default)]
    pub labels: Value,
    #[serde(default)]
    pub predictions: Value,
    #[serde(default)]
    pub example_weights: Option<ExampleWeights>,
    // Only read by the slicer
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
}

/// Ordered (column, value) pairs identifying a slice. Empty means the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceKey(pub Vec<(String, String)>);

impl SliceKey {
    pub fn overall() -> Self {
        SliceKey(Vec::new())
    }

    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<String>,
    {
        SliceKey(
            pairs
                .into_iter()
                .map(|(c, v)| (c.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_overall(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_overall() {
            return write!(f, "Overall");
        }
        let parts: Vec<String> = self.0.iter().map(|(c, v)| format!("{}:{}", c, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Identifies one metric value within a result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub name: String,
    pub model_name: String,
    pub output_name: String,
    pub example_weighted: bool,
}

impl MetricKey {
    pub fn new(
        name: impl Into<String>,
        model_name: impl Into<String>,
        output_name: impl Into<String>,
        example_weighted: bool,
    ) -> Self {
        MetricKey {
            name: name.into(),
            model_name: model_name.into(),
            output_name: output_name.into(),
            example_weighted,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.model_name.is_empty() {
            write!(f, " model={}", self.model_name)?;
        }
        if !self.output_name.is_empty() {
            write!(f, " output={}", self.output_name)?;
        }
        write!(f, " weighted={}", self.example_weighted)
    }
}

/// Per-slice metric values produced by an evaluation run.
pub type EvalResults = BTreeMap<SliceKey, BTreeMap<MetricKey, f64>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(model: &str, output: &str, values: Vec<f64>) -> ExampleWeights {
        let by_output: BTreeMap<String, ExampleWeights> =
            [(output.to_string(), ExampleWeights::Values(values))]
                .into_iter()
                .collect();
        ExampleWeights::Keyed(
            [(model.to_string(), ExampleWeights::Keyed(by_output))]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_weights_deserialize_flat_and_nested() {
        let flat: ExampleWeights = serde_json::from_str("[0.5, 2.0]").unwrap();
        assert_eq!(flat, ExampleWeights::Values(vec![0.5, 2.0]));

        let two_levels: ExampleWeights =
            serde_json::from_str(r#"{"model": {"output": [0.7]}}"#).unwrap();
        assert_eq!(two_levels, nested("model", "output", vec![0.7]));
    }

    #[test]
    fn test_get_missing_key_names_level() {
        let weights = nested("model", "output", vec![1.0]);
        match weights.get("model", "other") {
            Err(MetricError::MissingWeightKey { level, key }) => {
                assert_eq!(level, "model");
                assert_eq!(key, "other");
            }
            other => panic!("Expected MissingWeightKey, got {:?}", other),
        }
    }

    #[test]
    fn test_get_on_sequence_is_shape_mismatch() {
        let weights = ExampleWeights::Values(vec![1.0]);
        assert!(matches!(
            weights.get("output", "output"),
            Err(MetricError::WeightShapeMismatch {
                expected: "mapping",
                found: "sequence"
            })
        ));
    }

    #[test]
    fn test_first_value_ignores_tail_and_rejects_empty() {
        assert_eq!(
            ExampleWeights::Values(vec![0.25, 9.0]).first_value().unwrap(),
            0.25
        );
        assert!(matches!(
            ExampleWeights::Values(vec![]).first_value(),
            Err(MetricError::EmptyExampleWeights)
        ));
    }

    #[test]
    fn test_slice_key_display() {
        assert_eq!(SliceKey::overall().to_string(), "Overall");
        let key = SliceKey::from_pairs([("language", "da"), ("source", "web")]);
        assert_eq!(key.to_string(), "language:da, source:web");
    }

    #[test]
    fn test_metric_key_equality_requires_all_fields() {
        let a = MetricKey::new("example_count", "model", "", true);
        assert_eq!(a, MetricKey::new("example_count", "model", "", true));
        assert_ne!(a, MetricKey::new("example_count", "model", "", false));
        assert_ne!(a, MetricKey::new("example_count", "", "model", true));
    }
}
