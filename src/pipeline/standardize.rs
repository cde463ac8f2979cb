use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::data_model::{ExampleWeights, NormalizedInput};
use crate::error::{MetricError, Result};

/// A raw evaluation record as it arrives from an input source.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawExample {
    #[serde(default)]
    pub labels: Value,
    #[serde(default)]
    pub predictions: Value,
    #[serde(default)]
    pub example_weights: Value,
    #[serde(default)]
    pub features: Map<String, Value>,
}

/// Converts a raw record into the standardized metric input.
///
/// Scalar weights become one-element sequences. A null or absent
/// `example_weights` leaves the input without weights.
pub fn to_standard_metric_inputs(raw: RawExample) -> Result<NormalizedInput> {
    let example_weights = match raw.example_weights {
        Value::Null => None,
        other => Some(parse_weights(other)?),
    };
    Ok(NormalizedInput {
        labels: raw.labels,
        predictions: raw.predictions,
        example_weights,
        features: raw.features.into_iter().collect(),
    })
}

fn parse_weights(value: Value) -> Result<ExampleWeights> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|weight| ExampleWeights::Values(vec![weight]))
            .ok_or(MetricError::WeightShapeMismatch {
                expected: "finite number",
                found: "number",
            }),
        Value::Array(items) => items
            .iter()
            .map(as_weight)
            .collect::<Result<Vec<f64>>>()
            .map(ExampleWeights::Values),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, nested)| parse_weights(nested).map(|weights| (key, weights)))
            .collect::<Result<BTreeMap<String, ExampleWeights>>>()
            .map(ExampleWeights::Keyed),
        other => Err(MetricError::WeightShapeMismatch {
            expected: "number, sequence or mapping",
            found: json_kind(&other),
        }),
    }
}

fn as_weight(value: &Value) -> Result<f64> {
    value.as_f64().ok_or(MetricError::WeightShapeMismatch {
        expected: "number",
        found: json_kind(value),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
