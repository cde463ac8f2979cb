// src/slicer.rs
//
// Slice key derivation and the slice key router used by the executors.

use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::data_model::{NormalizedInput, SliceKey};

/// Describes one family of slices.
///
/// An empty spec is the overall slice. `feature_values` pins columns to a single
/// value; `columns` produces one slice per distinct value of each listed column.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceSpec {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub feature_values: BTreeMap<String, String>,
}

impl SliceSpec {
    pub fn overall() -> Self {
        SliceSpec::default()
    }

    pub fn is_overall(&self) -> bool {
        self.columns.is_empty() && self.feature_values.is_empty()
    }

    /// Slice keys this spec assigns to an example with the given features.
    /// Empty when the example does not belong to any slice of this spec.
    pub fn slice_keys_for(&self, features: &BTreeMap<String, Value>) -> Vec<SliceKey> {
        let mut fixed = Vec::with_capacity(self.feature_values.len());
        for (column, expected) in &self.feature_values {
            let values = render_feature(features.get(column));
            if !values.iter().any(|v| v == expected) {
                return Vec::new();
            }
            fixed.push((column.clone(), expected.clone()));
        }

        let mut per_column = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = render_feature(features.get(column));
            if values.is_empty() {
                return Vec::new();
            }
            per_column.push(
                values
                    .into_iter()
                    .unique()
                    .map(|v| (column.clone(), v))
                    .collect::<Vec<_>>(),
            );
        }

        if per_column.is_empty() {
            fixed.sort();
            return vec![SliceKey(fixed)];
        }

        per_column
            .into_iter()
            .multi_cartesian_product()
            .map(|combination| {
                let mut pairs = fixed.clone();
                pairs.extend(combination);
                pairs.sort();
                SliceKey(pairs)
            })
            .collect()
    }
}

// Scalars render to one value, arrays to one per element. Null, objects and
// missing features are not sliceable.
fn render_feature(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(render_scalar).collect(),
        Some(other) => render_scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Pairs every input with each slice key it belongs to under `specs`.
///
/// No specs means the overall slice only. A key produced by several specs for
/// the same input is emitted once.
pub fn slice_inputs<'a>(
    inputs: &'a [NormalizedInput],
    specs: &[SliceSpec],
) -> Vec<(SliceKey, &'a NormalizedInput)> {
    if specs.is_empty() {
        return inputs.iter().map(|input| (SliceKey::overall(), input)).collect();
    }

    let mut pairs = Vec::with_capacity(inputs.len() * specs.len());
    for input in inputs {
        let keys: BTreeSet<SliceKey> = specs
            .iter()
            .flat_map(|spec| spec.slice_keys_for(&input.features))
            .collect();
        pairs.extend(keys.into_iter().map(|key| (key, input)));
    }
    debug!(
        num_inputs = inputs.len(),
        num_specs = specs.len(),
        num_pairs = pairs.len(),
        "Sliced inputs"
    );
    pairs
}

/// Groups keyed records by key. Every record lands in exactly one group.
pub fn group_by_slice<K: Ord + Clone, V>(pairs: &[(K, V)]) -> BTreeMap<K, Vec<&V>> {
    let mut groups: BTreeMap<K, Vec<&V>> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(key.clone()).or_default().push(value);
    }
    groups
}
