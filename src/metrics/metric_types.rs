use crate::data_model::MetricKey;
use crate::executor::Combiner;

/// A combiner paired with the metric keys its output is addressed by.
#[derive(Debug, Clone)]
pub struct MetricComputation<C: Combiner> {
    pub keys: Vec<MetricKey>,
    pub combiner: C,
}

impl<C: Combiner> MetricComputation<C> {
    pub fn new(keys: Vec<MetricKey>, combiner: C) -> Self {
        MetricComputation { keys, combiner }
    }
}
