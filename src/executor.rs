use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, instrument, warn};

use crate::error::{MetricError, Result};
use crate::slicer::group_by_slice;
use crate::utils::prometheus_metrics::{
    ACCUMULATOR_MERGES_TOTAL, COMBINER_ERRORS_TOTAL, EXAMPLES_COMBINED_TOTAL,
    SLICE_RESULTS_EMITTED_TOTAL,
};

/// A mergeable aggregation: fold inputs into an accumulator, merge partial
/// accumulators, extract the final value.
///
/// `merge_accumulators` must be associative and commutative. Executors call it
/// in any order and any number of times, including zero for single-partition input.
pub trait Combiner: Send + Sync {
    type Input: Sync;
    type Accumulator: Send;
    type Output: Send;

    fn name(&self) -> &'static str; // For logging/error reporting

    fn create_accumulator(&self) -> Self::Accumulator;

    fn add_input(&self, accumulator: &mut Self::Accumulator, input: &Self::Input) -> Result<()>;

    fn merge_accumulators(
        &self,
        left: Self::Accumulator,
        right: Self::Accumulator,
    ) -> Self::Accumulator;

    fn extract_output(&self, accumulator: Self::Accumulator) -> Self::Output;
}

/// The "combine per key" capability an engine offers to combiners.
pub trait CombinePerKey: Send + Sync {
    fn name(&self) -> &'static str;

    /// Groups `inputs` by key and folds each group through `combiner`,
    /// returning one output per distinct key.
    fn combine_per_key<K, V, C>(&self, inputs: &[(K, V)], combiner: &C) -> Result<BTreeMap<K, C::Output>>
    where
        K: Ord + Clone + Send + Sync,
        V: Borrow<C::Input> + Sync,
        C: Combiner;
}

/// Folds one partition into a fresh accumulator. Errors are tagged with the combiner name.
pub fn fold_partition<V, C>(combiner: &C, partition: &[&V]) -> Result<C::Accumulator>
where
    V: Borrow<C::Input>,
    C: Combiner,
{
    let mut accumulator = combiner.create_accumulator();
    for item in partition {
        let input = <V as Borrow<C::Input>>::borrow(*item);
        combiner
            .add_input(&mut accumulator, input)
            .map_err(|e| {
                COMBINER_ERRORS_TOTAL.inc();
                MetricError::CombinerError {
                    combiner_name: combiner.name().to_string(),
                    source: Box::new(e),
                }
            })?;
    }
    EXAMPLES_COMBINED_TOTAL.inc_by(partition.len() as f64);
    Ok(accumulator)
}

fn merge_counted<C: Combiner>(
    combiner: &C,
    left: C::Accumulator,
    right: C::Accumulator,
) -> C::Accumulator {
    ACCUMULATOR_MERGES_TOTAL.inc();
    combiner.merge_accumulators(left, right)
}

/// Sequential engine: every key is folded as a single partition, no merges.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        LocalExecutor
    }
}

impl CombinePerKey for LocalExecutor {
    fn name(&self) -> &'static str {
        "LocalExecutor"
    }

    #[instrument(skip_all, fields(combiner = combiner.name(), num_inputs = inputs.len()))]
    fn combine_per_key<K, V, C>(&self, inputs: &[(K, V)], combiner: &C) -> Result<BTreeMap<K, C::Output>>
    where
        K: Ord + Clone + Send + Sync,
        V: Borrow<C::Input> + Sync,
        C: Combiner,
    {
        let groups = group_by_slice(inputs);
        debug!(num_keys = groups.len(), "Folding groups sequentially");

        let mut results = BTreeMap::new();
        for (key, group) in groups {
            let accumulator = fold_partition(combiner, &group)?;
            results.insert(key, combiner.extract_output(accumulator));
            SLICE_RESULTS_EMITTED_TOTAL.inc();
        }
        Ok(results)
    }
}

/// Parallel engine: splits each key's group into partitions, folds them on a
/// rayon pool and merges the partial accumulators in whatever order rayon
/// reduces them.
pub struct ParallelExecutor {
    num_partitions: usize,
    pool: Option<Arc<ThreadPool>>, // None runs on the global rayon pool
}

impl ParallelExecutor {
    pub fn new(num_partitions: usize, num_threads: Option<usize>) -> Result<Self> {
        if num_partitions == 0 {
            return Err(MetricError::ConfigValidationError(
                "ParallelExecutor: num_partitions must be greater than 0".to_string(),
            ));
        }
        let pool = match num_threads {
            Some(0) => {
                return Err(MetricError::ConfigValidationError(
                    "ParallelExecutor: num_threads must be greater than 0".to_string(),
                ))
            }
            Some(n) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new().num_threads(n).build()?,
            )),
            None => None,
        };
        Ok(ParallelExecutor {
            num_partitions,
            pool,
        })
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn combine_groups<K, V, C>(
        &self,
        groups: BTreeMap<K, Vec<&V>>,
        combiner: &C,
    ) -> Result<BTreeMap<K, C::Output>>
    where
        K: Ord + Send + Sync,
        V: Borrow<C::Input> + Sync,
        C: Combiner,
    {
        groups
            .into_par_iter()
            .map(|(key, group)| -> Result<(K, C::Output)> {
                let chunk_size = partition_size(group.len(), self.num_partitions);
                let accumulator = group
                    .par_chunks(chunk_size)
                    .map(|partition| fold_partition(combiner, partition))
                    .try_reduce(
                        || combiner.create_accumulator(),
                        |left, right| Ok(merge_counted(combiner, left, right)),
                    )?;
                SLICE_RESULTS_EMITTED_TOTAL.inc();
                Ok((key, combiner.extract_output(accumulator)))
            })
            .collect()
    }
}

impl CombinePerKey for ParallelExecutor {
    fn name(&self) -> &'static str {
        "ParallelExecutor"
    }

    #[instrument(skip_all, fields(combiner = combiner.name(), num_inputs = inputs.len(), num_partitions = self.num_partitions))]
    fn combine_per_key<K, V, C>(&self, inputs: &[(K, V)], combiner: &C) -> Result<BTreeMap<K, C::Output>>
    where
        K: Ord + Clone + Send + Sync,
        V: Borrow<C::Input> + Sync,
        C: Combiner,
    {
        if inputs.is_empty() {
            warn!("Combine requested on an empty input set.");
        }
        let groups = group_by_slice(inputs);
        debug!(num_keys = groups.len(), "Folding groups in parallel");

        match &self.pool {
            Some(pool) => pool.install(|| self.combine_groups(groups, combiner)),
            None => self.combine_groups(groups, combiner),
        }
    }
}

/// Chunk length that splits `len` items into at most `num_partitions` chunks.
fn partition_size(len: usize, num_partitions: usize) -> usize {
    len.div_ceil(num_partitions.max(1)).max(1)
}
