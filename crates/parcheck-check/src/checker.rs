//! Entry point: run formulas over all partitions of a model.

use crate::config::{CheckConfig, Transport};
use crate::formula::Formula;
use crate::operator::Context;
use crate::ops::{validate, Compiler, Env};
use crate::{CheckError, CheckResult};
use parcheck_channel::{Channel, ChannelError, NoOpChannel, SerializedChannel, SharedMemoryChannel};
use parcheck_map::{materialize, HashStateMap, SharedMap, StateMap};
use parcheck_model::{Model, Partition, PartitionError, PartitionFunction};
use parcheck_params::Solver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Partitioned model checker.
///
/// One worker thread per partition evaluates the formula over the states it
/// owns; workers only interact through their channel endpoints.
pub struct Checker<S: Solver> {
    solver: Arc<S>,
    model: Arc<dyn Model<S::Params>>,
    config: CheckConfig,
}

impl<S: Solver + 'static> Checker<S> {
    pub fn new(solver: Arc<S>, model: Arc<dyn Model<S::Params>>, config: CheckConfig) -> Self {
        Self { solver, model, config }
    }

    pub fn solver(&self) -> &Arc<S> {
        &self.solver
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Evaluate `formula`. Returns one map per partition, index-aligned with
    /// the partition id, each holding only that partition's states.
    pub fn verify(&self, formula: &Formula) -> CheckResult<Vec<SharedMap<S::Params>>> {
        let mut results = self.verify_all(std::slice::from_ref(formula))?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Evaluate `formula` and merge the per-partition results.
    pub fn verify_merged(&self, formula: &Formula) -> CheckResult<HashStateMap<S::Params>> {
        let parts = self.verify(formula)?;
        Ok(merge_partitions(&parts, self.model.state_count()))
    }

    /// Evaluate several formulas in one run, in order. The outer vector is
    /// indexed like `formulas`, the inner one by partition id.
    pub fn verify_all(&self, formulas: &[Formula]) -> CheckResult<Vec<Vec<SharedMap<S::Params>>>> {
        // Configure rayon thread pool if specified
        if self.config.parallel && self.config.num_threads > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.num_threads)
                .build_global()
            {
                debug!(error = %e, "thread pool already initialized, using existing pool");
            }
        }

        for formula in formulas {
            validate(formula, self.model.as_ref())?;
        }

        let count = self.config.partitions;
        if count == 0 {
            return Err(PartitionError::NoPartitions.into());
        }
        let partitions = Partition::all(&self.config.strategy, count, self.model.state_count())?;
        let channels = self.channels(count);

        info!(
            partitions = count,
            states = self.model.state_count(),
            strategy = ?self.config.strategy,
            transport = ?self.config.transport,
            formulas = formulas.len(),
            parallel = self.config.parallel,
            "verification started"
        );
        let started = Instant::now();

        let outcomes: Vec<CheckResult<Vec<SharedMap<S::Params>>>> = thread::scope(|scope| {
            let handles: Vec<_> = partitions
                .into_iter()
                .zip(channels)
                .map(|(partition, channel)| {
                    let id = partition.partition_id();
                    let handle = scope.spawn(move || self.run_worker(partition, channel, formulas));
                    (id, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(CheckError::WorkerPanicked { partition: id }))
                })
                .collect()
        });

        let per_partition = first_failure(outcomes)?;
        info!(
            partitions = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verification finished"
        );

        // Transpose to formula-major order.
        let mut results: Vec<Vec<SharedMap<S::Params>>> = (0..formulas.len()).map(|_| Vec::with_capacity(count)).collect();
        for maps in per_partition {
            for (slot, map) in results.iter_mut().zip(maps) {
                slot.push(map);
            }
        }
        Ok(results)
    }

    fn channels(&self, count: usize) -> Vec<Arc<dyn Channel<S::Params>>> {
        if count == 1 {
            return vec![Arc::new(NoOpChannel::new())];
        }
        match self.config.transport {
            Transport::SharedMemory => SharedMemoryChannel::<S::Params>::group(count)
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn Channel<S::Params>>)
                .collect(),
            Transport::Serialized => SerializedChannel::group(vec![Arc::clone(&self.solver); count])
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn Channel<S::Params>>)
                .collect(),
        }
    }

    /// Body of one worker thread. Any failure, including a panic, tears
    /// down the channel so that the other workers stop too.
    fn run_worker(
        &self,
        partition: Partition,
        channel: Arc<dyn Channel<S::Params>>,
        formulas: &[Formula],
    ) -> CheckResult<Vec<SharedMap<S::Params>>> {
        let id = partition.partition_id();
        let ctx = Context::new(
            Arc::clone(&self.solver),
            Arc::clone(&self.model),
            Arc::new(partition),
            Arc::clone(&channel),
            self.config.clone(),
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            formulas
                .iter()
                .map(|formula| self.evaluate(&ctx, formula))
                .collect::<CheckResult<Vec<_>>>()
        }))
        .unwrap_or(Err(CheckError::WorkerPanicked { partition: id }));

        match &outcome {
            Ok(_) => {
                let stats = channel.stats();
                debug!(
                    partition = id,
                    rounds = stats.rounds,
                    sent = stats.sent,
                    received = stats.received,
                    "worker finished"
                );
            }
            Err(e) => {
                if !matches!(e, CheckError::Channel(ChannelError::Aborted)) {
                    warn!(partition = id, error = %e, "worker failed, aborting run");
                }
                channel.abort();
            }
        }
        outcome
    }

    fn evaluate(&self, ctx: &Context<S>, formula: &Formula) -> CheckResult<SharedMap<S::Params>> {
        let root = Compiler::new().compile(formula, &Env::new())?;
        let map = root.compute(ctx)?;
        drop(root);
        let result = materialize(self.solver.as_ref(), map.as_ref());
        debug!(
            partition = ctx.id(),
            formula = %formula,
            states = result.size_hint(),
            "formula evaluated"
        );
        Ok(Arc::new(result))
    }
}

/// The first real failure in partition order. Workers that only stopped
/// because another one aborted the run are reported last.
fn first_failure<T>(outcomes: Vec<CheckResult<T>>) -> CheckResult<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut aborted = None;
    let mut failure = None;
    for outcome in outcomes {
        match outcome {
            Ok(v) => values.push(v),
            Err(CheckError::Channel(ChannelError::Aborted)) => {
                aborted.get_or_insert(CheckError::Channel(ChannelError::Aborted));
            }
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }
    match failure.or(aborted) {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// Union of per-partition results into one map over the whole state space.
pub fn merge_partitions<P>(parts: &[SharedMap<P>], state_count: usize) -> HashStateMap<P>
where
    P: Clone + Send + Sync + std::fmt::Debug,
{
    let mut merged = HashStateMap::with_capacity(state_count, parts.iter().map(|m| m.size_hint()).sum());
    for part in parts {
        for (state, value) in part.entries() {
            merged.insert(state, value);
        }
    }
    merged
}
