//! Memoized operator nodes and the per-partition evaluation context.

use crate::config::CheckConfig;
use crate::{CheckError, CheckResult};
use parcheck_channel::{Channel, Incoming, Outgoing};
use parcheck_map::{ConstantStateMap, MutableStateMap, SharedMap, State, StateSet};
use parcheck_model::{Model, PartitionFunction, PartitionId};
use parcheck_params::Solver;
use rayon::prelude::*;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::debug;

/// Everything one partition's operators evaluate against.
pub(crate) struct Context<S: Solver> {
    pub solver: Arc<S>,
    pub model: Arc<dyn Model<S::Params>>,
    pub partition: Arc<dyn PartitionFunction>,
    pub channel: Arc<dyn Channel<S::Params>>,
    pub config: CheckConfig,
    local: SharedMap<S::Params>,
    rounds: AtomicUsize,
}

impl<S: Solver + 'static> Context<S> {
    pub fn new(
        solver: Arc<S>,
        model: Arc<dyn Model<S::Params>>,
        partition: Arc<dyn PartitionFunction>,
        channel: Arc<dyn Channel<S::Params>>,
        config: CheckConfig,
    ) -> Self {
        let domain = StateSet::from_states(partition.state_count(), partition.local_states());
        let local: SharedMap<S::Params> = Arc::new(ConstantStateMap::new(domain, solver.tt()));
        Self {
            solver,
            model,
            partition,
            channel,
            config,
            local,
            rounds: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> PartitionId {
        self.partition.partition_id()
    }

    pub fn state_count(&self) -> usize {
        self.partition.state_count()
    }

    /// `tt` on every local state.
    pub fn local_true(&self) -> SharedMap<S::Params> {
        Arc::clone(&self.local)
    }

    pub fn rounds(&self) -> usize {
        self.rounds.load(Ordering::Relaxed)
    }

    /// One collective round.
    pub fn exchange(&self, outgoing: Outgoing<S::Params>) -> CheckResult<Incoming<S::Params>> {
        self.rounds.fetch_add(1, Ordering::Relaxed);
        Ok(self.channel.map_reduce(outgoing)?)
    }

    /// Send `local` to every other partition and return the union of what
    /// every partition sent, ours included.
    pub fn broadcast(&self, local: Vec<(State, S::Params)>) -> CheckResult<Vec<(State, S::Params)>> {
        let me = self.id();
        let outgoing = (0..self.partition.partition_count())
            .map(|to| (to != me && !local.is_empty()).then(|| local.clone()))
            .collect();
        let mut all = self.exchange(outgoing)?.unwrap_or_default();
        all.extend(local);
        Ok(all)
    }

    /// Fresh per-owner staging maps for remote updates.
    pub fn staging(&self) -> Staging<S::Params> {
        let me = self.id();
        let maps = (0..self.partition.partition_count())
            .map(|owner| {
                (owner != me).then(|| self.partition.new_local_mutable_map(Arc::clone(&self.solver), owner))
            })
            .collect();
        Staging { maps }
    }

    /// Apply `f` to every state in `states`, keeping the `Some` results in
    /// input order. Runs on the rayon pool for large inputs when enabled.
    pub fn par_filter_map<T, F>(&self, states: &[State], f: F) -> Vec<(State, T)>
    where
        T: Send,
        F: Fn(State) -> Option<T> + Sync + Send,
    {
        if self.config.parallel && states.len() >= self.config.parallel_threshold {
            states.par_iter().filter_map(|s| f(*s).map(|v| (*s, v))).collect()
        } else {
            states.iter().filter_map(|s| f(*s).map(|v| (*s, v))).collect()
        }
    }
}

/// Per-owner staging of values bound for other partitions.
pub(crate) struct Staging<P> {
    maps: Vec<Option<Box<dyn MutableStateMap<P>>>>,
}

impl<P> Staging<P> {
    /// Union `value` into the entry of `state` staged for `owner`.
    pub fn push(&mut self, owner: PartitionId, state: State, value: &P) -> CheckResult<()> {
        if let Some(map) = self.maps.get_mut(owner).and_then(Option::as_mut) {
            map.set_or_union(state, value)?;
        }
        Ok(())
    }

    /// Drain everything staged into an outgoing array.
    pub fn take_outgoing(&mut self) -> Outgoing<P> {
        self.maps
            .iter_mut()
            .map(|map| {
                map.as_mut()
                    .map(|m| m.take_entries())
                    .filter(|entries| !entries.is_empty())
            })
            .collect()
    }
}

/// Body of an operator, run at most once.
pub(crate) trait Evaluate<S: Solver>: Send {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>>;
}

enum Node<S: Solver> {
    Pending(Box<dyn Evaluate<S>>),
    Evaluating,
    Done(SharedMap<S::Params>),
}

/// Single-flight memoized node of the operator graph.
///
/// The body, and with it every child handle it owns, is dropped as soon as
/// it has run.
pub(crate) struct Operator<S: Solver> {
    label: String,
    node: Mutex<Node<S>>,
}

pub(crate) type OperatorRef<S> = Arc<Operator<S>>;

impl<S: Solver + 'static> Operator<S> {
    pub fn new(label: String, body: Box<dyn Evaluate<S>>) -> OperatorRef<S> {
        Arc::new(Self {
            label,
            node: Mutex::new(Node::Pending(body)),
        })
    }

    pub fn compute(&self, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let body = {
            let mut node = self.node.lock().unwrap_or_else(PoisonError::into_inner);
            match mem::replace(&mut *node, Node::Evaluating) {
                Node::Done(map) => {
                    *node = Node::Done(Arc::clone(&map));
                    return Ok(map);
                }
                Node::Evaluating => {
                    return Err(CheckError::Cycle {
                        operator: self.label.clone(),
                    })
                }
                Node::Pending(body) => body,
            }
        };

        let started = Instant::now();
        let ops_before = ctx.solver.stats().snapshot();
        let rounds_before = ctx.rounds();
        let map = body.evaluate(ctx)?;
        debug!(
            partition = ctx.id(),
            operator = %self.label,
            entries = map.size_hint(),
            rounds = ctx.rounds() - rounds_before,
            solver_ops = ctx.solver.stats().snapshot().since(&ops_before).total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "operator computed"
        );

        *self.node.lock().unwrap_or_else(PoisonError::into_inner) = Node::Done(Arc::clone(&map));
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcheck_channel::NoOpChannel;
    use parcheck_map::{EmptyStateMap, StateMap};
    use parcheck_model::{ExplicitModel, Partition};
    use parcheck_params::BoolSolver;

    fn context() -> Context<BoolSolver> {
        let solver = Arc::new(BoolSolver::new());
        let model = ExplicitModel::builder(solver.clone(), 3).build().unwrap();
        Context::new(
            solver,
            Arc::new(model),
            Arc::new(Partition::single(3)),
            Arc::new(NoOpChannel::new()),
            CheckConfig::default(),
        )
    }

    struct Counting(Arc<AtomicUsize>);

    impl Evaluate<BoolSolver> for Counting {
        fn evaluate(self: Box<Self>, ctx: &Context<BoolSolver>) -> CheckResult<SharedMap<bool>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EmptyStateMap::new(ctx.state_count())))
        }
    }

    struct Recursive(Arc<Mutex<Option<OperatorRef<BoolSolver>>>>);

    impl Evaluate<BoolSolver> for Recursive {
        fn evaluate(self: Box<Self>, ctx: &Context<BoolSolver>) -> CheckResult<SharedMap<bool>> {
            let me = self.0.lock().unwrap().take().unwrap();
            me.compute(ctx)
        }
    }

    #[test]
    fn test_body_runs_once() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let op = Operator::new("count".into(), Box::new(Counting(calls.clone())));
        op.compute(&ctx).unwrap();
        op.compute(&ctx).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrance_is_a_cycle() {
        let ctx = context();
        let slot = Arc::new(Mutex::new(None));
        let op = Operator::new("loop".into(), Box::new(Recursive(slot.clone())));
        *slot.lock().unwrap() = Some(op.clone());
        assert!(matches!(
            op.compute(&ctx),
            Err(CheckError::Cycle { operator }) if operator == "loop"
        ));
    }

    #[test]
    fn test_local_true_and_broadcast() {
        let ctx = context();
        assert_eq!(ctx.local_true().states().collect::<Vec<_>>(), vec![0, 1, 2]);
        let all = ctx.broadcast(vec![(1, true)]).unwrap();
        assert_eq!(all, vec![(1, true)]);
        assert_eq!(ctx.rounds(), 1);
    }

    #[test]
    fn test_staging_skips_own_partition() {
        let ctx = context();
        let mut staging = ctx.staging();
        staging.push(0, 2, &true).unwrap();
        assert_eq!(staging.take_outgoing(), vec![None]);
    }
}
