//! State ownership: which partition evaluates which states.
//!
//! Every partition of a run must be built from the same strategy, state
//! count and partition count, so that all of them agree on `owner`.

use parcheck_map::{ArrayMutableMap, HashMutableMap, MutableStateMap, State};
use parcheck_params::Solver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Index of a partition, in `0..partition_count`.
pub type PartitionId = usize;

/// Partitioning error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("partition count must be positive")]
    NoPartitions,

    #[error("partition {id} out of range for {count} partitions")]
    InvalidId { id: PartitionId, count: usize },

    #[error("block size must be positive")]
    EmptyBlock,

    #[error("expected {expected} intervals, found {found}")]
    IntervalCount { expected: usize, found: usize },

    #[error("intervals must tile 0..{state_count}: gap or overlap at state {at}")]
    IntervalTiling { state_count: usize, at: State },
}

pub type PartitionResult<T> = Result<T, PartitionError>;

/// How states are assigned to partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// `state % partition_count`.
    Hash,
    /// Contiguous chunks of `size` states, dealt round-robin.
    Block { size: usize },
    /// One contiguous range per partition, of ceil-divided size.
    #[default]
    Uniform,
    /// Explicit ranges, one per partition, tiling the state space in order.
    Interval { ranges: Vec<Range<State>> },
}

/// Ownership function seen from one partition.
pub trait PartitionFunction: Send + Sync + fmt::Debug {
    fn partition_id(&self) -> PartitionId;

    fn partition_count(&self) -> usize;

    fn state_count(&self) -> usize;

    /// The partition owning `state`.
    fn owner(&self, state: State) -> PartitionId;

    #[inline]
    fn is_local(&self, state: State) -> bool {
        self.owner(state) == self.partition_id()
    }

    /// States owned by this partition, in increasing order.
    fn local_states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        let id = self.partition_id();
        Box::new((0..self.state_count()).filter(move |s| self.owner(*s) == id))
    }

    /// Smallest contiguous range containing every local state.
    fn local_span(&self) -> Range<State>;

    /// Whether local states fill at least half of [`local_span`](Self::local_span).
    fn is_dense(&self) -> bool {
        self.local_states().count() * 2 >= self.local_span().len()
    }
}

impl dyn PartitionFunction {
    /// Best mutable layout for values owned by `for_partition`: dense over
    /// our own span when it is mostly ours, sparse otherwise and for the
    /// remote states staged for transfer.
    pub fn new_local_mutable_map<S: Solver + 'static>(
        &self,
        solver: Arc<S>,
        for_partition: PartitionId,
    ) -> Box<dyn MutableStateMap<S::Params>> {
        if for_partition == self.partition_id() && self.is_dense() {
            Box::new(ArrayMutableMap::new(solver, self.local_span(), self.state_count()))
        } else {
            Box::new(HashMutableMap::new(solver, self.state_count()))
        }
    }
}

/// A [`PartitionStrategy`] instantiated for one partition of a run.
#[derive(Debug, Clone)]
pub struct Partition {
    strategy: PartitionStrategy,
    id: PartitionId,
    count: usize,
    state_count: usize,
    span: Range<State>,
    dense: bool,
}

impl Partition {
    pub fn new(
        strategy: PartitionStrategy,
        id: PartitionId,
        count: usize,
        state_count: usize,
    ) -> PartitionResult<Self> {
        if count == 0 {
            return Err(PartitionError::NoPartitions);
        }
        if id >= count {
            return Err(PartitionError::InvalidId { id, count });
        }
        match &strategy {
            PartitionStrategy::Block { size } if *size == 0 => return Err(PartitionError::EmptyBlock),
            PartitionStrategy::Interval { ranges } => validate_intervals(ranges, count, state_count)?,
            _ => {}
        }
        let mut partition = Self {
            strategy,
            id,
            count,
            state_count,
            span: 0..0,
            dense: true,
        };
        partition.span = partition.compute_span();
        partition.dense = match &partition.strategy {
            PartitionStrategy::Uniform | PartitionStrategy::Interval { .. } => true,
            PartitionStrategy::Hash | PartitionStrategy::Block { .. } => {
                partition.local_states().count() * 2 >= partition.span.len()
            }
        };
        debug!(
            partition = id,
            partitions = count,
            span = ?partition.span,
            dense = partition.dense,
            "created partition"
        );
        Ok(partition)
    }

    /// The only partition of a single-worker run.
    pub fn single(state_count: usize) -> Self {
        Self {
            strategy: PartitionStrategy::Uniform,
            id: 0,
            count: 1,
            state_count,
            span: 0..state_count,
            dense: true,
        }
    }

    /// All partitions of a run, index-aligned with their id.
    pub fn all(
        strategy: &PartitionStrategy,
        count: usize,
        state_count: usize,
    ) -> PartitionResult<Vec<Partition>> {
        (0..count)
            .map(|id| Partition::new(strategy.clone(), id, count, state_count))
            .collect()
    }

    pub fn strategy(&self) -> &PartitionStrategy {
        &self.strategy
    }

    fn uniform_chunk(&self) -> usize {
        self.state_count.div_ceil(self.count).max(1)
    }

    fn compute_span(&self) -> Range<State> {
        match &self.strategy {
            PartitionStrategy::Uniform => {
                let chunk = self.uniform_chunk();
                let start = (self.id * chunk).min(self.state_count);
                let end = ((self.id + 1) * chunk).min(self.state_count);
                start..end
            }
            PartitionStrategy::Interval { ranges } => ranges[self.id].clone(),
            PartitionStrategy::Hash | PartitionStrategy::Block { .. } => {
                let mut local = self.local_states();
                match local.next() {
                    None => 0..0,
                    Some(first) => {
                        let last = local.last().unwrap_or(first);
                        first..last + 1
                    }
                }
            }
        }
    }
}

fn validate_intervals(
    ranges: &[Range<State>],
    count: usize,
    state_count: usize,
) -> PartitionResult<()> {
    if ranges.len() != count {
        return Err(PartitionError::IntervalCount {
            expected: count,
            found: ranges.len(),
        });
    }
    let mut next = 0;
    for range in ranges {
        if range.start != next || range.end < range.start {
            return Err(PartitionError::IntervalTiling {
                state_count,
                at: next,
            });
        }
        next = range.end;
    }
    if next != state_count {
        return Err(PartitionError::IntervalTiling {
            state_count,
            at: next,
        });
    }
    Ok(())
}

impl PartitionFunction for Partition {
    fn partition_id(&self) -> PartitionId {
        self.id
    }

    fn partition_count(&self) -> usize {
        self.count
    }

    fn state_count(&self) -> usize {
        self.state_count
    }

    #[inline]
    fn owner(&self, state: State) -> PartitionId {
        match &self.strategy {
            PartitionStrategy::Hash => state % self.count,
            PartitionStrategy::Block { size } => (state / size) % self.count,
            PartitionStrategy::Uniform => (state / self.uniform_chunk()).min(self.count - 1),
            PartitionStrategy::Interval { ranges } => {
                // Ranges tile the state space in order, so the owner is the
                // last range starting at or before `state`.
                let idx = ranges.partition_point(|r| r.start <= state);
                let mut owner = idx.saturating_sub(1);
                // Skip empty ranges sharing the same start.
                while owner > 0 && ranges[owner].is_empty() {
                    owner -= 1;
                }
                owner
            }
        }
    }

    fn local_states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        match &self.strategy {
            PartitionStrategy::Uniform | PartitionStrategy::Interval { .. } => Box::new(self.span.clone()),
            PartitionStrategy::Hash => Box::new((self.id..self.state_count).step_by(self.count)),
            PartitionStrategy::Block { size } => {
                let size = *size;
                let stride = size * self.count;
                let state_count = self.state_count;
                Box::new(
                    (self.id * size..state_count)
                        .step_by(stride)
                        .flat_map(move |start| start..(start + size).min(state_count)),
                )
            }
        }
    }

    fn local_span(&self) -> Range<State> {
        self.span.clone()
    }

    fn is_dense(&self) -> bool {
        self.dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcheck_params::ExplicitSolver;

    #[test]
    fn test_uniform_ranges() {
        let parts = Partition::all(&PartitionStrategy::Uniform, 3, 10).unwrap();
        assert_eq!(parts[0].local_span(), 0..4);
        assert_eq!(parts[1].local_span(), 4..8);
        assert_eq!(parts[2].local_span(), 8..10);
        assert_eq!(parts[0].owner(9), 2);
    }

    #[test]
    fn test_uniform_with_more_partitions_than_states() {
        let parts = Partition::all(&PartitionStrategy::Uniform, 4, 2).unwrap();
        assert_eq!(parts[0].local_span(), 0..1);
        assert_eq!(parts[1].local_span(), 1..2);
        assert_eq!(parts[2].local_span(), 2..2);
        assert_eq!(parts[3].local_states().count(), 0);
    }

    #[test]
    fn test_block_wraps() {
        let p = Partition::new(PartitionStrategy::Block { size: 2 }, 1, 2, 9).unwrap();
        assert_eq!(p.local_states().collect::<Vec<_>>(), vec![2, 3, 6, 7]);
        assert_eq!(p.local_span(), 2..8);
        assert_eq!(p.owner(8), 0);
    }

    #[test]
    fn test_hash_local_states() {
        let p = Partition::new(PartitionStrategy::Hash, 2, 3, 10).unwrap();
        assert_eq!(p.local_states().collect::<Vec<_>>(), vec![2, 5, 8]);
        assert_eq!(p.local_span(), 2..9);
    }

    #[test]
    fn test_interval_validation() {
        let good = PartitionStrategy::Interval {
            ranges: vec![0..3, 3..3, 3..7],
        };
        let p = Partition::new(good, 2, 3, 7).unwrap();
        assert_eq!(p.owner(3), 2);
        assert_eq!(p.owner(2), 0);

        let gap = PartitionStrategy::Interval {
            ranges: vec![0..3, 4..7],
        };
        assert_eq!(
            Partition::new(gap, 0, 2, 7).unwrap_err(),
            PartitionError::IntervalTiling { state_count: 7, at: 3 }
        );

        let short = PartitionStrategy::Interval { ranges: vec![0..7] };
        assert!(matches!(
            Partition::new(short, 0, 2, 7),
            Err(PartitionError::IntervalCount { .. })
        ));
    }

    #[test]
    fn test_invalid_construction() {
        assert_eq!(
            Partition::new(PartitionStrategy::Hash, 0, 0, 5).unwrap_err(),
            PartitionError::NoPartitions
        );
        assert!(matches!(
            Partition::new(PartitionStrategy::Hash, 3, 3, 5),
            Err(PartitionError::InvalidId { id: 3, count: 3 })
        ));
        assert_eq!(
            Partition::new(PartitionStrategy::Block { size: 0 }, 0, 1, 5).unwrap_err(),
            PartitionError::EmptyBlock
        );
    }

    #[test]
    fn test_local_mutable_map_layout() {
        let solver = Arc::new(ExplicitSolver::new(2));
        let p = Partition::new(PartitionStrategy::Uniform, 0, 2, 10).unwrap();
        let p: &dyn PartitionFunction = &p;

        let mut local = p.new_local_mutable_map(solver.clone(), 0);
        assert!(local.set_or_union(4, &solver.tt()).unwrap());
        assert!(local.set_or_union(5, &solver.tt()).is_err());

        let mut remote = p.new_local_mutable_map(solver.clone(), 1);
        assert!(remote.set_or_union(9, &solver.tt()).unwrap());
    }

    #[test]
    fn test_scattered_partition_uses_sparse_layout() {
        let solver = Arc::new(ExplicitSolver::new(2));
        let p = Partition::new(PartitionStrategy::Hash, 2, 3, 10).unwrap();
        assert!(!p.is_dense());
        let p: &dyn PartitionFunction = &p;

        // Only 2, 5 and 8 are ours; no array over 2..9 is allocated.
        let mut local = p.new_local_mutable_map(solver.clone(), 2);
        assert!(local.set_or_union(5, &solver.tt()).unwrap());
        assert!(local.set_or_union(0, &solver.tt()).unwrap());

        let halves = Partition::new(PartitionStrategy::Hash, 0, 2, 10).unwrap();
        assert!(halves.is_dense());
        let blocks = Partition::new(PartitionStrategy::Block { size: 2 }, 1, 4, 64).unwrap();
        assert!(!blocks.is_dense());
        assert!(Partition::single(64).is_dense());
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&PartitionStrategy::Block { size: 4 }).unwrap();
        assert_eq!(json, r#"{"kind":"block","size":4}"#);
        let back: PartitionStrategy = serde_json::from_str(r#"{"kind":"hash"}"#).unwrap();
        assert_eq!(back, PartitionStrategy::Hash);
    }
}
