//! Symbolic state maps: finite mappings from state ids to parameter sets.
//!
//! Eager maps own their values; lazy views ([`AndStateMap`], [`OrStateMap`],
//! [`ComplementStateMap`]) keep only their operands and a cached domain, and
//! compute values on demand. Mutable maps support a single monotone update,
//! [`MutableStateMap::set_or_union`].

pub mod eager;
pub mod lazy;
pub mod mutable;
pub mod set;

pub use eager::{
    constant_map, ArrayStateMap, ConstantStateMap, EmptyStateMap, HashStateMap, RangeStateMap,
    SingletonStateMap,
};
pub use lazy::{AndStateMap, ComplementStateMap, OrStateMap};
pub use mutable::{ArrayMutableMap, HashMutableMap, MutableStateMap};
pub use set::StateSet;

use parcheck_params::{AlgebraError, Solver};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A vertex of the transition system, in `0..state_count`.
pub type State = usize;

/// State map error.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("state {state} outside of map span {start}..{end}")]
    OutOfRange {
        state: State,
        start: State,
        end: State,
    },

    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

pub type MapResult<T> = Result<T, MapError>;

/// A finite mapping `State -> P`.
///
/// For eager maps `contains(s)` implies `get(s)` is a non-empty set. Lazy
/// views follow the membership rule of their combinator instead, so their
/// values may be empty; [`StateMap::entries`] never yields empty values.
pub trait StateMap<P>: Send + Sync + fmt::Debug {
    /// Size of the global state space this map is defined over.
    fn state_count(&self) -> usize;

    fn get(&self, state: State) -> Option<P>;

    fn contains(&self, state: State) -> bool;

    /// States with a mapping. Order is consistent between calls on one map.
    fn states(&self) -> Box<dyn Iterator<Item = State> + '_>;

    /// `(state, value)` pairs, in the same order as [`StateMap::states`].
    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_>;

    /// O(1) over-approximation of the number of entries.
    fn size_hint(&self) -> usize;

    /// Candidate keys as a bit vector.
    fn domain(&self) -> Cow<'_, StateSet> {
        Cow::Owned(StateSet::from_states(self.state_count(), self.states()))
    }
}

/// Shared handle to an immutable state map.
pub type SharedMap<P> = Arc<dyn StateMap<P>>;

/// Force `map` into an eager map holding only satisfiable values.
pub fn materialize<S: Solver>(solver: &S, map: &dyn StateMap<S::Params>) -> HashStateMap<S::Params> {
    let mut out = HashStateMap::with_capacity(map.state_count(), map.size_hint());
    for (state, value) in map.entries() {
        if solver.is_sat(&value) {
            out.insert(state, value);
        }
    }
    out
}

/// Copy `map` from the domain of `from` into the domain of `to`.
pub fn transfer_map<S: Solver>(
    map: &dyn StateMap<S::Params>,
    from: &S,
    to: &S,
) -> MapResult<HashStateMap<S::Params>> {
    let mut out = HashStateMap::with_capacity(map.state_count(), map.size_hint());
    for (state, value) in map.entries() {
        out.insert(state, from.transfer_to(&value, to)?);
    }
    Ok(out)
}

/// Render a map as `{state: colors, ...}` in increasing state order.
pub fn render<S: Solver>(solver: &S, map: &dyn StateMap<S::Params>) -> String {
    let mut entries: Vec<(State, S::Params)> = map.entries().collect();
    entries.sort_by_key(|(s, _)| *s);
    let body: Vec<String> = entries
        .iter()
        .map(|(s, p)| format!("{s}: {}", solver.display(p)))
        .collect();
    format!("{{{}}}", body.join(", "))
}

/// Semantic equality of two maps over the states either one contains.
pub fn maps_equal<S: Solver>(
    solver: &S,
    a: &dyn StateMap<S::Params>,
    b: &dyn StateMap<S::Params>,
) -> bool {
    let same = |x: Option<S::Params>, y: Option<S::Params>| match (x, y) {
        (Some(x), Some(y)) => solver.equal(&x, &y),
        (Some(v), None) | (None, Some(v)) => solver.is_not_sat(&v),
        (None, None) => true,
    };
    a.states().all(|s| same(a.get(s), b.get(s))) && b.states().all(|s| same(a.get(s), b.get(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcheck_params::ExplicitSolver;

    #[test]
    fn test_materialize_drops_empty_values() {
        let solver = Arc::new(ExplicitSolver::new(4));
        let left: SharedMap<_> = Arc::new(RangeStateMap::new(0..3, solver.colors(&[0]), 5));
        let right: SharedMap<_> = Arc::new(RangeStateMap::new(1..4, solver.colors(&[1]), 5));
        let view = AndStateMap::new(solver.clone(), left, right);
        assert!(view.contains(1));

        let eager = materialize(solver.as_ref(), &view);
        assert_eq!(eager.size_hint(), 0);
        assert!(!eager.contains(1));
    }

    #[test]
    fn test_transfer_map_between_solvers() {
        let a = ExplicitSolver::new(3);
        let b = ExplicitSolver::new(3);
        let map = SingletonStateMap::new(2, a.colors(&[1]), 4);
        let moved = transfer_map(&map, &a, &b).unwrap();
        assert!(b.equal(&moved.get(2).unwrap(), &b.colors(&[1])));

        let c = ExplicitSolver::new(5);
        assert!(matches!(
            transfer_map(&map, &a, &c),
            Err(MapError::Algebra(AlgebraError::DomainMismatch { .. }))
        ));
    }

    #[test]
    fn test_render_sorted() {
        let solver = parcheck_params::BoolSolver::new();
        let mut map = HashStateMap::new(5);
        map.insert(3, true);
        map.insert(1, true);
        assert_eq!(render(&solver, &map), "{1: tt, 3: tt}");
    }
}
