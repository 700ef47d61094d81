//! Monotonically growing state maps.
//!
//! The only mutation is [`MutableStateMap::set_or_union`]; values never
//! shrink. Mutation goes through `&mut self`, so each map has exactly one
//! writer. Other partitions only ever see the values after they are sent
//! through a channel.

use crate::eager::{ArrayStateMap, HashStateMap};
use crate::{MapError, MapResult, SharedMap, State, StateMap};
use ahash::AHashMap;
use parcheck_params::Solver;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// A [`StateMap`] that supports monotone increase.
pub trait MutableStateMap<P>: StateMap<P> {
    /// Union `value` into the value of `state`.
    ///
    /// Returns true iff new satisfiable colors were added.
    fn set_or_union(&mut self, state: State, value: &P) -> MapResult<bool>;

    /// Remove and return all entries, leaving the map empty.
    fn take_entries(&mut self) -> Vec<(State, P)>;

    /// Turn the map into an immutable one.
    fn freeze(self: Box<Self>) -> SharedMap<P>;
}

/// Dense layout over a contiguous span: a partition's own states.
pub struct ArrayMutableMap<S: Solver> {
    solver: Arc<S>,
    start: State,
    values: Vec<Option<S::Params>>,
    len: usize,
    state_count: usize,
}

impl<S: Solver> ArrayMutableMap<S> {
    pub fn new(solver: Arc<S>, span: Range<State>, state_count: usize) -> Self {
        let mut values = Vec::with_capacity(span.len());
        values.resize_with(span.len(), || None);
        Self {
            solver,
            start: span.start,
            values,
            len: 0,
            state_count,
        }
    }

    fn index(&self, state: State) -> MapResult<usize> {
        state
            .checked_sub(self.start)
            .filter(|i| *i < self.values.len())
            .ok_or(MapError::OutOfRange {
                state,
                start: self.start,
                end: self.start + self.values.len(),
            })
    }

    fn slot(&self, state: State) -> Option<&S::Params> {
        state
            .checked_sub(self.start)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_ref())
    }
}

impl<S: Solver> StateMap<S::Params> for ArrayMutableMap<S> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<S::Params> {
        self.slot(state).cloned()
    }

    fn contains(&self, state: State) -> bool {
        self.slot(state).is_some()
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(
            self.values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_some())
                .map(|(i, _)| self.start + i),
        )
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, S::Params)> + '_> {
        Box::new(
            self.values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.as_ref().map(|v| (self.start + i, v.clone()))),
        )
    }

    fn size_hint(&self) -> usize {
        self.len
    }
}

impl<S: Solver> MutableStateMap<S::Params> for ArrayMutableMap<S> {
    fn set_or_union(&mut self, state: State, value: &S::Params) -> MapResult<bool> {
        let i = self.index(state)?;
        let slot = &mut self.values[i];
        match self.solver.try_or(slot.as_ref(), value) {
            Some(union) => {
                if slot.is_none() {
                    self.len += 1;
                }
                *slot = Some(union);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn take_entries(&mut self) -> Vec<(State, S::Params)> {
        let start = self.start;
        let out = self
            .values
            .iter_mut()
            .enumerate()
            .filter_map(|(i, v)| v.take().map(|v| (start + i, v)))
            .collect();
        self.len = 0;
        out
    }

    fn freeze(self: Box<Self>) -> SharedMap<S::Params> {
        let this = *self;
        let solver = this.solver;
        let values = this
            .values
            .into_iter()
            .map(|v| {
                v.map(|mut v| {
                    solver.minimize(&mut v);
                    v
                })
            })
            .collect();
        Arc::new(ArrayStateMap::from_values(this.start, values, this.state_count))
    }
}

/// Sparse layout: stages updates for states owned by another partition.
pub struct HashMutableMap<S: Solver> {
    solver: Arc<S>,
    values: AHashMap<State, S::Params>,
    state_count: usize,
}

impl<S: Solver> HashMutableMap<S> {
    pub fn new(solver: Arc<S>, state_count: usize) -> Self {
        Self {
            solver,
            values: AHashMap::new(),
            state_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Solver> StateMap<S::Params> for HashMutableMap<S> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<S::Params> {
        self.values.get(&state).cloned()
    }

    fn contains(&self, state: State) -> bool {
        self.values.contains_key(&state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.values.keys().copied())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, S::Params)> + '_> {
        Box::new(self.values.iter().map(|(s, v)| (*s, v.clone())))
    }

    fn size_hint(&self) -> usize {
        self.values.len()
    }
}

impl<S: Solver> MutableStateMap<S::Params> for HashMutableMap<S> {
    fn set_or_union(&mut self, state: State, value: &S::Params) -> MapResult<bool> {
        if state >= self.state_count {
            return Err(MapError::OutOfRange {
                state,
                start: 0,
                end: self.state_count,
            });
        }
        match self.solver.try_or(self.values.get(&state), value) {
            Some(union) => {
                self.values.insert(state, union);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn take_entries(&mut self) -> Vec<(State, S::Params)> {
        let mut out: Vec<_> = self.values.drain().collect();
        out.sort_unstable_by_key(|(s, _)| *s);
        out
    }

    fn freeze(self: Box<Self>) -> SharedMap<S::Params> {
        let this = *self;
        Arc::new(HashStateMap::from_table(this.values, this.state_count))
    }
}

impl<S: Solver> fmt::Debug for ArrayMutableMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayMutableMap")
            .field("span", &(self.start..self.start + self.values.len()))
            .field("len", &self.len)
            .finish()
    }
}

impl<S: Solver> fmt::Debug for HashMutableMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMutableMap")
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcheck_params::ExplicitSolver;

    #[test]
    fn test_set_or_union_reports_growth() {
        let s = Arc::new(ExplicitSolver::new(4));
        let mut map = ArrayMutableMap::new(s.clone(), 10..20, 32);

        assert!(map.set_or_union(12, &s.colors(&[0])).unwrap());
        assert!(!map.set_or_union(12, &s.colors(&[0])).unwrap());
        assert!(map.set_or_union(12, &s.colors(&[1])).unwrap());
        assert!(!map.set_or_union(13, &s.ff()).unwrap());
        assert!(!map.contains(13));
        assert_eq!(map.size_hint(), 1);
        assert!(s.equal(&map.get(12).unwrap(), &s.colors(&[0, 1])));
    }

    #[test]
    fn test_dense_map_rejects_out_of_span() {
        let s = Arc::new(ExplicitSolver::new(4));
        let mut map = ArrayMutableMap::new(s.clone(), 10..20, 32);
        assert!(matches!(
            map.set_or_union(20, &s.tt()),
            Err(MapError::OutOfRange { state: 20, start: 10, end: 20 })
        ));
        assert!(map.set_or_union(9, &s.tt()).is_err());

        let mut sparse = HashMutableMap::new(s.clone(), 32);
        assert!(sparse.set_or_union(32, &s.tt()).is_err());
    }

    #[test]
    fn test_take_entries_clears() {
        let s = Arc::new(ExplicitSolver::new(4));
        let mut sparse = HashMutableMap::new(s.clone(), 32);
        sparse.set_or_union(7, &s.colors(&[2])).unwrap();
        sparse.set_or_union(3, &s.colors(&[1])).unwrap();
        let taken = sparse.take_entries();
        assert_eq!(taken.iter().map(|(st, _)| *st).collect::<Vec<_>>(), vec![3, 7]);
        assert!(sparse.is_empty());

        let mut dense = ArrayMutableMap::new(s.clone(), 0..8, 32);
        dense.set_or_union(5, &s.tt()).unwrap();
        assert_eq!(dense.take_entries().len(), 1);
        assert_eq!(dense.size_hint(), 0);
    }

    #[test]
    fn test_freeze_keeps_values() {
        let s = Arc::new(ExplicitSolver::new(4));
        let mut map: Box<dyn MutableStateMap<_>> = Box::new(ArrayMutableMap::new(s.clone(), 0..4, 4));
        map.set_or_union(1, &s.colors(&[3])).unwrap();
        let frozen = map.freeze();
        assert!(s.equal(&frozen.get(1).unwrap(), &s.colors(&[3])));
        assert_eq!(frozen.size_hint(), 1);
    }
}
