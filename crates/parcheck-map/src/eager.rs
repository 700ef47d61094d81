//! Eager state maps that own their values.

use crate::{SharedMap, State, StateMap, StateSet};
use ahash::AHashMap;
use parcheck_params::Solver;
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Dense map over a contiguous span of states.
pub struct ArrayStateMap<P> {
    start: State,
    values: Vec<Option<P>>,
    len: usize,
    state_count: usize,
}

impl<P> ArrayStateMap<P> {
    /// Build from slot values for `start..start + values.len()`.
    pub fn from_values(start: State, values: Vec<Option<P>>, state_count: usize) -> Self {
        let len = values.iter().filter(|v| v.is_some()).count();
        Self {
            start,
            values,
            len,
            state_count,
        }
    }

    /// The span of states this map has slots for.
    pub fn span(&self) -> Range<State> {
        self.start..self.start + self.values.len()
    }

    #[inline]
    fn slot(&self, state: State) -> Option<&P> {
        state
            .checked_sub(self.start)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_ref())
    }
}

impl<P: Clone + Send + Sync + fmt::Debug> StateMap<P> for ArrayStateMap<P> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<P> {
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

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
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

impl<P> fmt::Debug for ArrayStateMap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayStateMap")
            .field("span", &self.span())
            .field("len", &self.len)
            .finish()
    }
}

/// Sparse map backed by a hash table.
pub struct HashStateMap<P> {
    values: AHashMap<State, P>,
    state_count: usize,
}

impl<P> HashStateMap<P> {
    pub fn new(state_count: usize) -> Self {
        Self {
            values: AHashMap::new(),
            state_count,
        }
    }

    pub fn with_capacity(state_count: usize, capacity: usize) -> Self {
        Self {
            values: AHashMap::with_capacity(capacity),
            state_count,
        }
    }

    pub(crate) fn from_table(values: AHashMap<State, P>, state_count: usize) -> Self {
        Self {
            values,
            state_count,
        }
    }

    /// Insert or overwrite a value. The caller keeps values non-empty.
    pub fn insert(&mut self, state: State, value: P) {
        self.values.insert(state, value);
    }
}

impl<P: Clone + Send + Sync + fmt::Debug> StateMap<P> for HashStateMap<P> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<P> {
        self.values.get(&state).cloned()
    }

    fn contains(&self, state: State) -> bool {
        self.values.contains_key(&state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.values.keys().copied())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
        Box::new(self.values.iter().map(|(s, v)| (*s, v.clone())))
    }

    fn size_hint(&self) -> usize {
        self.values.len()
    }
}

impl<P> fmt::Debug for HashStateMap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashStateMap")
            .field("len", &self.values.len())
            .finish()
    }
}

/// A contiguous range of states sharing one value.
#[derive(Debug)]
pub struct RangeStateMap<P> {
    range: Range<State>,
    value: P,
    state_count: usize,
}

impl<P> RangeStateMap<P> {
    pub fn new(range: Range<State>, value: P, state_count: usize) -> Self {
        Self {
            range,
            value,
            state_count,
        }
    }
}

impl<P: Clone + Send + Sync + fmt::Debug> StateMap<P> for RangeStateMap<P> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<P> {
        self.contains(state).then(|| self.value.clone())
    }

    fn contains(&self, state: State) -> bool {
        self.range.contains(&state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.range.clone())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
        Box::new(self.range.clone().map(|s| (s, self.value.clone())))
    }

    fn size_hint(&self) -> usize {
        self.range.len()
    }
}

/// Exactly one state.
#[derive(Debug)]
pub struct SingletonStateMap<P> {
    state: State,
    value: P,
    state_count: usize,
}

impl<P> SingletonStateMap<P> {
    pub fn new(state: State, value: P, state_count: usize) -> Self {
        Self {
            state,
            value,
            state_count,
        }
    }
}

impl<P: Clone + Send + Sync + fmt::Debug> StateMap<P> for SingletonStateMap<P> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, state: State) -> Option<P> {
        (state == self.state).then(|| self.value.clone())
    }

    fn contains(&self, state: State) -> bool {
        state == self.state
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(std::iter::once(self.state))
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
        Box::new(std::iter::once((self.state, self.value.clone())))
    }

    fn size_hint(&self) -> usize {
        1
    }
}

/// A set of states (as a bit vector) sharing one value.
#[derive(Debug)]
pub struct ConstantStateMap<P> {
    domain: StateSet,
    value: P,
    len: usize,
}

impl<P> ConstantStateMap<P> {
    pub fn new(domain: StateSet, value: P) -> Self {
        let len = domain.count();
        Self { domain, value, len }
    }
}

impl<P: Clone + Send + Sync + fmt::Debug> StateMap<P> for ConstantStateMap<P> {
    fn state_count(&self) -> usize {
        self.domain.universe()
    }

    fn get(&self, state: State) -> Option<P> {
        self.domain.contains(state).then(|| self.value.clone())
    }

    fn contains(&self, state: State) -> bool {
        self.domain.contains(state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.domain.iter())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
        Box::new(self.domain.iter().map(|s| (s, self.value.clone())))
    }

    fn size_hint(&self) -> usize {
        self.len
    }

    fn domain(&self) -> Cow<'_, StateSet> {
        Cow::Borrowed(&self.domain)
    }
}

/// The map with no entries.
#[derive(Debug, Clone, Copy)]
pub struct EmptyStateMap {
    state_count: usize,
}

impl EmptyStateMap {
    pub fn new(state_count: usize) -> Self {
        Self { state_count }
    }
}

impl<P: Clone + Send + Sync + fmt::Debug + 'static> StateMap<P> for EmptyStateMap {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn get(&self, _state: State) -> Option<P> {
        None
    }

    fn contains(&self, _state: State) -> bool {
        false
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(std::iter::empty())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, P)> + '_> {
        Box::new(std::iter::empty())
    }

    fn size_hint(&self) -> usize {
        0
    }
}

/// `value` on every state of `domain`, or the empty map when `value` is empty.
pub fn constant_map<S: Solver>(solver: &S, domain: StateSet, value: S::Params) -> SharedMap<S::Params> {
    if domain.is_empty() || solver.is_not_sat(&value) {
        Arc::new(EmptyStateMap::new(domain.universe()))
    } else {
        Arc::new(ConstantStateMap::new(domain, value))
    }
}
