//! Bit vector over the global state range, used as the domain of state maps.

use crate::State;
use std::fmt;

/// A set of states in `0..universe`, one bit per state.
#[derive(Clone, PartialEq, Eq)]
pub struct StateSet {
    words: Vec<u64>,
    universe: usize,
}

impl StateSet {
    /// The empty set over `0..universe`.
    pub fn new(universe: usize) -> Self {
        Self {
            words: vec![0; universe.div_ceil(64)],
            universe,
        }
    }

    /// The set of all states in `0..universe`.
    pub fn full(universe: usize) -> Self {
        let mut set = Self::new(universe);
        set.insert_range(0..universe);
        set
    }

    pub fn from_states(universe: usize, states: impl IntoIterator<Item = State>) -> Self {
        let mut set = Self::new(universe);
        for s in states {
            set.insert(s);
        }
        set
    }

    #[inline]
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Insert a state. Returns true if it was not present.
    ///
    /// Panics if `state` is outside the universe.
    #[inline]
    pub fn insert(&mut self, state: State) -> bool {
        assert!(
            state < self.universe,
            "state {state} outside of state space of {} states",
            self.universe
        );
        let word = &mut self.words[state / 64];
        let mask = 1u64 << (state % 64);
        let was_new = *word & mask == 0;
        *word |= mask;
        was_new
    }

    /// Remove a state. Returns true if it was present.
    #[inline]
    pub fn remove(&mut self, state: State) -> bool {
        match self.words.get_mut(state / 64) {
            Some(word) => {
                let mask = 1u64 << (state % 64);
                let was_present = *word & mask != 0;
                *word &= !mask;
                was_present
            }
            None => false,
        }
    }

    pub fn insert_range(&mut self, range: std::ops::Range<State>) {
        for s in range {
            self.insert(s);
        }
    }

    #[inline]
    pub fn contains(&self, state: State) -> bool {
        self.words
            .get(state / 64)
            .is_some_and(|w| w & (1u64 << (state % 64)) != 0)
    }

    /// Number of states in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn union_with(&mut self, other: &StateSet) {
        self.check_universe(other);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    pub fn intersect_with(&mut self, other: &StateSet) {
        self.check_universe(other);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    /// Iterate states in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = State> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * 64 + bit)
            })
        })
    }

    fn check_universe(&self, other: &StateSet) {
        assert_eq!(
            self.universe, other.universe,
            "state sets over different state spaces"
        );
    }
}

impl fmt::Debug for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
