//! Lazy views combining other maps without materializing their values.
//!
//! Each view computes its domain once, as a bit vector, when constructed.
//! Values are computed on every `get` from the operands.

use crate::{SharedMap, State, StateMap, StateSet};
use parcheck_params::Solver;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Pointwise intersection: contains the states present in both operands.
pub struct AndStateMap<S: Solver> {
    solver: Arc<S>,
    left: SharedMap<S::Params>,
    right: SharedMap<S::Params>,
    domain: StateSet,
    len: usize,
}

impl<S: Solver> AndStateMap<S> {
    pub fn new(solver: Arc<S>, left: SharedMap<S::Params>, right: SharedMap<S::Params>) -> Self {
        let mut domain = left.domain().into_owned();
        domain.intersect_with(&right.domain());
        let len = domain.count();
        Self {
            solver,
            left,
            right,
            domain,
            len,
        }
    }
}

/// Pointwise union: contains the states present in either operand.
pub struct OrStateMap<S: Solver> {
    solver: Arc<S>,
    left: SharedMap<S::Params>,
    right: SharedMap<S::Params>,
    domain: StateSet,
    len: usize,
}

impl<S: Solver> OrStateMap<S> {
    pub fn new(solver: Arc<S>, left: SharedMap<S::Params>, right: SharedMap<S::Params>) -> Self {
        let mut domain = left.domain().into_owned();
        domain.union_with(&right.domain());
        let len = domain.count();
        Self {
            solver,
            left,
            right,
            domain,
            len,
        }
    }
}

/// `full \ inner` pointwise: contains the states of `full`.
pub struct ComplementStateMap<S: Solver> {
    solver: Arc<S>,
    full: SharedMap<S::Params>,
    inner: SharedMap<S::Params>,
    domain: StateSet,
    len: usize,
}

impl<S: Solver> ComplementStateMap<S> {
    pub fn new(solver: Arc<S>, full: SharedMap<S::Params>, inner: SharedMap<S::Params>) -> Self {
        let domain = full.domain().into_owned();
        let len = domain.count();
        Self {
            solver,
            full,
            inner,
            domain,
            len,
        }
    }
}

impl<S: Solver> StateMap<S::Params> for AndStateMap<S> {
    fn state_count(&self) -> usize {
        self.domain.universe()
    }

    fn get(&self, state: State) -> Option<S::Params> {
        if !self.domain.contains(state) {
            return None;
        }
        let l = self.left.get(state)?;
        let r = self.right.get(state)?;
        Some(self.solver.and(&l, &r))
    }

    fn contains(&self, state: State) -> bool {
        self.domain.contains(state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.domain.iter())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, S::Params)> + '_> {
        Box::new(sat_entries(self.solver.as_ref(), &self.domain, |s| self.get(s)))
    }

    fn size_hint(&self) -> usize {
        self.len
    }

    fn domain(&self) -> Cow<'_, StateSet> {
        Cow::Borrowed(&self.domain)
    }
}

impl<S: Solver> StateMap<S::Params> for OrStateMap<S> {
    fn state_count(&self) -> usize {
        self.domain.universe()
    }

    fn get(&self, state: State) -> Option<S::Params> {
        if !self.domain.contains(state) {
            return None;
        }
        match (self.left.get(state), self.right.get(state)) {
            (Some(l), Some(r)) => Some(self.solver.or(&l, &r)),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        }
    }

    fn contains(&self, state: State) -> bool {
        self.domain.contains(state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.domain.iter())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, S::Params)> + '_> {
        Box::new(sat_entries(self.solver.as_ref(), &self.domain, |s| self.get(s)))
    }

    fn size_hint(&self) -> usize {
        self.len
    }

    fn domain(&self) -> Cow<'_, StateSet> {
        Cow::Borrowed(&self.domain)
    }
}

impl<S: Solver> StateMap<S::Params> for ComplementStateMap<S> {
    fn state_count(&self) -> usize {
        self.domain.universe()
    }

    fn get(&self, state: State) -> Option<S::Params> {
        if !self.domain.contains(state) {
            return None;
        }
        let full = self.full.get(state)?;
        match self.inner.get(state) {
            Some(inner) => Some(self.solver.complement(&inner, &full)),
            None => Some(full),
        }
    }

    fn contains(&self, state: State) -> bool {
        self.domain.contains(state)
    }

    fn states(&self) -> Box<dyn Iterator<Item = State> + '_> {
        Box::new(self.domain.iter())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (State, S::Params)> + '_> {
        Box::new(sat_entries(self.solver.as_ref(), &self.domain, |s| self.get(s)))
    }

    fn size_hint(&self) -> usize {
        self.len
    }

    fn domain(&self) -> Cow<'_, StateSet> {
        Cow::Borrowed(&self.domain)
    }
}

/// Values of `domain` computed by `get`, skipping empty ones.
fn sat_entries<'a, S: Solver>(
    solver: &'a S,
    domain: &'a StateSet,
    get: impl Fn(State) -> Option<S::Params> + 'a,
) -> impl Iterator<Item = (State, S::Params)> + 'a {
    domain
        .iter()
        .filter_map(move |s| get(s).filter(|v| solver.is_sat(v)).map(|v| (s, v)))
}

impl<S: Solver> fmt::Debug for AndStateMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndStateMap")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("len", &self.len)
            .finish()
    }
}

impl<S: Solver> fmt::Debug for OrStateMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrStateMap")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("len", &self.len)
            .finish()
    }
}

impl<S: Solver> fmt::Debug for ComplementStateMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplementStateMap")
            .field("full", &self.full)
            .field("inner", &self.inner)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HashStateMap, RangeStateMap};
    use parcheck_params::ExplicitSolver;

    fn solver() -> Arc<ExplicitSolver> {
        Arc::new(ExplicitSolver::new(4))
    }

    #[test]
    fn test_or_view_values() {
        let s = solver();
        let left: SharedMap<_> = Arc::new(RangeStateMap::new(0..2, s.colors(&[0]), 4));
        let right: SharedMap<_> = Arc::new(RangeStateMap::new(1..3, s.colors(&[1]), 4));
        let view = OrStateMap::new(s.clone(), left, right);
        assert_eq!(view.size_hint(), 3);
        assert!(s.equal(&view.get(0).unwrap(), &s.colors(&[0])));
        assert!(s.equal(&view.get(1).unwrap(), &s.colors(&[0, 1])));
        assert!(s.equal(&view.get(2).unwrap(), &s.colors(&[1])));
        assert!(view.get(3).is_none());
    }

    #[test]
    fn test_complement_view_keeps_full_domain() {
        let s = solver();
        let full: SharedMap<_> = Arc::new(RangeStateMap::new(0..3, s.tt(), 4));
        let mut inner = HashStateMap::new(4);
        inner.insert(1, s.tt());
        inner.insert(2, s.colors(&[3]));
        let view = ComplementStateMap::new(s.clone(), full, Arc::new(inner));

        assert!(view.contains(1));
        assert!(s.is_not_sat(&view.get(1).unwrap()));
        assert!(s.equal(&view.get(2).unwrap(), &s.colors(&[0, 1, 2])));
        assert!(s.equal(&view.get(0).unwrap(), &s.tt()));
        assert_eq!(view.entries().map(|(st, _)| st).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_views_nest() {
        let s = solver();
        let a: SharedMap<_> = Arc::new(RangeStateMap::new(0..4, s.colors(&[0, 1]), 4));
        let b: SharedMap<_> = Arc::new(RangeStateMap::new(2..4, s.colors(&[1, 2]), 4));
        let and: SharedMap<_> = Arc::new(AndStateMap::new(s.clone(), a.clone(), b));
        let or = OrStateMap::new(s.clone(), and, a);
        assert!(s.equal(&or.get(3).unwrap(), &s.colors(&[0, 1])));
        assert_eq!(or.size_hint(), 4);
    }
}
