//! Parameter algebra for parametric model checking.
//!
//! A [`Solver`] owns every operation over its opaque parameter-set type
//! (`Solver::Params`, also called "colors"). Everything above this crate is
//! generic in the params type and never inspects its representation.
//!
//! Convention shared by the whole workspace: a missing value (`None`) is the
//! empty set. Solvers should avoid handing out empty values where `None`
//! would do, but a present value is never required to be satisfiable.

pub mod bool_solver;
pub mod explicit;
pub mod wire;

pub use bool_solver::BoolSolver;
pub use explicit::{ColorSet, ExplicitSolver};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Parameter algebra error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgebraError {
    #[error("cannot decode colors: {0}")]
    Decode(String),

    #[error("domain mismatch: {source_domain} cannot be transferred to {target_domain}")]
    DomainMismatch {
        source_domain: String,
        target_domain: String,
    },
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

/// Operation counters kept by every solver.
///
/// Counting is relaxed: the numbers are only used for debug logging.
#[derive(Debug, Default)]
pub struct SolverStats {
    ands: AtomicUsize,
    ors: AtomicUsize,
    nots: AtomicUsize,
    sat_checks: AtomicUsize,
}

/// Point-in-time copy of [`SolverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ands: usize,
    pub ors: usize,
    pub nots: usize,
    pub sat_checks: usize,
}

impl SolverStats {
    #[inline]
    pub fn record_and(&self) {
        self.ands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_or(&self) {
        self.ors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_not(&self) {
        self.nots.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sat_check(&self) {
        self.sat_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ands: self.ands.load(Ordering::Relaxed),
            ors: self.ors.load(Ordering::Relaxed),
            nots: self.nots.load(Ordering::Relaxed),
            sat_checks: self.sat_checks.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Total number of recorded operations.
    pub fn total(&self) -> usize {
        self.ands + self.ors + self.nots + self.sat_checks
    }

    /// Operations recorded since `earlier`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            ands: self.ands.saturating_sub(earlier.ands),
            ors: self.ors.saturating_sub(earlier.ors),
            nots: self.nots.saturating_sub(earlier.nots),
            sat_checks: self.sat_checks.saturating_sub(earlier.sat_checks),
        }
    }
}

/// Algebra over an opaque parameter-set type.
///
/// Laws every implementation must satisfy:
/// - `and` and `or` are associative, commutative and idempotent;
/// - `tt` is the identity of `and`, `ff` the identity of `or`;
/// - `can_sat(p) || is_not_sat(p)` and `can_not_sat(p) || is_sat(p)`;
/// - decoding the output of `put_colors(p)` yields a value `equal` to `p`.
///
/// A solver is stateless with respect to the values it manipulates, but may
/// keep caches and counters, so it is shared by `Arc` rather than copied.
pub trait Solver: Send + Sync + fmt::Debug {
    /// Parameter set. Cloning should be cheap (shared storage).
    type Params: Clone + fmt::Debug + Send + Sync + 'static;

    /// The full parameter universe.
    fn tt(&self) -> Self::Params;

    /// The empty parameter set.
    fn ff(&self) -> Self::Params;

    fn and(&self, a: &Self::Params, b: &Self::Params) -> Self::Params;

    fn or(&self, a: &Self::Params, b: &Self::Params) -> Self::Params;

    /// Complement against the universe.
    fn not(&self, a: &Self::Params) -> Self::Params;

    /// `against \ target`.
    fn complement(&self, target: &Self::Params, against: &Self::Params) -> Self::Params {
        self.and(against, &self.not(target))
    }

    /// Exact emptiness test (possibly expensive).
    fn is_sat(&self, p: &Self::Params) -> bool;

    fn is_not_sat(&self, p: &Self::Params) -> bool {
        !self.is_sat(p)
    }

    /// Cheap over-approximation of [`Solver::is_sat`]: false only if `p` is surely empty.
    fn can_sat(&self, p: &Self::Params) -> bool {
        self.is_sat(p)
    }

    /// Cheap over-approximation of [`Solver::is_not_sat`]: false only if `p` is surely non-empty.
    fn can_not_sat(&self, p: &Self::Params) -> bool {
        self.is_not_sat(p)
    }

    /// Exact semantic equality, not representation equality.
    fn equal(&self, a: &Self::Params, b: &Self::Params) -> bool;

    /// Compact `p` in place for cheaper storage and transfer.
    fn minimize(&self, _p: &mut Self::Params) {}

    /// Union `new` into `current`, returning the union only if it gained colors.
    ///
    /// `None` means "no change" (including the case where `new` is empty and
    /// `current` is missing).
    fn try_or(&self, current: Option<&Self::Params>, new: &Self::Params) -> Option<Self::Params> {
        match current {
            None => self.is_sat(new).then(|| new.clone()),
            Some(current) => {
                let gained = self.complement(current, new);
                if self.can_sat(&gained) && self.is_sat(&gained) {
                    Some(self.or(current, new))
                } else {
                    None
                }
            }
        }
    }

    /// Number of bytes [`Solver::put_colors`] writes for `p`.
    fn byte_size(&self, p: &Self::Params) -> usize;

    /// Append the encoding of `p` to `buf`.
    fn put_colors(&self, buf: &mut Vec<u8>, p: &Self::Params);

    /// Decode one value from the front of `buf`, advancing it.
    fn get_colors(&self, buf: &mut &[u8]) -> AlgebraResult<Self::Params>;

    /// Human readable rendering.
    fn display(&self, p: &Self::Params) -> String;

    /// Re-home `p` into `target`, another instance of the same domain.
    fn transfer_to(&self, p: &Self::Params, target: &Self) -> AlgebraResult<Self::Params>
    where
        Self: Sized;

    /// Operation counters.
    fn stats(&self) -> &SolverStats;
}

/// Union of optional values: `None` is the empty set.
pub fn or_opt<S: Solver>(solver: &S, a: Option<&S::Params>, b: Option<&S::Params>) -> Option<S::Params> {
    match (a, b) {
        (Some(a), Some(b)) => Some(solver.or(a, b)),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

/// Intersection of optional values: `None` is the empty set.
pub fn and_opt<S: Solver>(solver: &S, a: Option<&S::Params>, b: Option<&S::Params>) -> Option<S::Params> {
    match (a, b) {
        (Some(a), Some(b)) => Some(solver.and(a, b)),
        _ => None,
    }
}

/// Keep `p` only if it is satisfiable.
pub fn non_empty<S: Solver>(solver: &S, p: S::Params) -> Option<S::Params> {
    solver.is_sat(&p).then_some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_or_reports_growth_only() {
        let solver = ExplicitSolver::new(4);
        let a = solver.colors(&[0, 1]);
        let b = solver.colors(&[1]);
        let c = solver.colors(&[2]);

        assert!(solver.try_or(Some(&a), &b).is_none());
        let grown = solver.try_or(Some(&a), &c).expect("should grow");
        assert!(solver.equal(&grown, &solver.colors(&[0, 1, 2])));

        assert!(solver.try_or(None, &solver.ff()).is_none());
        assert!(solver.try_or(None, &c).is_some());
    }

    #[test]
    fn test_optional_helpers() {
        let solver = BoolSolver::new();
        assert_eq!(or_opt(&solver, Some(&true), None), Some(true));
        assert_eq!(and_opt(&solver, Some(&true), None), None);
        assert_eq!(non_empty(&solver, false), None);
    }

    #[test]
    fn test_stats_since() {
        let solver = ExplicitSolver::new(8);
        let before = solver.stats().snapshot();
        let a = solver.colors(&[1]);
        let _ = solver.and(&a, &solver.tt());
        let _ = solver.or(&a, &solver.ff());
        let delta = solver.stats().snapshot().since(&before);
        assert_eq!(delta.ands, 1);
        assert_eq!(delta.ors, 1);
    }
}
