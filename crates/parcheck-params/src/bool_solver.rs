//! Single-valuation algebra: plain (non-parametric) model checking.

use crate::wire::{get_u8, put_u8};
use crate::{AlgebraError, AlgebraResult, Solver, SolverStats};

/// Solver over `bool`, where `true` is the only valuation.
#[derive(Debug, Default)]
pub struct BoolSolver {
    stats: SolverStats,
}

impl BoolSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for BoolSolver {
    type Params = bool;

    fn tt(&self) -> bool {
        true
    }

    fn ff(&self) -> bool {
        false
    }

    fn and(&self, a: &bool, b: &bool) -> bool {
        self.stats.record_and();
        *a && *b
    }

    fn or(&self, a: &bool, b: &bool) -> bool {
        self.stats.record_or();
        *a || *b
    }

    fn not(&self, a: &bool) -> bool {
        self.stats.record_not();
        !*a
    }

    fn is_sat(&self, p: &bool) -> bool {
        self.stats.record_sat_check();
        *p
    }

    fn equal(&self, a: &bool, b: &bool) -> bool {
        a == b
    }

    fn byte_size(&self, _p: &bool) -> usize {
        1
    }

    fn put_colors(&self, buf: &mut Vec<u8>, p: &bool) {
        put_u8(buf, u8::from(*p));
    }

    fn get_colors(&self, buf: &mut &[u8]) -> AlgebraResult<bool> {
        match get_u8(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(AlgebraError::Decode(format!("invalid bool color byte {other}"))),
        }
    }

    fn display(&self, p: &bool) -> String {
        let text = if *p { "tt" } else { "ff" };
        text.to_string()
    }

    fn transfer_to(&self, p: &bool, _target: &Self) -> AlgebraResult<bool> {
        Ok(*p)
    }

    fn stats(&self) -> &SolverStats {
        &self.stats
    }
}
