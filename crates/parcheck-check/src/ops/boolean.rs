//! Local combinators: constants, atoms, references and boolean connectives.
//!
//! Every operator result only holds states owned by its partition.

use crate::operator::{Context, Evaluate, OperatorRef};
use crate::CheckResult;
use parcheck_map::{AndStateMap, ComplementStateMap, EmptyStateMap, OrStateMap, SharedMap, SingletonStateMap, State};
use parcheck_model::Atom;
use parcheck_params::Solver;
use std::sync::Arc;

pub(crate) struct Constant {
    pub value: bool,
}

impl<S: Solver + 'static> Evaluate<S> for Constant {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        if self.value {
            Ok(ctx.local_true())
        } else {
            Ok(Arc::new(EmptyStateMap::new(ctx.state_count())))
        }
    }
}

pub(crate) struct AtomOp {
    pub atom: Atom,
}

impl<S: Solver + 'static> Evaluate<S> for AtomOp {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let global = ctx.model.eval_atom(&self.atom)?;
        Ok(Arc::new(AndStateMap::new(Arc::clone(&ctx.solver), ctx.local_true(), global)))
    }
}

/// The single state bound to a variable.
pub(crate) struct Reference {
    pub state: State,
}

impl<S: Solver + 'static> Evaluate<S> for Reference {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        if ctx.partition.is_local(self.state) {
            Ok(Arc::new(SingletonStateMap::new(self.state, ctx.solver.tt(), ctx.state_count())))
        } else {
            Ok(Arc::new(EmptyStateMap::new(ctx.state_count())))
        }
    }
}

pub(crate) struct Not<S: Solver> {
    pub inner: OperatorRef<S>,
}

impl<S: Solver + 'static> Evaluate<S> for Not<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let inner = self.inner.compute(ctx)?;
        Ok(Arc::new(ComplementStateMap::new(Arc::clone(&ctx.solver), ctx.local_true(), inner)))
    }
}

pub(crate) struct And<S: Solver> {
    pub left: OperatorRef<S>,
    pub right: OperatorRef<S>,
}

impl<S: Solver + 'static> Evaluate<S> for And<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let left = self.left.compute(ctx)?;
        let right = self.right.compute(ctx)?;
        Ok(Arc::new(AndStateMap::new(Arc::clone(&ctx.solver), left, right)))
    }
}

pub(crate) struct Or<S: Solver> {
    pub left: OperatorRef<S>,
    pub right: OperatorRef<S>,
}

impl<S: Solver + 'static> Evaluate<S> for Or<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let left = self.left.compute(ctx)?;
        let right = self.right.compute(ctx)?;
        Ok(Arc::new(OrStateMap::new(Arc::clone(&ctx.solver), left, right)))
    }
}
