//! One-step temporal operators: `EX` and `AX`.

use crate::formula::DirFormula;
use crate::operator::{Context, Evaluate, OperatorRef};
use crate::CheckResult;
use ahash::AHashMap;
use parcheck_map::{SharedMap, State};
use parcheck_model::Transitions;
use parcheck_params::Solver;
use std::sync::Arc;

/// Predecessor edges of `state` that `direction` accepts.
pub(super) fn valid_predecessors<S: Solver + 'static>(
    ctx: &Context<S>,
    state: State,
    direction: &DirFormula,
    time_flow: bool,
) -> Transitions<S::Params> {
    let mut edges = ctx.model.predecessors(state, time_flow);
    edges.retain(|t| direction.accepts(t));
    edges
}

/// Successor edges of `state` that `direction` accepts.
pub(super) fn valid_successors<S: Solver + 'static>(
    ctx: &Context<S>,
    state: State,
    direction: &DirFormula,
    time_flow: bool,
) -> Transitions<S::Params> {
    let mut edges = ctx.model.successors(state, time_flow);
    edges.retain(|t| direction.accepts(t));
    edges
}

/// Push `phi(x) ∧ bound` from every `x` to each of its valid predecessors,
/// then fold local and received contributions with `set_or_union`.
fn push_to_predecessors<S: Solver + 'static>(
    ctx: &Context<S>,
    phi: &SharedMap<S::Params>,
    direction: &DirFormula,
    time_flow: bool,
) -> CheckResult<SharedMap<S::Params>> {
    let solver = ctx.solver.as_ref();
    let me = ctx.id();
    let states: Vec<State> = phi.states().collect();
    let contributions = ctx.par_filter_map(&states, |x| {
        let value = phi.get(x)?;
        let pushed: Vec<(State, S::Params)> = valid_predecessors(ctx, x, direction, time_flow)
            .into_iter()
            .filter_map(|t| {
                let w = solver.and(&value, &t.bound);
                solver.can_sat(&w).then_some((t.target, w))
            })
            .collect();
        Some(pushed)
    });

    let mut result = ctx.partition.new_local_mutable_map(Arc::clone(&ctx.solver), me);
    let mut staging = ctx.staging();
    for (_, pushed) in contributions {
        for (p, w) in pushed {
            let owner = ctx.partition.owner(p);
            if owner == me {
                result.set_or_union(p, &w)?;
            } else {
                staging.push(owner, p, &w)?;
            }
        }
    }
    if let Some(received) = ctx.exchange(staging.take_outgoing())? {
        for (p, w) in received {
            result.set_or_union(p, &w)?;
        }
    }
    Ok(result.freeze())
}

/// `EX φ`: colors for which some valid successor satisfies `φ`.
pub(crate) struct ExistsNext<S: Solver> {
    pub inner: OperatorRef<S>,
    pub direction: DirFormula,
    pub time_flow: bool,
}

impl<S: Solver + 'static> Evaluate<S> for ExistsNext<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let ExistsNext {
            inner,
            direction,
            time_flow,
        } = *self;
        let phi = inner.compute(ctx)?;
        drop(inner);
        push_to_predecessors(ctx, &phi, &direction, time_flow)
    }
}

/// `AX φ`: colors for which every valid successor satisfies `φ` and at
/// least one valid successor exists.
///
/// Two rounds: first every state sends its `φ` value to the owners of its
/// remote predecessors, then the `EX φ` candidates are exchanged. Each
/// candidate is then checked against all of its valid successors.
pub(crate) struct AllNext<S: Solver> {
    pub inner: OperatorRef<S>,
    pub direction: DirFormula,
    pub time_flow: bool,
}

impl<S: Solver + 'static> Evaluate<S> for AllNext<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let AllNext {
            inner,
            direction,
            time_flow,
        } = *self;
        let phi = inner.compute(ctx)?;
        drop(inner);
        let solver = ctx.solver.as_ref();
        let me = ctx.id();

        let mut staging = ctx.staging();
        for (x, value) in phi.entries() {
            for t in valid_predecessors(ctx, x, &direction, time_flow) {
                let owner = ctx.partition.owner(t.target);
                if owner != me {
                    staging.push(owner, x, &value)?;
                }
            }
        }
        let witnesses: AHashMap<State, S::Params> = ctx
            .exchange(staging.take_outgoing())?
            .unwrap_or_default()
            .into_iter()
            .collect();

        let candidates = push_to_predecessors(ctx, &phi, &direction, time_flow)?;

        let states: Vec<State> = candidates.states().collect();
        let decided = ctx.par_filter_map(&states, |p| {
            let mut value = candidates.get(p)?;
            for t in valid_successors(ctx, p, &direction, time_flow) {
                let target = if ctx.partition.is_local(t.target) {
                    phi.get(t.target)
                } else {
                    witnesses.get(&t.target).cloned()
                };
                // Colors of this edge whose target falsifies φ.
                let falsified = match target {
                    Some(good) => solver.complement(&good, &t.bound),
                    None => t.bound.clone(),
                };
                value = solver.complement(&falsified, &value);
                if !solver.can_sat(&value) {
                    return None;
                }
            }
            solver.is_sat(&value).then_some(value)
        });

        let mut result = ctx.partition.new_local_mutable_map(Arc::clone(&ctx.solver), me);
        for (p, value) in decided {
            result.set_or_union(p, &value)?;
        }
        Ok(result.freeze())
    }
}
