//! First-order operators over state variables.
//!
//! Quantifiers iterate a finite set of states. Every partition must visit
//! the same values in the same order, since each value's subgraph makes its
//! own collective rounds; values are therefore always walked in increasing
//! state order over a globally known set.

use super::{Compiler, Env};
use crate::operator::{Context, Evaluate, OperatorRef};
use crate::formula::Formula;
use crate::CheckResult;
use ahash::AHashMap;
use parcheck_map::{ConstantStateMap, EmptyStateMap, HashStateMap, SharedMap, State, StateSet};
use parcheck_params::Solver;
use std::sync::Arc;
use tracing::trace;

/// Compile and compute `formula` with `name` bound to `value`.
fn evaluate_with<S: Solver + 'static>(
    ctx: &Context<S>,
    formula: &Formula,
    env: &Env,
    name: &str,
    value: State,
) -> CheckResult<SharedMap<S::Params>> {
    let mut env = env.clone();
    env.push((name.to_string(), value));
    let op = Compiler::new().compile(formula, &env)?;
    op.compute(ctx)
}

/// `bind x: φ`: holds in `s` where `φ[x := s]` holds in `s`.
pub(crate) struct Bind {
    pub name: String,
    pub inner: Formula,
    pub env: Env,
}

impl<S: Solver + 'static> Evaluate<S> for Bind {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let mut result = HashStateMap::new(ctx.state_count());
        for state in 0..ctx.state_count() {
            let map = evaluate_with(ctx, &self.inner, &self.env, &self.name, state)?;
            if ctx.partition.is_local(state) {
                if let Some(value) = map.get(state).filter(|v| ctx.solver.is_sat(v)) {
                    result.insert(state, value);
                }
            }
        }
        Ok(Arc::new(result))
    }
}

/// `at x: φ`: the value of `φ` in the state bound to `x`, everywhere.
pub(crate) struct At<S: Solver> {
    pub state: State,
    pub inner: OperatorRef<S>,
}

impl<S: Solver + 'static> Evaluate<S> for At<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let At { state, inner } = *self;
        let map = inner.compute(ctx)?;
        drop(inner);

        let local = if ctx.partition.is_local(state) {
            map.get(state)
                .filter(|v| ctx.solver.is_sat(v))
                .map(|v| vec![(state, v)])
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let value = ctx.broadcast(local)?.into_iter().find(|(s, _)| *s == state);
        match value {
            Some((_, value)) => {
                let domain = StateSet::from_states(ctx.state_count(), ctx.partition.local_states());
                Ok(Arc::new(ConstantStateMap::new(domain, value)))
            }
            None => Ok(Arc::new(EmptyStateMap::new(ctx.state_count()))),
        }
    }
}

/// `forall x in B: φ` and `exists x in B: φ`.
///
/// The bound `B` is broadcast once so every partition knows every legal
/// substitution and the colors under which it is legal.
pub(crate) struct Quantified<S: Solver> {
    pub universal: bool,
    pub name: String,
    pub bound: OperatorRef<S>,
    pub inner: Formula,
    pub env: Env,
}

/// Inner formula of a quantifier, evaluated once per value.
struct Scope<'a> {
    name: &'a str,
    inner: &'a Formula,
    env: &'a Env,
}

impl Scope<'_> {
    fn evaluate<S: Solver + 'static>(&self, ctx: &Context<S>, value: State) -> CheckResult<SharedMap<S::Params>> {
        evaluate_with(ctx, self.inner, self.env, self.name, value)
    }

    /// `∧_v (¬B(v) ∨ φ_v)`, starting from every local state.
    fn for_all<S: Solver + 'static>(
        &self,
        ctx: &Context<S>,
        values: Vec<(State, S::Params)>,
    ) -> CheckResult<SharedMap<S::Params>> {
        let solver = ctx.solver.as_ref();
        let mut acc: AHashMap<State, S::Params> = ctx.partition.local_states().map(|s| (s, solver.tt())).collect();
        for (v, legal) in values {
            let map = self.evaluate(ctx, v)?;
            acc.retain(|s, colors| {
                let violated = match map.get(*s) {
                    Some(holds) => solver.complement(&holds, &legal),
                    None => legal.clone(),
                };
                *colors = solver.complement(&violated, colors);
                solver.is_sat(colors)
            });
            trace!(partition = ctx.id(), value = v, remaining = acc.len(), "forall value folded");
        }
        let mut result = HashStateMap::with_capacity(ctx.state_count(), acc.len());
        for (s, colors) in acc {
            result.insert(s, colors);
        }
        Ok(Arc::new(result))
    }

    /// `∨_v (B(v) ∧ φ_v)`.
    fn exists<S: Solver + 'static>(
        &self,
        ctx: &Context<S>,
        values: Vec<(State, S::Params)>,
    ) -> CheckResult<SharedMap<S::Params>> {
        let solver = ctx.solver.as_ref();
        let mut result = ctx.partition.new_local_mutable_map(Arc::clone(&ctx.solver), ctx.id());
        for (v, legal) in values {
            let map = self.evaluate(ctx, v)?;
            for (s, holds) in map.entries() {
                result.set_or_union(s, &solver.and(&legal, &holds))?;
            }
            trace!(partition = ctx.id(), value = v, "exists value folded");
        }
        Ok(result.freeze())
    }
}

impl<S: Solver + 'static> Evaluate<S> for Quantified<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let Quantified {
            universal,
            name,
            bound,
            inner,
            env,
        } = *self;
        let bound_map = bound.compute(ctx)?;
        drop(bound);
        let local: Vec<(State, S::Params)> = bound_map.entries().collect();
        drop(bound_map);
        let mut values = ctx.broadcast(local)?;
        values.sort_by_key(|(s, _)| *s);

        let scope = Scope {
            name: &name,
            inner: &inner,
            env: &env,
        };
        if universal {
            scope.for_all(ctx, values)
        } else {
            scope.exists(ctx, values)
        }
    }
}
