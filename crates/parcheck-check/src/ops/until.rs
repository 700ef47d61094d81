//! Until-style distributed fixed points: `EU`, `AU` and the weak `EW`, `AW`.
//!
//! Each partition keeps a monotone local result and a work-set of states
//! whose value grew. Draining the work-set propagates values backwards
//! along valid edges: directly for local predecessors, through per-owner
//! staging for remote ones. Once the work-set is empty the staged updates
//! are exchanged; the fixed point is reached when a round carries nothing
//! at all.

use super::next::{valid_predecessors, valid_successors};
use crate::formula::DirFormula;
use crate::operator::{Context, Evaluate, OperatorRef};
use crate::CheckResult;
use ahash::AHashMap;
use parcheck_map::{MutableStateMap, SharedMap, State, StateSet};
use parcheck_params::Solver;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

pub(crate) struct UntilOperands<S: Solver> {
    pub path: OperatorRef<S>,
    pub reach: OperatorRef<S>,
    pub direction: DirFormula,
    pub time_flow: bool,
    pub weak: bool,
}

/// LIFO work-set without duplicates.
struct WorkSet {
    stack: Vec<State>,
    queued: StateSet,
}

impl WorkSet {
    fn new(state_count: usize) -> Self {
        Self {
            stack: Vec::new(),
            queued: StateSet::new(state_count),
        }
    }

    fn push(&mut self, state: State) {
        if self.queued.insert(state) {
            self.stack.push(state);
        }
    }

    fn pop(&mut self) -> Option<State> {
        let state = self.stack.pop()?;
        self.queued.remove(state);
        Some(state)
    }
}

/// Colors of `path` with no valid outgoing edge, per local state.
///
/// These satisfy the weak variants without any propagation.
fn deadlock_seeds<S: Solver + 'static>(
    ctx: &Context<S>,
    path: &SharedMap<S::Params>,
    direction: &DirFormula,
    time_flow: bool,
) -> Vec<(State, S::Params)> {
    let solver = ctx.solver.as_ref();
    let states: Vec<State> = path.states().collect();
    ctx.par_filter_map(&states, |s| {
        let value = path.get(s)?;
        let outgoing = valid_successors(ctx, s, direction, time_flow)
            .iter()
            .fold(solver.ff(), |acc, t| solver.or(&acc, &t.bound));
        let dead = solver.complement(&outgoing, &value);
        solver.is_sat(&dead).then_some(dead)
    })
}

/// Shared driver: seeds the result, then alternates local propagation and
/// exchange rounds until the channel reports global termination.
trait Propagate<S: Solver> {
    /// Handle a grown value of local state `state`: update local dependents
    /// and stage updates for remote ones.
    fn propagate(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()>;

    /// Handle an update received from another partition.
    fn receive(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()>;

    fn take_outgoing(&mut self) -> parcheck_channel::Outgoing<S::Params>;
}

fn fixed_point<S: Solver + 'static>(
    ctx: &Context<S>,
    seeds: impl IntoIterator<Item = (State, S::Params)>,
    rule: &mut dyn Propagate<S>,
) -> CheckResult<SharedMap<S::Params>> {
    let mut result = ctx.partition.new_local_mutable_map(Arc::clone(&ctx.solver), ctx.id());
    let mut work = WorkSet::new(ctx.state_count());
    for (state, value) in seeds {
        if result.set_or_union(state, &value)? {
            work.push(state);
        }
    }

    let mut round = 0usize;
    loop {
        let mut processed = 0usize;
        while let Some(state) = work.pop() {
            processed += 1;
            if let Some(value) = result.get(state) {
                rule.propagate(ctx, state, &value, result.as_mut(), &mut work)?;
            }
        }
        round += 1;
        let Some(received) = ctx.exchange(rule.take_outgoing())? else {
            break;
        };
        trace!(
            partition = ctx.id(),
            round,
            processed,
            received = received.len(),
            "fixed point round"
        );
        for (state, value) in received {
            rule.receive(ctx, state, &value, result.as_mut(), &mut work)?;
        }
    }
    Ok(result.freeze())
}

/// `E[φ U ψ]` by value notification: a grown value `v` of `x` is pushed to
/// every valid predecessor `p` as `v ∧ bound ∧ φ(p)`.
pub(crate) struct ExistsUntil<S: Solver>(pub UntilOperands<S>);

struct ExistsRule<S: Solver> {
    path: SharedMap<S::Params>,
    direction: DirFormula,
    time_flow: bool,
    staging: crate::operator::Staging<S::Params>,
}

impl<S: Solver + 'static> ExistsRule<S> {
    fn offer(
        &self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        if let Some(path) = self.path.get(state) {
            let value = ctx.solver.and(value, &path);
            if result.set_or_union(state, &value)? {
                work.push(state);
            }
        }
        Ok(())
    }
}

impl<S: Solver + 'static> Propagate<S> for ExistsRule<S> {
    fn propagate(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        let solver = ctx.solver.as_ref();
        for t in valid_predecessors(ctx, state, &self.direction, self.time_flow) {
            let pushed = solver.and(value, &t.bound);
            if !solver.can_sat(&pushed) {
                continue;
            }
            let owner = ctx.partition.owner(t.target);
            if owner == ctx.id() {
                self.offer(ctx, t.target, &pushed, result, work)?;
            } else {
                self.staging.push(owner, t.target, &pushed)?;
            }
        }
        Ok(())
    }

    fn receive(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        self.offer(ctx, state, value, result, work)
    }

    fn take_outgoing(&mut self) -> parcheck_channel::Outgoing<S::Params> {
        self.staging.take_outgoing()
    }
}

impl<S: Solver + 'static> Evaluate<S> for ExistsUntil<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let UntilOperands {
            path,
            reach,
            direction,
            time_flow,
            weak,
        } = self.0;
        let path = path.compute(ctx)?;
        let reach = reach.compute(ctx)?;

        let mut seeds: Vec<(State, S::Params)> = reach.entries().collect();
        drop(reach);
        if weak {
            seeds.extend(deadlock_seeds(ctx, &path, &direction, time_flow));
        }
        let mut rule = ExistsRule {
            path,
            direction,
            time_flow,
            staging: ctx.staging(),
        };
        fixed_point(ctx, seeds, &mut rule)
    }
}

/// Per-state bookkeeping of `A[φ U ψ]`: colors of each valid outgoing edge
/// not yet confirmed by the edge target.
struct EdgeCoverage<P> {
    /// `φ(p) ∧ (∨ edge bounds)`: the most `p` can ever reach.
    base: P,
    edges: SmallVec<[(State, P); 4]>,
}

/// `A[φ U ψ]` by dependency notification: a grown value of `x` is sent to
/// the owners of its valid predecessors, which subtract it from the
/// uncovered colors of their edges into `x`. A predecessor `p` holds for
/// `base(p)` minus the union of what is still uncovered.
pub(crate) struct AllUntil<S: Solver>(pub UntilOperands<S>);

struct AllRule<S: Solver> {
    direction: DirFormula,
    time_flow: bool,
    coverage: AHashMap<State, EdgeCoverage<S::Params>>,
    /// Edge target to the local states with an edge into it.
    dependents: AHashMap<State, SmallVec<[State; 4]>>,
    staging: crate::operator::Staging<S::Params>,
}

impl<S: Solver + 'static> AllRule<S> {
    fn new(ctx: &Context<S>, path: &SharedMap<S::Params>, direction: DirFormula, time_flow: bool) -> Self {
        let solver = ctx.solver.as_ref();
        let states: Vec<State> = path.states().collect();
        let built = ctx.par_filter_map(&states, |p| {
            let value = path.get(p)?;
            let edges: SmallVec<[(State, S::Params); 4]> = valid_successors(ctx, p, &direction, time_flow)
                .into_iter()
                .map(|t| (t.target, t.bound))
                .collect();
            let outgoing = edges.iter().fold(solver.ff(), |acc, (_, b)| solver.or(&acc, b));
            let base = solver.and(&value, &outgoing);
            solver.can_sat(&base).then_some(EdgeCoverage { base, edges })
        });

        let mut coverage = AHashMap::with_capacity(built.len());
        let mut dependents: AHashMap<State, SmallVec<[State; 4]>> = AHashMap::new();
        for (p, cov) in built {
            for (target, _) in &cov.edges {
                let list = dependents.entry(*target).or_default();
                if list.last() != Some(&p) {
                    list.push(p);
                }
            }
            coverage.insert(p, cov);
        }

        Self {
            direction,
            time_flow,
            coverage,
            dependents,
            staging: ctx.staging(),
        }
    }

    /// `target` now holds for `value`: shrink the edges into it and re-derive
    /// the covered colors of every dependent whose edge shrank.
    fn notify(
        &mut self,
        ctx: &Context<S>,
        target: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        let solver = ctx.solver.as_ref();
        let Some(dependents) = self.dependents.get(&target) else {
            return Ok(());
        };
        for p in dependents {
            let Some(cov) = self.coverage.get_mut(p) else {
                continue;
            };
            let mut shrank = false;
            for (t, uncovered) in cov.edges.iter_mut() {
                if *t == target && solver.can_sat(&solver.and(uncovered, value)) {
                    *uncovered = solver.complement(value, uncovered);
                    shrank = true;
                }
            }
            if !shrank {
                continue;
            }
            let remaining = cov
                .edges
                .iter()
                .fold(solver.ff(), |acc, (_, u)| solver.or(&acc, u));
            let covered = solver.complement(&remaining, &cov.base);
            if result.set_or_union(*p, &covered)? {
                work.push(*p);
            }
        }
        Ok(())
    }
}

impl<S: Solver + 'static> Propagate<S> for AllRule<S> {
    fn propagate(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        for t in valid_predecessors(ctx, state, &self.direction, self.time_flow) {
            let owner = ctx.partition.owner(t.target);
            if owner != ctx.id() {
                self.staging.push(owner, state, value)?;
            }
        }
        self.notify(ctx, state, value, result, work)
    }

    fn receive(
        &mut self,
        ctx: &Context<S>,
        state: State,
        value: &S::Params,
        result: &mut dyn MutableStateMap<S::Params>,
        work: &mut WorkSet,
    ) -> CheckResult<()> {
        self.notify(ctx, state, value, result, work)
    }

    fn take_outgoing(&mut self) -> parcheck_channel::Outgoing<S::Params> {
        self.staging.take_outgoing()
    }
}

impl<S: Solver + 'static> Evaluate<S> for AllUntil<S> {
    fn evaluate(self: Box<Self>, ctx: &Context<S>) -> CheckResult<SharedMap<S::Params>> {
        let UntilOperands {
            path,
            reach,
            direction,
            time_flow,
            weak,
        } = self.0;
        let path = path.compute(ctx)?;
        let reach = reach.compute(ctx)?;

        let mut seeds: Vec<(State, S::Params)> = reach.entries().collect();
        drop(reach);
        if weak {
            seeds.extend(deadlock_seeds(ctx, &path, &direction, time_flow));
        }
        let mut rule = AllRule::new(ctx, &path, direction, time_flow);
        drop(path);
        fixed_point(ctx, seeds, &mut rule)
    }
}
