#![allow(dead_code)]

use parcheck_check::{CheckConfig, Checker, Formula};
use parcheck_map::{HashStateMap, State, StateMap};
use parcheck_model::{Atom, CmpOp, DirectionLabel, ExplicitModel, ExplicitModelBuilder, FloatProposition};
use parcheck_params::{ColorSet, ExplicitSolver};
use std::sync::Arc;

pub const COLORS: usize = 4;

pub fn solver() -> Arc<ExplicitSolver> {
    Arc::new(ExplicitSolver::new(COLORS))
}

/// `variable > 0.5`.
pub fn prop(variable: &str) -> Formula {
    Formula::atom(Atom::Float(FloatProposition {
        variable: variable.into(),
        cmp: CmpOp::Gt,
        threshold: 0.5,
    }))
}

/// Model over `n` states with unconditional edges and boolean variables.
pub fn graph(
    solver: &Arc<ExplicitSolver>,
    n: usize,
    edges: &[(State, State)],
    variables: &[(&str, Vec<f64>)],
) -> ExplicitModelBuilder<ExplicitSolver> {
    let mut builder = ExplicitModel::builder(solver.clone(), n);
    for (from, to) in edges {
        let direction = if from == to {
            DirectionLabel::Loop
        } else if to > from {
            DirectionLabel::up("x")
        } else {
            DirectionLabel::down("x")
        };
        builder = builder.full_edge(*from, *to, direction);
    }
    for (name, values) in variables {
        builder = builder.variable(name, values.clone());
    }
    builder
}

pub fn checker(
    solver: &Arc<ExplicitSolver>,
    model: ExplicitModel<ExplicitSolver>,
    config: CheckConfig,
) -> Checker<ExplicitSolver> {
    Checker::new(solver.clone(), Arc::new(model), config)
}

/// Merged result as sorted `(state, colors)` pairs.
pub fn sorted(map: &HashStateMap<ColorSet>) -> Vec<(State, Vec<usize>)> {
    let mut entries: Vec<_> = map.entries().map(|(s, c)| (s, c.iter().collect())).collect();
    entries.sort_by_key(|(s, _)| *s);
    entries
}

pub fn all_colors() -> Vec<usize> {
    (0..COLORS).collect()
}

/// States mapped to every color.
pub fn full(states: &[State]) -> Vec<(State, Vec<usize>)> {
    states.iter().map(|s| (*s, all_colors())).collect()
}

