//! Explicit edge-list transition system.
//!
//! A reference adapter: every partition shares one instance and only asks
//! about the states it owns.

use crate::model::{
    Atom, DirectionLabel, FloatProposition, Flow, Model, ModelError, ModelResult, Transition,
    TransitionProposition, Transitions,
};
use ahash::{AHashMap, AHashSet};
use parcheck_map::{ConstantStateMap, HashStateMap, SharedMap, State, StateSet};
use parcheck_params::{or_opt, Solver};
use std::sync::Arc;

/// Builder for [`ExplicitModel`].
pub struct ExplicitModelBuilder<S: Solver> {
    solver: Arc<S>,
    state_count: usize,
    edges: Vec<(State, State, DirectionLabel, S::Params)>,
    variables: AHashMap<String, Vec<f64>>,
    dimensions: Option<AHashSet<String>>,
}

impl<S: Solver> ExplicitModelBuilder<S> {
    pub fn new(solver: Arc<S>, state_count: usize) -> Self {
        Self {
            solver,
            state_count,
            edges: Vec::new(),
            variables: AHashMap::new(),
            dimensions: None,
        }
    }

    /// Declare a dimension moves may be labelled with.
    ///
    /// Once any dimension is declared the set is closed: edges and transition
    /// propositions naming another dimension are rejected. Without
    /// declarations every name is accepted, and a dimension no edge moves
    /// along makes its transition propositions empty.
    pub fn dimension(mut self, name: &str) -> Self {
        self.dimensions.get_or_insert_with(AHashSet::new).insert(name.to_string());
        self
    }

    /// Add an edge `from -> to` existing for `bound`.
    pub fn edge(mut self, from: State, to: State, direction: DirectionLabel, bound: S::Params) -> Self {
        self.edges.push((from, to, direction, bound));
        self
    }

    /// Add an edge existing for every color.
    pub fn full_edge(self, from: State, to: State, direction: DirectionLabel) -> Self {
        let tt = self.solver.tt();
        self.edge(from, to, direction, tt)
    }

    /// Define a variable with one value per state.
    pub fn variable(mut self, name: &str, values: Vec<f64>) -> Self {
        self.variables.insert(name.to_string(), values);
        self
    }

    pub fn build(self) -> ModelResult<ExplicitModel<S>> {
        let n = self.state_count;
        for (name, values) in &self.variables {
            if values.len() != n {
                return Err(ModelError::ValueCount {
                    name: name.clone(),
                    expected: n,
                    found: values.len(),
                });
            }
        }

        let mut forward: Vec<Vec<Transition<S::Params>>> = vec![Vec::new(); n];
        let mut backward: Vec<Vec<Transition<S::Params>>> = vec![Vec::new(); n];
        for (from, to, direction, bound) in self.edges {
            for s in [from, to] {
                if s >= n {
                    return Err(ModelError::StateOutOfRange {
                        state: s,
                        state_count: n,
                    });
                }
            }
            if let (DirectionLabel::Move { name, .. }, Some(declared)) = (&direction, &self.dimensions) {
                if !declared.contains(&**name) {
                    return Err(ModelError::UnknownDirection { name: name.to_string() });
                }
            }
            forward[from].push(Transition {
                target: to,
                direction: direction.clone(),
                bound: bound.clone(),
            });
            backward[to].push(Transition {
                target: from,
                direction,
                bound,
            });
        }

        Ok(ExplicitModel {
            solver: self.solver,
            state_count: n,
            forward,
            backward,
            variables: self.variables,
            dimensions: self.dimensions,
        })
    }
}

/// Explicitly enumerated parametrized transition system.
pub struct ExplicitModel<S: Solver> {
    solver: Arc<S>,
    state_count: usize,
    forward: Vec<Vec<Transition<S::Params>>>,
    backward: Vec<Vec<Transition<S::Params>>>,
    variables: AHashMap<String, Vec<f64>>,
    /// Closed set of dimensions, if the builder declared one.
    dimensions: Option<AHashSet<String>>,
}

impl<S: Solver> ExplicitModel<S> {
    pub fn builder(solver: Arc<S>, state_count: usize) -> ExplicitModelBuilder<S> {
        ExplicitModelBuilder::new(solver, state_count)
    }

    pub fn solver(&self) -> &Arc<S> {
        &self.solver
    }

    fn check_direction(&self, name: &str) -> ModelResult<()> {
        if self.dimensions.as_ref().map_or(true, |d| d.contains(name)) {
            Ok(())
        } else {
            Err(ModelError::UnknownDirection {
                name: name.to_string(),
            })
        }
    }
}

impl<S: Solver + 'static> Model<S::Params> for ExplicitModel<S> {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn successors(&self, state: State, time_flow: bool) -> Transitions<S::Params> {
        let edges = if time_flow { &self.forward } else { &self.backward };
        edges
            .get(state)
            .map(|ts| ts.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn eval_float_atom(&self, atom: &FloatProposition) -> ModelResult<SharedMap<S::Params>> {
        let values = self
            .variables
            .get(&atom.variable)
            .ok_or_else(|| ModelError::UnknownVariable {
                name: atom.variable.clone(),
            })?;
        let holds = values
            .iter()
            .enumerate()
            .filter(|(_, v)| atom.cmp.eval(**v, atom.threshold))
            .map(|(s, _)| s);
        let domain = StateSet::from_states(self.state_count, holds);
        Ok(Arc::new(ConstantStateMap::new(domain, self.solver.tt())))
    }

    fn eval_transition_atom(&self, atom: &TransitionProposition) -> ModelResult<SharedMap<S::Params>> {
        self.check_direction(&atom.name)?;
        let edges = match atom.flow {
            Flow::Out => &self.forward,
            Flow::In => &self.backward,
        };
        let mut out = HashStateMap::new(self.state_count);
        for (state, transitions) in edges.iter().enumerate() {
            let mut value: Option<S::Params> = None;
            for t in transitions {
                let matches = matches!(
                    &t.direction,
                    DirectionLabel::Move { name, facet } if **name == *atom.name && *facet == atom.facet
                );
                if matches {
                    value = or_opt(self.solver.as_ref(), value.as_ref(), Some(&t.bound));
                }
            }
            if let Some(value) = value.filter(|v| self.solver.is_sat(v)) {
                out.insert(state, value);
            }
        }
        Ok(Arc::new(out))
    }

    fn check_atom(&self, atom: &Atom) -> ModelResult<()> {
        match atom {
            Atom::Float(p) => {
                if self.variables.contains_key(&p.variable) {
                    Ok(())
                } else {
                    Err(ModelError::UnknownVariable {
                        name: p.variable.clone(),
                    })
                }
            }
            Atom::Transition(p) => self.check_direction(&p.name),
        }
    }
}
