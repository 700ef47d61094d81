//! Operator implementations and the formula-to-graph compiler.

mod boolean;
mod first_order;
mod next;
mod until;

use crate::formula::{Formula, Quantifier};
use crate::operator::{Operator, OperatorRef};
use crate::{CheckError, CheckResult};
use ahash::AHashMap;
use parcheck_map::State;
use parcheck_model::Model;
use parcheck_params::Solver;

/// Variable assignment in scope, innermost binding last.
pub(crate) type Env = Vec<(String, State)>;

fn lookup(env: &Env, name: &str) -> CheckResult<State> {
    env.iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, s)| *s)
        .ok_or_else(|| CheckError::UnboundVariable { name: name.to_string() })
}

/// Reject formulas with unbound variables or atoms the model cannot
/// evaluate. Runs before any partition enters a collective round.
pub(crate) fn validate<P>(formula: &Formula, model: &dyn Model<P>) -> CheckResult<()> {
    fn walk<P>(formula: &Formula, model: &dyn Model<P>, scope: &mut Vec<String>) -> CheckResult<()> {
        let bound = |name: &str, scope: &Vec<String>| {
            if scope.iter().any(|n| n == name) {
                Ok(())
            } else {
                Err(CheckError::UnboundVariable { name: name.to_string() })
            }
        };
        match formula {
            Formula::True | Formula::False => Ok(()),
            Formula::Atom { atom } => model.check_atom(atom).map_err(|source| CheckError::UnknownAtom {
                atom: atom.clone(),
                source,
            }),
            Formula::Reference { name } => bound(name, scope),
            Formula::Not { inner } | Formula::Next { inner, .. } => walk(inner, model, scope),
            Formula::And { left, right }
            | Formula::Or { left, right }
            | Formula::Implies { left, right }
            | Formula::Equal { left, right } => {
                walk(left, model, scope)?;
                walk(right, model, scope)
            }
            Formula::Until { path, reach, .. } => {
                walk(path, model, scope)?;
                walk(reach, model, scope)
            }
            Formula::At { name, inner } => {
                bound(name, scope)?;
                walk(inner, model, scope)
            }
            Formula::Bind { name, inner } => {
                scope.push(name.clone());
                let result = walk(inner, model, scope);
                scope.pop();
                result
            }
            Formula::ForAll { name, bound: domain, inner } | Formula::Exists { name, bound: domain, inner } => {
                walk(domain, model, scope)?;
                scope.push(name.clone());
                let result = walk(inner, model, scope);
                scope.pop();
                result
            }
        }
    }
    walk(formula, model, &mut Vec::new())
}

/// Builds operator graphs, sharing nodes for structurally equal subformulas
/// under the same variable assignment.
///
/// The compiler must be dropped before the graph is computed, otherwise its
/// table keeps every intermediate result alive.
pub(crate) struct Compiler<S: Solver> {
    memo: AHashMap<(Formula, Env), OperatorRef<S>>,
}

impl<S: Solver + 'static> Compiler<S> {
    pub fn new() -> Self {
        Self { memo: AHashMap::new() }
    }

    /// Compile a validated formula.
    pub fn compile(&mut self, formula: &Formula, env: &Env) -> CheckResult<OperatorRef<S>> {
        let key = (formula.clone(), env.clone());
        if let Some(op) = self.memo.get(&key) {
            return Ok(op.clone());
        }
        let op = self.build(formula, env, formula.to_string())?;
        self.memo.insert(key, op.clone());
        Ok(op)
    }

    fn build(&mut self, formula: &Formula, env: &Env, label: String) -> CheckResult<OperatorRef<S>> {
        let op = match formula {
            Formula::True => Operator::new(label, Box::new(boolean::Constant { value: true })),
            Formula::False => Operator::new(label, Box::new(boolean::Constant { value: false })),
            Formula::Atom { atom } => Operator::new(label, Box::new(boolean::AtomOp { atom: atom.clone() })),
            Formula::Reference { name } => {
                let state = lookup(env, name)?;
                Operator::new(label, Box::new(boolean::Reference { state }))
            }
            Formula::Not { inner } => {
                let inner = self.compile(inner, env)?;
                Operator::new(label, Box::new(boolean::Not { inner }))
            }
            Formula::And { left, right } => {
                let left = self.compile(left, env)?;
                let right = self.compile(right, env)?;
                Operator::new(label, Box::new(boolean::And { left, right }))
            }
            Formula::Or { left, right } => {
                let left = self.compile(left, env)?;
                let right = self.compile(right, env)?;
                Operator::new(label, Box::new(boolean::Or { left, right }))
            }
            Formula::Implies { left, right } => {
                let lowered = Formula::or(Formula::not((**left).clone()), (**right).clone());
                return self.compile(&lowered, env);
            }
            Formula::Equal { left, right } => {
                let (l, r) = ((**left).clone(), (**right).clone());
                let lowered = Formula::or(
                    Formula::and(l.clone(), r.clone()),
                    Formula::and(Formula::not(l), Formula::not(r)),
                );
                return self.compile(&lowered, env);
            }
            Formula::Next {
                quantifier,
                direction,
                time_flow,
                inner,
            } => {
                let inner = self.compile(inner, env)?;
                match quantifier {
                    Quantifier::Exists => Operator::new(
                        label,
                        Box::new(next::ExistsNext {
                            inner,
                            direction: direction.clone(),
                            time_flow: *time_flow,
                        }),
                    ),
                    Quantifier::All => Operator::new(
                        label,
                        Box::new(next::AllNext {
                            inner,
                            direction: direction.clone(),
                            time_flow: *time_flow,
                        }),
                    ),
                }
            }
            Formula::Until {
                quantifier,
                weak,
                direction,
                time_flow,
                path,
                reach,
            } => {
                let path = self.compile(path, env)?;
                let reach = self.compile(reach, env)?;
                let operands = until::UntilOperands {
                    path,
                    reach,
                    direction: direction.clone(),
                    time_flow: *time_flow,
                    weak: *weak,
                };
                match quantifier {
                    Quantifier::Exists => Operator::new(label, Box::new(until::ExistsUntil(operands))),
                    Quantifier::All => Operator::new(label, Box::new(until::AllUntil(operands))),
                }
            }
            Formula::Bind { name, inner } => Operator::new(
                label,
                Box::new(first_order::Bind {
                    name: name.clone(),
                    inner: (**inner).clone(),
                    env: env.clone(),
                }),
            ),
            Formula::At { name, inner } => {
                let state = lookup(env, name)?;
                let inner = self.compile(inner, env)?;
                Operator::new(label, Box::new(first_order::At { state, inner }))
            }
            Formula::ForAll { name, bound, inner } | Formula::Exists { name, bound, inner } => {
                let bound = self.compile(bound, env)?;
                let body = first_order::Quantified {
                    universal: matches!(formula, Formula::ForAll { .. }),
                    name: name.clone(),
                    bound,
                    inner: (**inner).clone(),
                    env: env.clone(),
                };
                Operator::new(label, Box::new(body))
            }
        };
        Ok(op)
    }
}
