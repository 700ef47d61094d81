//! Formula syntax trees.
//!
//! Formulas are plain data: they are built by a parser or by hand and
//! compiled per partition into an operator graph.

use parcheck_model::{Atom, DirectionLabel, Facet, Transition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path quantifier of a temporal operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    Exists,
    All,
}

/// Predicate over transition metadata, restricting the edges a temporal
/// operator may follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DirFormula {
    True,
    False,
    /// Self-loop transitions.
    Loop,
    /// Moves along dimension `name`; `facet: None` matches both facets.
    Atom {
        name: String,
        #[serde(default)]
        facet: Option<Facet>,
    },
    Not { inner: Box<DirFormula> },
    And { left: Box<DirFormula>, right: Box<DirFormula> },
    Or { left: Box<DirFormula>, right: Box<DirFormula> },
}

impl DirFormula {
    pub fn eval(&self, direction: &DirectionLabel) -> bool {
        match self {
            DirFormula::True => true,
            DirFormula::False => false,
            DirFormula::Loop => matches!(direction, DirectionLabel::Loop),
            DirFormula::Atom { name, facet } => match direction {
                DirectionLabel::Loop => false,
                DirectionLabel::Move { name: dim, facet: f } => {
                    **dim == **name && facet.map_or(true, |facet| facet == *f)
                }
            },
            DirFormula::Not { inner } => !inner.eval(direction),
            DirFormula::And { left, right } => left.eval(direction) && right.eval(direction),
            DirFormula::Or { left, right } => left.eval(direction) || right.eval(direction),
        }
    }

    /// Whether a temporal operator may follow `transition`.
    #[inline]
    pub fn accepts<P>(&self, transition: &Transition<P>) -> bool {
        self.eval(&transition.direction)
    }
}

impl fmt::Display for DirFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirFormula::True => write!(f, "true"),
            DirFormula::False => write!(f, "false"),
            DirFormula::Loop => write!(f, "loop"),
            DirFormula::Atom { name, facet: None } => write!(f, "{name}"),
            DirFormula::Atom { name, facet: Some(Facet::Up) } => write!(f, "{name}+"),
            DirFormula::Atom { name, facet: Some(Facet::Down) } => write!(f, "{name}-"),
            DirFormula::Not { inner } => write!(f, "!{inner}"),
            DirFormula::And { left, right } => write!(f, "({left} && {right})"),
            DirFormula::Or { left, right } => write!(f, "({left} || {right})"),
        }
    }
}

/// A state formula of parametric CTL with first-order extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Formula {
    True,
    False,
    Atom { atom: Atom },
    /// Holds exactly in the state bound to variable `name`.
    Reference { name: String },
    Not { inner: Box<Formula> },
    And { left: Box<Formula>, right: Box<Formula> },
    Or { left: Box<Formula>, right: Box<Formula> },
    Implies { left: Box<Formula>, right: Box<Formula> },
    Equal { left: Box<Formula>, right: Box<Formula> },
    /// `EX`/`AX` over transitions accepted by `direction`.
    Next {
        quantifier: Quantifier,
        direction: DirFormula,
        #[serde(default = "forward")]
        time_flow: bool,
        inner: Box<Formula>,
    },
    /// `E[path U reach]`, `A[path U reach]` and their weak variants.
    Until {
        quantifier: Quantifier,
        #[serde(default)]
        weak: bool,
        direction: DirFormula,
        #[serde(default = "forward")]
        time_flow: bool,
        path: Box<Formula>,
        reach: Box<Formula>,
    },
    /// `inner` with `name` bound to the state it is evaluated in.
    Bind { name: String, inner: Box<Formula> },
    /// `inner` evaluated in the state bound to `name`.
    At { name: String, inner: Box<Formula> },
    /// `inner` holds for every state of `bound` substituted for `name`.
    ForAll { name: String, bound: Box<Formula>, inner: Box<Formula> },
    /// `inner` holds for some state of `bound` substituted for `name`.
    Exists { name: String, bound: Box<Formula>, inner: Box<Formula> },
}

fn forward() -> bool {
    true
}

impl Formula {
    pub fn atom(atom: Atom) -> Self {
        Formula::Atom { atom }
    }

    pub fn reference(name: &str) -> Self {
        Formula::Reference { name: name.to_string() }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Formula) -> Self {
        Formula::Not { inner: Box::new(inner) }
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Formula::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Formula::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn implies(left: Formula, right: Formula) -> Self {
        Formula::Implies {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: Formula, right: Formula) -> Self {
        Formula::Equal {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn next(quantifier: Quantifier, direction: DirFormula, time_flow: bool, inner: Formula) -> Self {
        Formula::Next {
            quantifier,
            direction,
            time_flow,
            inner: Box::new(inner),
        }
    }

    /// `EX inner` along every direction, forward in time.
    pub fn ex(inner: Formula) -> Self {
        Formula::next(Quantifier::Exists, DirFormula::True, true, inner)
    }

    /// `AX inner` along every direction, forward in time.
    pub fn ax(inner: Formula) -> Self {
        Formula::next(Quantifier::All, DirFormula::True, true, inner)
    }

    pub fn until(
        quantifier: Quantifier,
        weak: bool,
        direction: DirFormula,
        time_flow: bool,
        path: Formula,
        reach: Formula,
    ) -> Self {
        Formula::Until {
            quantifier,
            weak,
            direction,
            time_flow,
            path: Box::new(path),
            reach: Box::new(reach),
        }
    }

    pub fn eu(path: Formula, reach: Formula) -> Self {
        Formula::until(Quantifier::Exists, false, DirFormula::True, true, path, reach)
    }

    pub fn au(path: Formula, reach: Formula) -> Self {
        Formula::until(Quantifier::All, false, DirFormula::True, true, path, reach)
    }

    pub fn ew(path: Formula, reach: Formula) -> Self {
        Formula::until(Quantifier::Exists, true, DirFormula::True, true, path, reach)
    }

    pub fn aw(path: Formula, reach: Formula) -> Self {
        Formula::until(Quantifier::All, true, DirFormula::True, true, path, reach)
    }

    /// `EF inner = E[true U inner]`.
    pub fn ef_along(direction: DirFormula, time_flow: bool, inner: Formula) -> Self {
        Formula::until(Quantifier::Exists, false, direction, time_flow, Formula::True, inner)
    }

    /// `AF inner = A[true U inner]`.
    pub fn af_along(direction: DirFormula, time_flow: bool, inner: Formula) -> Self {
        Formula::until(Quantifier::All, false, direction, time_flow, Formula::True, inner)
    }

    /// `EG inner = !AF !inner`.
    pub fn eg_along(direction: DirFormula, time_flow: bool, inner: Formula) -> Self {
        Formula::not(Formula::af_along(direction, time_flow, Formula::not(inner)))
    }

    /// `AG inner = !EF !inner`.
    pub fn ag_along(direction: DirFormula, time_flow: bool, inner: Formula) -> Self {
        Formula::not(Formula::ef_along(direction, time_flow, Formula::not(inner)))
    }

    pub fn ef(inner: Formula) -> Self {
        Formula::ef_along(DirFormula::True, true, inner)
    }

    pub fn af(inner: Formula) -> Self {
        Formula::af_along(DirFormula::True, true, inner)
    }

    pub fn eg(inner: Formula) -> Self {
        Formula::eg_along(DirFormula::True, true, inner)
    }

    pub fn ag(inner: Formula) -> Self {
        Formula::ag_along(DirFormula::True, true, inner)
    }

    pub fn bind(name: &str, inner: Formula) -> Self {
        Formula::Bind {
            name: name.to_string(),
            inner: Box::new(inner),
        }
    }

    pub fn at(name: &str, inner: Formula) -> Self {
        Formula::At {
            name: name.to_string(),
            inner: Box::new(inner),
        }
    }

    pub fn for_all(name: &str, bound: Formula, inner: Formula) -> Self {
        Formula::ForAll {
            name: name.to_string(),
            bound: Box::new(bound),
            inner: Box::new(inner),
        }
    }

    pub fn exists(name: &str, bound: Formula, inner: Formula) -> Self {
        Formula::Exists {
            name: name.to_string(),
            bound: Box::new(bound),
            inner: Box::new(inner),
        }
    }
}

fn quantifier_prefix(q: Quantifier) -> &'static str {
    match q {
        Quantifier::Exists => "E",
        Quantifier::All => "A",
    }
}

/// Direction and time-flow annotation, omitted when it is the default.
struct Along<'a>(&'a DirFormula, bool);

impl fmt::Display for Along<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Along(direction, time_flow) = self;
        if **direction != DirFormula::True {
            write!(f, "{{{direction}}}")?;
        }
        if !time_flow {
            write!(f, "<-")?;
        }
        Ok(())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Atom { atom } => write!(f, "[{atom}]"),
            Formula::Reference { name } => write!(f, "{name}"),
            Formula::Not { inner } => write!(f, "!{inner}"),
            Formula::And { left, right } => write!(f, "({left} && {right})"),
            Formula::Or { left, right } => write!(f, "({left} || {right})"),
            Formula::Implies { left, right } => write!(f, "({left} -> {right})"),
            Formula::Equal { left, right } => write!(f, "({left} <-> {right})"),
            Formula::Next {
                quantifier,
                direction,
                time_flow,
                inner,
            } => write!(
                f,
                "{}X{} {inner}",
                quantifier_prefix(*quantifier),
                Along(direction, *time_flow)
            ),
            Formula::Until {
                quantifier,
                weak,
                direction,
                time_flow,
                path,
                reach,
            } => write!(
                f,
                "{}[{path} {}{} {reach}]",
                quantifier_prefix(*quantifier),
                if *weak { "W" } else { "U" },
                Along(direction, *time_flow)
            ),
            Formula::Bind { name, inner } => write!(f, "(bind {name}: {inner})"),
            Formula::At { name, inner } => write!(f, "(at {name}: {inner})"),
            Formula::ForAll { name, bound, inner } => write!(f, "(forall {name} in {bound}: {inner})"),
            Formula::Exists { name, bound, inner } => write!(f, "(exists {name} in {bound}: {inner})"),
        }
    }
}
