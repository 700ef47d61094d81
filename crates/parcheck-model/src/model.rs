//! The transition-system interface consumed by the checker.

use parcheck_map::{SharedMap, State};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Model error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("unknown direction '{name}'")]
    UnknownDirection { name: String },

    #[error("state {state} outside of state space of {state_count} states")]
    StateOutOfRange { state: State, state_count: usize },

    #[error("variable '{name}' has {found} values, expected {expected}")]
    ValueCount {
        name: String,
        expected: usize,
        found: usize,
    },
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Orientation of a move along a named dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Up,
    Down,
}

/// Metadata of a transition, matched by direction formulas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectionLabel {
    /// The transition stays in its source state.
    Loop,
    /// The transition moves along dimension `name`.
    Move { name: Arc<str>, facet: Facet },
}

impl DirectionLabel {
    pub fn up(name: &str) -> Self {
        DirectionLabel::Move {
            name: name.into(),
            facet: Facet::Up,
        }
    }

    pub fn down(name: &str) -> Self {
        DirectionLabel::Move {
            name: name.into(),
            facet: Facet::Down,
        }
    }
}

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionLabel::Loop => write!(f, "loop"),
            DirectionLabel::Move { name, facet: Facet::Up } => write!(f, "{name}+"),
            DirectionLabel::Move { name, facet: Facet::Down } => write!(f, "{name}-"),
        }
    }
}

/// An edge to `target` existing for the colors in `bound`.
///
/// For predecessor queries `target` is the source of the original edge; the
/// direction label is kept as on the original edge.
#[derive(Debug, Clone)]
pub struct Transition<P> {
    pub target: State,
    pub direction: DirectionLabel,
    pub bound: P,
}

pub type Transitions<P> = SmallVec<[Transition<P>; 4]>;

/// Comparison operator of a float proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn eval(self, left: f64, right: f64) -> bool {
        match self {
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
        }
    }
}

/// `variable cmp threshold`.
///
/// Equality and hashing compare the threshold bit for bit, so two
/// propositions are equal exactly when they are the same syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatProposition {
    pub variable: String,
    pub cmp: CmpOp,
    pub threshold: f64,
}

impl PartialEq for FloatProposition {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable
            && self.cmp == other.cmp
            && self.threshold.to_bits() == other.threshold.to_bits()
    }
}

impl Eq for FloatProposition {}

impl Hash for FloatProposition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variable.hash(state);
        self.cmp.hash(state);
        self.threshold.to_bits().hash(state);
    }
}

/// Whether a transition proposition looks at incoming or outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    In,
    Out,
}

/// Holds where an edge along `name` with `facet` enters or leaves the state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionProposition {
    pub name: String,
    pub flow: Flow,
    pub facet: Facet,
}

/// Atomic proposition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Atom {
    Float(FloatProposition),
    Transition(TransitionProposition),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(p) => write!(f, "{} {:?} {}", p.variable, p.cmp, p.threshold),
            Atom::Transition(p) => {
                let flow = match p.flow {
                    Flow::In => "in",
                    Flow::Out => "out",
                };
                let facet = match p.facet {
                    Facet::Up => "+",
                    Facet::Down => "-",
                };
                write!(f, "{}:{flow}{facet}", p.name)
            }
        }
    }
}

/// A parametrized transition system, as seen by one partition.
///
/// Implementations only need to answer queries about states the partition
/// owns and the edges touching them.
pub trait Model<P>: Send + Sync {
    fn state_count(&self) -> usize;

    /// Outgoing edges of `state`; incoming edges when `time_flow` is false.
    fn successors(&self, state: State, time_flow: bool) -> Transitions<P>;

    /// Incoming edges of `state`; outgoing edges when `time_flow` is false.
    fn predecessors(&self, state: State, time_flow: bool) -> Transitions<P> {
        self.successors(state, !time_flow)
    }

    fn eval_float_atom(&self, atom: &FloatProposition) -> ModelResult<SharedMap<P>>;

    fn eval_transition_atom(&self, atom: &TransitionProposition) -> ModelResult<SharedMap<P>>;

    /// Evaluate any atom.
    fn eval_atom(&self, atom: &Atom) -> ModelResult<SharedMap<P>> {
        match atom {
            Atom::Float(p) => self.eval_float_atom(p),
            Atom::Transition(p) => self.eval_transition_atom(p),
        }
    }

    /// Reject atoms this model cannot evaluate, without evaluating them.
    fn check_atom(&self, atom: &Atom) -> ModelResult<()>;
}
