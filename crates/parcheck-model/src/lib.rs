//! Transition systems as seen by a partitioned checker.
//!
//! - [`partition`]: ownership strategies deciding which partition evaluates
//!   which states.
//! - [`model`]: the interface a transition-system adapter implements.
//! - [`explicit`]: an explicit edge-list adapter.

pub mod explicit;
pub mod model;
pub mod partition;

pub use explicit::{ExplicitModel, ExplicitModelBuilder};
pub use model::{
    Atom, CmpOp, DirectionLabel, Facet, FloatProposition, Flow, Model, ModelError, ModelResult,
    Transition, TransitionProposition, Transitions,
};
pub use partition::{
    Partition, PartitionError, PartitionFunction, PartitionId, PartitionResult, PartitionStrategy,
};
