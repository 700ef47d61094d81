//! Partitioned evaluation of parametric temporal-logic formulas.
//!
//! A [`Checker`] splits the state space of a [`Model`](parcheck_model::Model)
//! into partitions, runs one worker thread per partition and returns, for
//! every partition, the colors for which the formula holds in each of its
//! states.

pub mod checker;
pub mod config;
pub mod formula;
mod ops;
mod operator;

pub use checker::{merge_partitions, Checker};
pub use config::{CheckConfig, Transport};
pub use formula::{DirFormula, Formula, Quantifier};

use parcheck_channel::ChannelError;
use parcheck_map::MapError;
use parcheck_model::{Atom, ModelError, PartitionError, PartitionId};
use parcheck_params::AlgebraError;
use thiserror::Error;

/// Verification error.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("variable '{name}' is not bound")]
    UnboundVariable { name: String },

    #[error("unknown atom [{atom}]: {source}")]
    UnknownAtom {
        atom: Atom,
        #[source]
        source: ModelError,
    },

    #[error("operator '{operator}' depends on itself")]
    Cycle { operator: String },

    #[error("worker of partition {partition} panicked")]
    WorkerPanicked { partition: PartitionId },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("partition error: {0}")]
    Partition(#[from] PartitionError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("state map error: {0}")]
    Map(#[from] MapError),

    #[error("algebra error: {0}")]
    Algebra(#[from] AlgebraError),
}

pub type CheckResult<T> = Result<T, CheckError>;
