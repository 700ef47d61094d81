//! Collective communication between the partitions of one run.
//!
//! Every partition calls [`Channel::map_reduce`] the same number of times,
//! in the same order. Each call is a rendezvous: all partitions submit their
//! outgoing payloads, then each reads what was addressed to it. When nobody
//! sent anything to anyone, every partition receives `None`, which is the
//! global termination signal of distributed fixed points.

pub mod codec;
pub mod exchange;
pub mod noop;
pub mod serialized;
pub mod shared;

pub use exchange::{Aborted, Exchange};
pub use noop::NoOpChannel;
pub use serialized::SerializedChannel;
pub use shared::SharedMemoryChannel;

use parcheck_map::State;
use parcheck_model::PartitionId;
use parcheck_params::AlgebraError;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Channel error. Every variant is a fatal protocol violation.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("outgoing payload has {found} destinations, expected {expected}")]
    Shape { expected: usize, found: usize },

    #[error("single-partition channel asked to send {entries} entries")]
    NoPeers { entries: usize },

    #[error("state {state} does not fit the wire format")]
    StateTooLarge { state: State },

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("exchange aborted by another partition")]
    Aborted,

    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Per-destination payloads of one round, indexed by partition id.
pub type Outgoing<P> = Vec<Option<Vec<(State, P)>>>;

/// Everything addressed to this partition in one round, or `None` when the
/// whole run sent nothing.
pub type Incoming<P> = Option<Vec<(State, P)>>;

/// The collective exchange primitive.
pub trait Channel<P>: Send + Sync {
    fn partition_id(&self) -> PartitionId;

    fn partition_count(&self) -> usize;

    /// Exchange one round of payloads with every other partition.
    ///
    /// Blocks until all partitions of the run make the matching call.
    fn map_reduce(&self, outgoing: Outgoing<P>) -> ChannelResult<Incoming<P>>;

    fn stats(&self) -> ChannelStatsSnapshot;

    /// Tear the run down after a local failure, so peers blocked in a round
    /// return [`ChannelError::Aborted`] instead of waiting forever.
    fn abort(&self) {}
}

impl From<Aborted> for ChannelError {
    fn from(_: Aborted) -> Self {
        ChannelError::Aborted
    }
}

/// An outgoing array with nothing to send.
pub fn empty_outgoing<P>(partition_count: usize) -> Outgoing<P> {
    (0..partition_count).map(|_| None).collect()
}

/// Reject payload arrays of the wrong shape before entering a round.
pub(crate) fn check_shape<P>(outgoing: &Outgoing<P>, expected: usize) -> ChannelResult<()> {
    if outgoing.len() != expected {
        return Err(ChannelError::Shape {
            expected,
            found: outgoing.len(),
        });
    }
    Ok(())
}

/// Round and traffic counters of one endpoint.
#[derive(Debug, Default)]
pub struct ChannelStats {
    rounds: AtomicUsize,
    sent: AtomicUsize,
    received: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStatsSnapshot {
    pub rounds: usize,
    pub sent: usize,
    pub received: usize,
}

impl ChannelStats {
    pub(crate) fn record(&self, sent: usize, received: usize) -> usize {
        self.sent.fetch_add(sent, Ordering::Relaxed);
        self.received.fetch_add(received, Ordering::Relaxed);
        self.rounds.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            rounds: self.rounds.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
        }
    }
}

/// Number of entries in an outgoing array.
pub(crate) fn outgoing_len<P>(outgoing: &Outgoing<P>) -> usize {
    outgoing.iter().flatten().map(Vec::len).sum()
}
