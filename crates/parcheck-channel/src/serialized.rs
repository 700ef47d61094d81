//! In-process channel that moves payloads as encoded frames.
//!
//! Each endpoint owns its solver. Values leave through the sender's
//! encoding and arrive through the receiver's decoding, which is the only
//! way values may cross between distinct solver instances.

use crate::codec::{decode_frame, encode_frame};
use crate::exchange::Exchange;
use crate::{check_shape, Channel, ChannelResult, ChannelStats, ChannelStatsSnapshot, Incoming, Outgoing};
use parcheck_model::PartitionId;
use parcheck_params::Solver;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

pub struct SerializedChannel<S: Solver> {
    id: PartitionId,
    solver: Arc<S>,
    hub: Arc<Exchange<Vec<u8>>>,
    stats: ChannelStats,
}

impl<S: Solver> SerializedChannel<S> {
    /// Connect one endpoint per solver; endpoint `i` belongs to partition `i`.
    pub fn group(solvers: Vec<Arc<S>>) -> Vec<SerializedChannel<S>> {
        let hub = Arc::new(Exchange::new(solvers.len()));
        solvers
            .into_iter()
            .enumerate()
            .map(|(id, solver)| SerializedChannel {
                id,
                solver,
                hub: Arc::clone(&hub),
                stats: ChannelStats::default(),
            })
            .collect()
    }

    pub fn solver(&self) -> &Arc<S> {
        &self.solver
    }

    fn encode(&self, outgoing: Outgoing<S::Params>) -> ChannelResult<(Vec<Option<Vec<u8>>>, usize, usize)> {
        let mut sent = 0;
        let mut bytes = 0;
        let mut frames = Vec::with_capacity(outgoing.len());
        for payload in outgoing {
            let frame = match payload {
                None => None,
                Some(entries) => {
                    sent += entries.len();
                    let frame = encode_frame(self.solver.as_ref(), &entries)?;
                    bytes += frame.len();
                    Some(frame)
                }
            };
            frames.push(frame);
        }
        Ok((frames, sent, bytes))
    }
}

impl<S: Solver> Channel<S::Params> for SerializedChannel<S> {
    fn partition_id(&self) -> PartitionId {
        self.id
    }

    fn partition_count(&self) -> usize {
        self.hub.partition_count()
    }

    fn map_reduce(&self, outgoing: Outgoing<S::Params>) -> ChannelResult<Incoming<S::Params>> {
        check_shape(&outgoing, self.hub.partition_count())?;
        let (frames, sent, bytes) = self.encode(outgoing)?;
        let received = match self.hub.round(self.id, frames)? {
            None => None,
            Some(frames) => {
                let mut entries = Vec::new();
                for frame in &frames {
                    entries.extend(decode_frame(self.solver.as_ref(), frame)?);
                }
                Some(entries)
            }
        };
        let count = received.as_ref().map_or(0, Vec::len);
        let round = self.stats.record(sent, count);
        trace!(
            partition = self.id,
            round,
            sent,
            bytes,
            received = count,
            done = received.is_none(),
            "serialized exchange round"
        );
        Ok(received)
    }

    fn stats(&self) -> ChannelStatsSnapshot {
        self.stats.snapshot()
    }

    fn abort(&self) {
        self.hub.abort();
    }
}

impl<S: Solver> fmt::Debug for SerializedChannel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedChannel")
            .field("id", &self.id)
            .field("stats", &self.stats)
            .finish()
    }
}
