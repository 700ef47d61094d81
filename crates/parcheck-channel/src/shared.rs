//! In-process channel passing payloads by move.

use crate::exchange::Exchange;
use crate::{check_shape, outgoing_len, Channel, ChannelResult, ChannelStats, ChannelStatsSnapshot, Incoming, Outgoing};
use parcheck_map::State;
use parcheck_model::PartitionId;
use std::sync::Arc;
use tracing::trace;

/// One endpoint of a shared-memory group.
///
/// Values are handed over as they are, so every partition must share one
/// solver instance (or solvers whose values are interchangeable).
pub struct SharedMemoryChannel<P> {
    id: PartitionId,
    hub: Arc<Exchange<Vec<(State, P)>>>,
    stats: ChannelStats,
}

impl<P: Send> SharedMemoryChannel<P> {
    /// Create the `count` connected endpoints of one run, index-aligned with
    /// partition ids.
    pub fn group(count: usize) -> Vec<SharedMemoryChannel<P>> {
        let hub = Arc::new(Exchange::new(count));
        (0..count)
            .map(|id| SharedMemoryChannel {
                id,
                hub: Arc::clone(&hub),
                stats: ChannelStats::default(),
            })
            .collect()
    }
}

impl<P: Send> Channel<P> for SharedMemoryChannel<P> {
    fn partition_id(&self) -> PartitionId {
        self.id
    }

    fn partition_count(&self) -> usize {
        self.hub.partition_count()
    }

    fn map_reduce(&self, outgoing: Outgoing<P>) -> ChannelResult<Incoming<P>> {
        check_shape(&outgoing, self.hub.partition_count())?;
        let sent = outgoing_len(&outgoing);
        let received = self
            .hub
            .round(self.id, outgoing)?
            .map(|batches| batches.into_iter().flatten().collect::<Vec<_>>());
        let count = received.as_ref().map_or(0, Vec::len);
        let round = self.stats.record(sent, count);
        trace!(
            partition = self.id,
            round,
            sent,
            received = count,
            done = received.is_none(),
            "exchange round"
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

impl<P> std::fmt::Debug for SharedMemoryChannel<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemoryChannel")
            .field("id", &self.id)
            .field("stats", &self.stats)
            .finish()
    }
}
