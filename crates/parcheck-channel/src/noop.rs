//! Channel of a single-partition run.

use crate::{check_shape, outgoing_len, Channel, ChannelError, ChannelResult, ChannelStats, ChannelStatsSnapshot, Incoming, Outgoing};
use parcheck_model::PartitionId;
use tracing::trace;

/// With only one partition there is nobody to talk to. Any attempt to send
/// means a state was misrouted, which is a bug.
#[derive(Debug, Default)]
pub struct NoOpChannel {
    stats: ChannelStats,
}

impl NoOpChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> Channel<P> for NoOpChannel {
    fn partition_id(&self) -> PartitionId {
        0
    }

    fn partition_count(&self) -> usize {
        1
    }

    fn map_reduce(&self, outgoing: Outgoing<P>) -> ChannelResult<Incoming<P>> {
        check_shape(&outgoing, 1)?;
        let entries = outgoing_len(&outgoing);
        if entries > 0 {
            return Err(ChannelError::NoPeers { entries });
        }
        let round = self.stats.record(0, 0);
        trace!(round, "local round");
        // An empty payload is still a payload: it keeps a fixed point going.
        Ok(outgoing.into_iter().next().flatten())
    }

    fn stats(&self) -> ChannelStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_terminates() {
        let channel = NoOpChannel::new();
        let got = Channel::<bool>::map_reduce(&channel, vec![None]).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_empty_payload_is_not_termination() {
        let channel = NoOpChannel::new();
        let got = Channel::<bool>::map_reduce(&channel, vec![Some(vec![])]).unwrap();
        assert_eq!(got, Some(vec![]));
        assert_eq!(Channel::<bool>::stats(&channel).rounds, 1);
    }

    #[test]
    fn test_sending_is_an_error() {
        let channel = NoOpChannel::new();
        let err = Channel::<bool>::map_reduce(&channel, vec![Some(vec![(3, true)])]).unwrap_err();
        assert!(matches!(err, ChannelError::NoPeers { entries: 1 }));

        let err = Channel::<bool>::map_reduce(&channel, vec![None, None]).unwrap_err();
        assert!(matches!(err, ChannelError::Shape { expected: 1, found: 2 }));
    }
}
