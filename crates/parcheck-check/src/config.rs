//! Run configuration.

use parcheck_model::PartitionStrategy;
use serde::{Deserialize, Serialize};

/// How partitions exchange values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Values are moved between workers as they are.
    #[default]
    SharedMemory,
    /// Values are encoded into frames and decoded by the receiver.
    Serialized,
}

/// Configuration for a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Number of partitions (worker threads).
    pub partitions: usize,
    /// How states are assigned to partitions.
    pub strategy: PartitionStrategy,
    /// How partitions exchange values. Ignored for a single partition.
    pub transport: Transport,
    /// Whether purely local loops may use the rayon pool.
    pub parallel: bool,
    /// Number of rayon threads (0 = use all available).
    pub num_threads: usize,
    /// Local state count below which loops stay sequential.
    pub parallel_threshold: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            partitions: 1,
            strategy: PartitionStrategy::Uniform,
            transport: Transport::SharedMemory,
            parallel: false,
            num_threads: 0,
            parallel_threshold: 4096,
        }
    }
}

impl CheckConfig {
    /// Default configuration with `partitions` workers.
    pub fn with_partitions(partitions: usize) -> Self {
        Self {
            partitions,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CheckConfig =
            serde_json::from_str(r#"{"partitions":3,"strategy":{"kind":"hash"},"transport":"serialized"}"#).unwrap();
        assert_eq!(config.partitions, 3);
        assert_eq!(config.strategy, PartitionStrategy::Hash);
        assert_eq!(config.transport, Transport::Serialized);
        assert_eq!(config.parallel_threshold, CheckConfig::default().parallel_threshold);
    }

    #[test]
    fn test_round_trip() {
        let config = CheckConfig {
            strategy: PartitionStrategy::Block { size: 8 },
            parallel: true,
            ..CheckConfig::with_partitions(4)
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CheckConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
