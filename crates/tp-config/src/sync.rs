//! Tunables for inference and the upsert executor.

use serde::{Deserialize, Serialize};

const fn default_chunk_size() -> usize {
    200
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    250
}

const fn default_max_delay_ms() -> u64 {
    8_000
}

const fn default_parallelism() -> usize {
    4
}

const fn default_sample_size() -> usize {
    500
}

const fn default_incremental_lookback_days() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Records per upsert call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Attempts per chunk (and per isolated record), including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on the backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Chunks of one entity type in flight at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Records sampled per entity type for schema inference.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Days an incremental fetch reaches back before the watermark, so
    /// vouchers entered late with an earlier date are still picked up.
    #[serde(default = "default_incremental_lookback_days")]
    pub incremental_lookback_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            parallelism: default_parallelism(),
            sample_size: default_sample_size(),
            incremental_lookback_days: default_incremental_lookback_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = SyncConfig::default();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.sample_size, 500);
        assert_eq!(config.incremental_lookback_days, 30);
    }
}
