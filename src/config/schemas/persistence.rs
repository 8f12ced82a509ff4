/// Batching persistence configuration (C6).
use crate::config_struct;

config_struct! {
    pub struct PersistenceConfig {
        /// Path to the SQLite database file. ":memory:" is honoured for tests.
        db_path: String = "data/pipeline.db".to_string(),

        /// Minimum market cap (USD) for a trade to be written via the
        /// comprehensive persistence pipeline; below this it is counted but
        /// discarded (§4.5 threshold gating).
        market_cap_threshold_usd: f64 = 8_888.0,

        /// Write-batcher flush cadence.
        batch_interval_ms: u64 = 1_000,

        /// Write-batcher max rows drained per flush, per kind.
        batch_size: usize = 100,

        /// Bound on how many times a failed batch is re-queued at the head
        /// before being dropped to preserve liveness.
        max_requeue_depth: u32 = 1,
    }
}
