/// Performance monitor configuration (C9).
use crate::config_struct;

config_struct! {
    pub struct MonitorConfig {
        /// Sampling cadence for raw snapshots (parse latency, lag, resource use).
        snapshot_interval_secs: u64 = 5,

        /// Aggregation cadence (averages + p95/p99) and persistence.
        aggregate_interval_secs: u64 = 60,

        /// Parse-latency alert threshold, milliseconds.
        parse_latency_threshold_ms: f64 = 50.0,

        /// Stream lag alert threshold, milliseconds.
        stream_lag_threshold_ms: f64 = 1_000.0,

        /// Missed/unparsed transaction rate alert threshold (fraction).
        missed_tx_rate_threshold: f64 = 0.01,

        /// Process memory alert threshold, bytes (1 GiB).
        memory_threshold_bytes: u64 = 1_073_741_824,

        /// Process CPU alert threshold, percent.
        cpu_threshold_pct: f64 = 80.0,

        /// Queue-depth alert threshold (any bounded work queue).
        queue_depth_threshold: usize = 1_000,
    }
}
