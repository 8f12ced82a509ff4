/// Stale detector and recovery queue configuration (C7).
use crate::config_struct;

config_struct! {
    pub struct RecoveryConfig {
        /// Age above which a qualifying token is considered stale.
        stale_threshold_minutes: i64 = 30,

        /// Age above which a token is considered critically stale (adds to
        /// the priority score rather than gating the scan itself).
        critical_stale_minutes: i64 = 60,

        /// Market-cap tier floor: "critical" (priority +30).
        mcap_tier_critical: f64 = 50_000.0,

        /// Market-cap tier floor: "high" (priority +20).
        mcap_tier_high: f64 = 20_000.0,

        /// Market-cap tier floor: "medium" (priority +10).
        mcap_tier_medium: f64 = 10_000.0,

        /// Market-cap tier floor: "low" (priority +5); also the minimum
        /// market cap the stale scan considers at all.
        mcap_tier_low: f64 = 5_000.0,

        /// Scan cadence.
        scan_interval_minutes: i64 = 5,

        /// Max stale tokens pulled into a single scan batch.
        batch_size: usize = 100,

        /// Bounded-concurrency recovery worker count.
        max_concurrent_recoveries: usize = 3,

        /// Attempts before a queue item is dropped.
        max_retries: u32 = 3,

        /// Run a startup recovery pass if the gap since the last batch
        /// exceeds this threshold.
        enable_startup_recovery: bool = true,

        /// Startup recovery gap threshold.
        startup_recovery_threshold_minutes: i64 = 5,

        /// Market cap floor for the startup recovery pass (broader than the
        /// steady-state scan floor, to catch everything worth refreshing
        /// after downtime).
        startup_recovery_mcap_floor: f64 = 1_000.0,

        /// Deadline given to in-flight workers to finish during a
        /// cooperative shutdown before the batch is marked cancelled.
        shutdown_drain_deadline_secs: u64 = 10,
    }
}
