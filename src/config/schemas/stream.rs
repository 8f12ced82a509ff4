/// Subscription manager configuration (C3).
use crate::config_struct;

config_struct! {
    /// Stream ingestion and reconnection tunables.
    pub struct StreamConfig {
        /// gRPC endpoint for the Geyser-style streaming transport.
        grpc_endpoint: String = "https://example-geyser-endpoint.invalid:443".to_string(),

        /// Optional bearer token for the streaming endpoint.
        grpc_token: String = String::new(),

        /// Base58 bonding-curve program id subscribed to.
        bonding_curve_program_id: String = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P".to_string(),

        /// Base58 AMM program id subscribed to (post-graduation pool).
        amm_program_id: String = "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA".to_string(),

        /// Commitment level requested on the subscription ("confirmed" by default).
        commitment: String = "confirmed".to_string(),

        /// Initial reconnect backoff.
        reconnect_base_ms: u64 = 1000,

        /// Reconnect backoff ceiling.
        reconnect_max_ms: u64 = 60_000,

        /// Reconnect attempts allowed per rolling minute before the manager
        /// stops retrying and waits out the window.
        max_reconnects_per_minute: u32 = 30,

        /// Consecutive failures after which the manager resets to the latest
        /// slot instead of replaying from the last checkpoint.
        max_failures_before_tip_reset: u32 = 30,

        /// How often a ping is expected; if no message (ping or otherwise)
        /// arrives within this window the stream is considered stalled.
        stall_timeout_secs: u64 = 30,
    }
}
