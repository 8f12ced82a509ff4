/// External price recovery adapter configuration (C8).
use crate::config_struct;

config_struct! {
    pub struct AdapterConfig {
        /// Base URL of the token-pair aggregator HTTP API.
        aggregator_base_url: String = "https://api.dexscreener.com/latest/dex".to_string(),

        /// Sliding rate-limit window.
        rate_limit_window_ms: u64 = 60_000,

        /// Max aggregator requests allowed per window.
        max_requests_per_window: u32 = 50,

        /// Bound on requests queued awaiting the window to free up; beyond
        /// this the request fails fast rather than queuing indefinitely.
        max_queued_requests: usize = 200,

        /// Aggregator HTTP request timeout.
        aggregator_timeout_secs: u64 = 5,

        /// RPC adapter request timeout.
        rpc_timeout_secs: u64 = 30,

        /// Freshness window for the pool-state adapter: a snapshot older
        /// than this is treated as a miss, falling through to the next
        /// adapter.
        pool_state_freshness_secs: u64 = 3_600,

        /// Pool-state adapter cache TTL.
        pool_state_cache_ttl_secs: u64 = 30,

        /// Aggregator adapter cache TTL.
        aggregator_cache_ttl_secs: u64 = 60,

        /// Base58 RPC URL used by the RPC adapter fallback.
        rpc_url: String = "https://api.mainnet-beta.solana.com".to_string(),

        /// SOL/USD spot-price source, returning `{solana: {usd: <number>}}` (§6).
        sol_usd_api_url: String = "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd".to_string(),

        /// How often the SOL/USD rate is refreshed.
        sol_price_refresh_secs: u64 = 60,

        /// Request timeout for the SOL/USD spot-price source.
        sol_price_timeout_secs: u64 = 5,
    }
}
