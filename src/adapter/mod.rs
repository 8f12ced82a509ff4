//! External price recovery adapters (C8): a fallback chain the recovery
//! queue (C7) calls when a stale token needs its price refreshed without a
//! live trade to derive it from (§4.8).

mod aggregator;
mod chain;
mod pool_state;
mod rpc;

pub use aggregator::AggregatorAdapter;
pub use chain::FallbackAdapterChain;
pub use pool_state::PoolStateAdapter;
pub use rpc::RpcAdapter;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A price quote recovered for a mint, tagged with the adapter that
/// produced it (§4.8 "returns `{price_sol, price_usd, market_cap_usd,
/// source_tag, metadata}`").
#[derive(Debug, Clone)]
pub struct AdapterQuote {
    pub price_sol: f64,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub source_tag: &'static str,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("no fresh data available")]
    Miss,
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),
    #[error("request failed: {0}")]
    Request(String),
}

/// One step in the fallback chain. Each adapter is tried in order; a
/// [`AdapterError`] means "try the next one", not "stop".
#[async_trait]
pub trait PriceAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn quote(&self, mint: &str) -> Result<AdapterQuote, AdapterError>;
}
