use super::{AdapterError, AdapterQuote, PriceAdapter};
use crate::config::{AdapterConfig, PriceConfig};
use crate::persistence::PersistenceStore;
use crate::price;
use crate::trade_handler::SolPriceSource;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reads the most recent pool-state snapshot for a mint (§4.8 adapter 1,
/// "fastest, no network"). Falls through when the snapshot is missing or
/// older than `pool_state_freshness_secs`.
pub struct PoolStateAdapter {
    store: Arc<PersistenceStore>,
    price_config: PriceConfig,
    adapter_config: AdapterConfig,
    sol_price: Arc<dyn SolPriceSource>,
    cache: Mutex<HashMap<String, (Instant, AdapterQuote)>>,
}

impl PoolStateAdapter {
    pub fn new(
        store: Arc<PersistenceStore>,
        price_config: PriceConfig,
        adapter_config: AdapterConfig,
        sol_price: Arc<dyn SolPriceSource>,
    ) -> Self {
        Self { store, price_config, adapter_config, sol_price, cache: Mutex::new(HashMap::new()) }
    }

    fn cached(&self, mint: &str) -> Option<AdapterQuote> {
        let cache = self.cache.lock();
        let (cached_at, quote) = cache.get(mint)?;
        if cached_at.elapsed() <= Duration::from_secs(self.adapter_config.pool_state_cache_ttl_secs) {
            Some(quote.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl PriceAdapter for PoolStateAdapter {
    fn name(&self) -> &'static str {
        "pool_state"
    }

    async fn quote(&self, mint: &str) -> Result<AdapterQuote, AdapterError> {
        if let Some(quote) = self.cached(mint) {
            return Ok(quote);
        }

        let snapshot = self
            .store
            .latest_pool_snapshot(mint)
            .map_err(|e| AdapterError::Request(e.to_string()))?
            .ok_or(AdapterError::Miss)?;

        let age = Utc::now().signed_duration_since(snapshot.timestamp);
        if age.num_seconds() < 0 || age.num_seconds() as u64 > self.adapter_config.pool_state_freshness_secs {
            return Err(AdapterError::Miss);
        }

        let reserve_price = price::price_from_reserves(
            snapshot.virtual_sol_reserves,
            snapshot.virtual_token_reserves,
            self.sol_price.sol_usd(),
            self.price_config.sol_decimals,
            self.price_config.token_decimals,
            self.price_config.fully_diluted_supply,
        );
        if reserve_price.price_sol <= 0.0 {
            return Err(AdapterError::Miss);
        }

        let quote = AdapterQuote {
            price_sol: reserve_price.price_sol,
            price_usd: reserve_price.price_usd,
            market_cap_usd: reserve_price.market_cap_usd,
            source_tag: "pool_state",
            metadata: json!({ "pool_address": snapshot.pool_address, "slot": snapshot.slot }),
        };
        self.cache.lock().insert(mint.to_string(), (Instant::now(), quote.clone()));
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PoolStateSnapshot, Program};
    use crate::persistence::{PendingRow, PersistenceStore};
    use crate::trade_handler::StaticSolPrice;

    fn adapter_with_snapshot(snapshot: PoolStateSnapshot) -> PoolStateAdapter {
        crate::config::ensure_test_config();
        let store = Arc::new(PersistenceStore::in_memory().unwrap());
        store
            .insert_batch(&[PendingRow::PoolSnapshot { snapshot, program: Program::BondingCurve }])
            .unwrap();
        PoolStateAdapter::new(store, PriceConfig::default(), AdapterConfig::default(), Arc::new(StaticSolPrice(200.0)))
    }

    #[tokio::test]
    async fn fresh_snapshot_yields_quote() {
        let adapter = adapter_with_snapshot(PoolStateSnapshot {
            pool_address: "pool1".to_string(),
            mint: "MintA".to_string(),
            virtual_sol_reserves: 30_000_000_000,
            virtual_token_reserves: 1_000_000_000_000_000,
            real_sol_reserves: 0,
            real_token_reserves: 0,
            pool_open: true,
            slot: 1,
            timestamp: Utc::now(),
        });

        let quote = adapter.quote("MintA").await.unwrap();
        assert!(quote.price_sol > 0.0);
        assert_eq!(quote.source_tag, "pool_state");
    }

    #[tokio::test]
    async fn stale_snapshot_misses() {
        let adapter_config = AdapterConfig { pool_state_freshness_secs: 5, ..AdapterConfig::default() };
        crate::config::ensure_test_config();
        let store = Arc::new(PersistenceStore::in_memory().unwrap());
        store
            .insert_batch(&[PendingRow::PoolSnapshot {
                snapshot: PoolStateSnapshot {
                    pool_address: "pool1".to_string(),
                    mint: "MintB".to_string(),
                    virtual_sol_reserves: 30_000_000_000,
                    virtual_token_reserves: 1_000_000_000_000_000,
                    real_sol_reserves: 0,
                    real_token_reserves: 0,
                    pool_open: true,
                    slot: 1,
                    timestamp: Utc::now() - chrono::Duration::seconds(60),
                },
                program: Program::BondingCurve,
            }])
            .unwrap();
        let adapter = PoolStateAdapter::new(store, PriceConfig::default(), adapter_config, Arc::new(StaticSolPrice(200.0)));

        assert!(matches!(adapter.quote("MintB").await, Err(AdapterError::Miss)));
    }

    #[tokio::test]
    async fn missing_mint_misses() {
        let adapter = adapter_with_snapshot(PoolStateSnapshot {
            pool_address: "pool1".to_string(),
            mint: "MintC".to_string(),
            virtual_sol_reserves: 1,
            virtual_token_reserves: 1,
            real_sol_reserves: 0,
            real_token_reserves: 0,
            pool_open: true,
            slot: 1,
            timestamp: Utc::now(),
        });

        assert!(matches!(adapter.quote("Unknown").await, Err(AdapterError::Miss)));
    }
}
