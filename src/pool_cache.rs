//! In-memory pool state cache (C4).
//!
//! Tracks the latest known reserves per mint, enforcing slot-monotonicity
//! (§4.4: a lower-slot update never overwrites a higher-slot one — streams
//! can reorder within a reconnect window). Also maintains a pool-address to
//! mint index so strategies that only see a bonding-curve/pool account key
//! can still resolve the mint's cached reserves.

use crate::domain::PoolReserves;
use crate::events::{EventBus, PipelineEvent};
use parking_lot::RwLock;
use std::collections::HashMap;

struct Entry {
    pool_address: Option<String>,
    reserves: PoolReserves,
}

pub struct PoolCache {
    by_mint: RwLock<HashMap<String, Entry>>,
    pool_to_mint: RwLock<HashMap<String, String>>,
    events: Option<EventBus>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self { by_mint: RwLock::new(HashMap::new()), pool_to_mint: RwLock::new(HashMap::new()), events: None }
    }

    pub fn with_events(events: EventBus) -> Self {
        Self { by_mint: RwLock::new(HashMap::new()), pool_to_mint: RwLock::new(HashMap::new()), events: Some(events) }
    }

    /// Records an observation. Ignored if `slot` is not newer than the
    /// cached slot for this mint (§4.4 "never overwrite a higher slot with a
    /// lower one"). Returns `true` if the cache was updated.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        mint: &str,
        pool_address: Option<&str>,
        virtual_sol_reserves: u64,
        virtual_token_reserves: u64,
        real_sol_reserves: u64,
        real_token_reserves: u64,
        slot: u64,
    ) -> bool {
        let reserves = PoolReserves { virtual_sol_reserves, virtual_token_reserves, real_sol_reserves, real_token_reserves, slot };

        {
            let guard = self.by_mint.read();
            if let Some(existing) = guard.get(mint) {
                if existing.reserves.slot > slot {
                    return false;
                }
            }
        }

        {
            let mut guard = self.by_mint.write();
            let should_update = guard.get(mint).map(|e| e.reserves.slot <= slot).unwrap_or(true);
            if !should_update {
                return false;
            }
            guard.insert(mint.to_string(), Entry { pool_address: pool_address.map(str::to_string), reserves });
        }

        if let Some(pool) = pool_address {
            self.pool_to_mint.write().insert(pool.to_string(), mint.to_string());
        }

        if let Some(events) = &self.events {
            events.publish(PipelineEvent::PoolStateUpdated {
                mint: mint.to_string(),
                pool_address: pool_address.unwrap_or_default().to_string(),
                reserves,
            });
        }

        true
    }

    pub fn get(&self, mint: &str) -> Option<PoolReserves> {
        self.by_mint.read().get(mint).map(|e| e.reserves)
    }

    pub fn get_by_pool(&self, pool_address: &str) -> Option<PoolReserves> {
        let mint = self.pool_to_mint.read().get(pool_address).cloned()?;
        self.get(&mint)
    }

    pub fn pool_address_for(&self, mint: &str) -> Option<String> {
        self.by_mint.read().get(mint).and_then(|e| e.pool_address.clone())
    }

    pub fn len(&self) -> usize {
        self.by_mint.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PoolCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_slot_overwrites_lower() {
        let cache = PoolCache::new();
        assert!(cache.update("mint1", Some("pool1"), 30_000_000_000, 1_000_000_000_000_000, 0, 0, 100));
        assert!(cache.update("mint1", Some("pool1"), 31_000_000_000, 990_000_000_000_000, 0, 0, 200));
        assert_eq!(cache.get("mint1").unwrap().virtual_sol_reserves, 31_000_000_000);
    }

    #[test]
    fn lower_slot_is_rejected() {
        let cache = PoolCache::new();
        assert!(cache.update("mint1", Some("pool1"), 30_000_000_000, 1_000_000_000_000_000, 0, 0, 200));
        assert!(!cache.update("mint1", Some("pool1"), 99_000_000_000, 1_000_000_000_000, 0, 0, 100));
        assert_eq!(cache.get("mint1").unwrap().virtual_sol_reserves, 30_000_000_000);
    }

    #[test]
    fn resolves_by_pool_address() {
        let cache = PoolCache::new();
        cache.update("mint1", Some("pool1"), 30_000_000_000, 1_000_000_000_000_000, 0, 0, 100);
        assert_eq!(cache.get_by_pool("pool1").unwrap().virtual_sol_reserves, 30_000_000_000);
        assert!(cache.get_by_pool("unknown").is_none());
    }
}
