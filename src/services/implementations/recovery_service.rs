use crate::adapter::{AggregatorAdapter, FallbackAdapterChain, PoolStateAdapter, PriceAdapter, RpcAdapter};
use crate::config;
use crate::logger::{self, LogTag};
use crate::persistence::{BatchQueue, PersistenceStore};
use crate::recovery::StaleDetector;
use crate::services::{Service, ServiceHealth};
use crate::trade_handler::SolPriceSource;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Wraps the stale detector / recovery queue (C7) as a composition-root
/// service, assembling the fallback adapter chain (C8) it depends on
/// (§4.7, §4.8).
pub struct RecoveryService {
    detector: Arc<StaleDetector>,
}

impl RecoveryService {
    pub fn new(store: Arc<PersistenceStore>, batch_queue: Arc<BatchQueue>, sol_price: Arc<dyn SolPriceSource>) -> Self {
        let full_config = config::get_config_clone();

        let pool_state_adapter: Arc<dyn PriceAdapter> = Arc::new(PoolStateAdapter::new(
            store.clone(),
            full_config.price.clone(),
            full_config.adapter.clone(),
            sol_price.clone(),
        ));
        let aggregator_adapter: Arc<dyn PriceAdapter> = Arc::new(AggregatorAdapter::new(full_config.adapter.clone()));
        let rpc_adapter_result = RpcAdapter::new(
            full_config.adapter.clone(),
            full_config.stream.clone(),
            full_config.price.clone(),
            sol_price,
        );

        let mut chain_adapters = vec![pool_state_adapter, aggregator_adapter];
        match rpc_adapter_result {
            Ok(rpc_adapter) => chain_adapters.push(Arc::new(rpc_adapter) as Arc<dyn PriceAdapter>),
            Err(err) => logger::warning(LogTag::Adapter, &format!("rpc adapter disabled: {err}")),
        }

        let chain = Arc::new(FallbackAdapterChain::new(chain_adapters));
        let detector = Arc::new(StaleDetector::new(full_config.recovery, store, batch_queue, chain));

        Self { detector }
    }
}

#[async_trait]
impl Service for RecoveryService {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["ingestion"]
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        Ok(vec![self.detector.clone().start(shutdown)])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
