//! Thin composition-root entry point. Loads configuration, starts logging,
//! wires the nine pipeline components through the `ServiceManager`, and
//! waits for a shutdown signal. Everything non-trivial lives in the
//! library crate; this binary only assembles it (§6 "thin command-line
//! entry points ... out of scope").

use curve_pipeline::config;
use curve_pipeline::events::EventBus;
use curve_pipeline::logger::{self, LogTag};
use curve_pipeline::monitor::PerformanceMonitor;
use curve_pipeline::persistence::{BatchQueue, PersistenceStore};
use curve_pipeline::pool_cache::PoolCache;
use curve_pipeline::services::implementations::{
    IngestionService, MonitorService, PersistenceService, RecoveryService, SolPriceService,
};
use curve_pipeline::services::ServiceManager;
use curve_pipeline::stream::transport::Transport;
use curve_pipeline::stream::YellowstoneTransport;
use curve_pipeline::trade_handler::SharedSolPrice;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    logger::init();

    if let Err(err) = config::load_config() {
        logger::error(LogTag::Config, &format!("fatal configuration error: {err}"));
        return ExitCode::FAILURE;
    }

    let full_config = config::get_config_clone();
    let events = EventBus::new();

    let store = match PersistenceStore::new(&full_config.persistence.db_path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            logger::error(LogTag::Config, &format!("fatal database init error: {err}"));
            return ExitCode::FAILURE;
        }
    };

    let batch_queue = Arc::new(BatchQueue::new(store.clone(), full_config.persistence.clone(), events.clone()));
    let pool_cache = Arc::new(PoolCache::with_events(events.clone()));

    let monitor = Arc::new(PerformanceMonitor::new(full_config.monitor.clone(), store.clone(), events.clone()));
    let recorder = monitor.recorder();
    batch_queue.set_recorder(recorder.clone());

    let seed_price = store.latest_sol_price().ok().flatten().unwrap_or(0.0);
    let sol_price = Arc::new(SharedSolPrice::new(seed_price));

    let transport: Arc<dyn Transport> = Arc::new(YellowstoneTransport::new(
        full_config.stream.grpc_endpoint.clone(),
        full_config.stream.grpc_token.clone(),
    ));

    let mut manager = ServiceManager::new();
    manager.register(Box::new(PersistenceService::new(batch_queue.clone())));
    manager.register(Box::new(SolPriceService::new(full_config.adapter.clone(), store.clone(), sol_price.clone())));
    manager.register(Box::new(IngestionService::new(
        store.clone(),
        batch_queue.clone(),
        pool_cache.clone(),
        sol_price.clone(),
        transport,
        events.clone(),
        recorder.clone(),
    )));
    manager.register(Box::new(RecoveryService::new(store.clone(), batch_queue.clone(), sol_price.clone())));
    manager.register(Box::new(MonitorService::new(monitor)));

    if let Err(err) = manager.start_all().await {
        logger::error(LogTag::System, &format!("fatal service startup error: {err}"));
        return ExitCode::FAILURE;
    }

    logger::info(LogTag::System, "pipeline started; press Ctrl+C to stop");

    if tokio::signal::ctrl_c().await.is_err() {
        logger::error(LogTag::System, "failed to install Ctrl+C handler");
    }

    if let Err(err) = manager.stop_all().await {
        logger::error(LogTag::System, &format!("service shutdown error: {err}"));
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
