use crate::config;
use crate::logger::{self, LogTag};
use crate::monitor::MetricsRecorder;
use crate::parser::{strategies, EventParser, ParseContext};
use crate::persistence::{BatchQueue, PersistenceStore};
use crate::pool_cache::PoolCache;
use crate::services::{Service, ServiceHealth};
use crate::stream::transport::RawTransaction;
use crate::stream::SubscriptionManager;
use crate::trade_handler::{SolPriceSource, TradeHandler};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

fn to_context(raw: RawTransaction) -> ParseContext {
    ParseContext {
        signature: raw.signature,
        slot: raw.slot,
        block_time: raw.block_time,
        accounts: raw.accounts,
        program_ids: raw.program_ids,
        logs: raw.logs,
        instruction_data: raw.instruction_data,
        raw_transaction: None,
    }
}

/// Owns the stream-to-persistence pipeline: the subscription manager (C3)
/// delivers raw transactions over an mpsc channel, and this service's
/// consumer loop parses (C2) and hands each event to the trade handler
/// (C5) synchronously, as the scheduling model requires (§5 "short-lived
/// work ... runs synchronously within the task that receives the raw
/// data").
pub struct IngestionService {
    manager: Arc<SubscriptionManager>,
    parser: Arc<EventParser>,
    trade_handler: Arc<TradeHandler>,
    store: Arc<PersistenceStore>,
    recorder: Arc<MetricsRecorder>,
}

impl IngestionService {
    pub fn new(
        store: Arc<PersistenceStore>,
        batch_queue: Arc<BatchQueue>,
        pool_cache: Arc<PoolCache>,
        sol_price: Arc<dyn SolPriceSource>,
        transport: Arc<dyn crate::stream::transport::Transport>,
        events: crate::events::EventBus,
        recorder: Arc<MetricsRecorder>,
    ) -> Self {
        let full_config = config::get_config_clone();
        let stream_config = full_config.stream.clone();
        let price_config = full_config.price.clone();
        let persistence_config = full_config.persistence.clone();

        let manager = Arc::new(SubscriptionManager::new(transport, stream_config, events.clone()));
        let strategy_set = strategies::default_strategies(&full_config, pool_cache.clone());
        let parser = Arc::new(EventParser::new(strategy_set, events.clone()));
        let trade_handler = Arc::new(TradeHandler::new(
            price_config,
            persistence_config,
            pool_cache,
            store.clone(),
            batch_queue,
            sol_price,
            events,
        ));

        Self { manager, parser, trade_handler, store, recorder }
    }
}

#[async_trait]
impl Service for IngestionService {
    fn name(&self) -> &'static str {
        "ingestion"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["persistence"]
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<RawTransaction>(1024);
        let stream_handle = self.manager.clone().start(tx, shutdown.clone());

        let parser = self.parser.clone();
        let trade_handler = self.trade_handler.clone();
        let recorder = self.recorder.clone();
        let consumer_shutdown = shutdown.clone();
        let consumer_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = consumer_shutdown.notified() => return,
                    raw = rx.recv() => {
                        let Some(raw) = raw else { return };
                        let signature = raw.signature.clone();
                        let block_time = raw.block_time;
                        recorder.record_stream_lag_ms((Utc::now() - block_time).num_milliseconds().max(0) as f64);

                        let ctx = to_context(raw);
                        let started = std::time::Instant::now();
                        let parsed = parser.parse(&ctx).await;

                        match parsed {
                            Some(event) => {
                                recorder.record_parse_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
                                trade_handler.handle(event).await;
                            }
                            None => {
                                recorder.record_parse_failure();
                                logger::debug(LogTag::Parser, &format!("no strategy matched {signature}"));
                            }
                        }
                    }
                }
            }
        });

        let store = self.store.clone();
        let manager = self.manager.clone();
        let downtime_shutdown = shutdown.clone();
        let downtime_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = downtime_shutdown.notified() => {
                        for period in manager.take_downtime_periods() {
                            if let Err(err) = store.insert_downtime_period(&period) {
                                logger::error(LogTag::Persistence, &format!("failed to persist downtime period: {err}"));
                            }
                        }
                        return;
                    }
                    _ = ticker.tick() => {
                        for period in manager.take_downtime_periods() {
                            if let Err(err) = store.insert_downtime_period(&period) {
                                logger::error(LogTag::Persistence, &format!("failed to persist downtime period: {err}"));
                            }
                        }
                    }
                }
            }
        });

        Ok(vec![stream_handle, consumer_handle, downtime_handle])
    }

    async fn health(&self) -> ServiceHealth {
        match self.manager.state() {
            crate::stream::StreamState::Connected => ServiceHealth::Healthy,
            crate::stream::StreamState::Stopped => ServiceHealth::Stopping,
            _ => ServiceHealth::Degraded("reconnecting".to_string()),
        }
    }
}
