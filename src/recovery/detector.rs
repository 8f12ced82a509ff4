use super::priority;
use super::queue::RecoveryQueue;
use crate::adapter::FallbackAdapterChain;
use crate::config::RecoveryConfig;
use crate::domain::{BatchStatus, RecoveryBatchLog, RecoveryProgress, RecoveryQueueItem};
use crate::logger::{self, LogTag};
use crate::persistence::{BatchQueue, PendingRow, PersistenceStore};
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Stale detector and recovery queue (C7). Periodically scans for tokens
/// whose price hasn't been refreshed in a while, prioritizes them, and
/// drains the resulting queue through a bounded worker pool that calls the
/// external price adapter chain (C8) and writes results back through the
/// batch queue (C6).
pub struct StaleDetector {
    config: RecoveryConfig,
    store: Arc<PersistenceStore>,
    batch_queue: Arc<BatchQueue>,
    queue: Arc<RecoveryQueue>,
    adapters: Arc<FallbackAdapterChain>,
    tokens_recovered: AtomicU32,
    tokens_failed: AtomicU32,
    external_queries: AtomicU32,
}

impl StaleDetector {
    pub fn new(
        config: RecoveryConfig,
        store: Arc<PersistenceStore>,
        batch_queue: Arc<BatchQueue>,
        adapters: Arc<FallbackAdapterChain>,
    ) -> Self {
        Self {
            config,
            store,
            batch_queue,
            queue: Arc::new(RecoveryQueue::new()),
            adapters,
            tokens_recovered: AtomicU32::new(0),
            tokens_failed: AtomicU32::new(0),
            external_queries: AtomicU32::new(0),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Spawns the scan timer and the bounded worker pool; returns once the
    /// shutdown signal fires and in-flight workers have drained (up to
    /// `shutdown_drain_deadline_secs`) (§4.7 "Cancellation").
    pub fn start(self: Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.maybe_run_startup_recovery().await;

            let mut workers = Vec::with_capacity(self.config.max_concurrent_recoveries);
            for _ in 0..self.config.max_concurrent_recoveries {
                let detector = self.clone();
                let worker_shutdown = shutdown.clone();
                workers.push(tokio::spawn(async move { detector.worker_loop(worker_shutdown).await }));
            }

            let mut scan_ticker =
                tokio::time::interval(Duration::from_secs(self.config.scan_interval_minutes as u64 * 60));
            scan_ticker.tick().await; // first tick fires immediately; scan once up-front

            loop {
                tokio::select! {
                    _ = scan_ticker.tick() => {
                        self.scan_once().await;
                    }
                    _ = shutdown.notified() => {
                        let deadline = Duration::from_secs(self.config.shutdown_drain_deadline_secs);
                        if tokio::time::timeout(deadline, futures::future::join_all(workers)).await.is_err() {
                            logger::warning(LogTag::Recovery, "recovery workers did not drain before shutdown deadline");
                        }
                        return;
                    }
                }
            }
        })
    }

    async fn maybe_run_startup_recovery(&self) {
        if !self.config.enable_startup_recovery {
            return;
        }

        let gap_minutes = match self.store.latest_recovery_batch() {
            Ok(Some(last)) => Utc::now().signed_duration_since(last.started_at).num_minutes(),
            Ok(None) => i64::MAX,
            Err(err) => {
                logger::error(LogTag::Recovery, &format!("failed to read last recovery batch: {err}"));
                return;
            }
        };

        if gap_minutes < self.config.startup_recovery_threshold_minutes {
            return;
        }

        let tokens = match self.store.tokens_by_mcap_desc(self.config.startup_recovery_mcap_floor) {
            Ok(tokens) => tokens,
            Err(err) => {
                logger::error(LogTag::Recovery, &format!("startup recovery scan failed: {err}"));
                return;
            }
        };

        let started_at = Utc::now();
        let checked = tokens.len() as u32;
        for token in tokens {
            self.queue.enqueue(token.mint, 100);
        }

        logger::info(LogTag::Recovery, &format!("startup recovery enqueued {checked} tokens"));

        let log = RecoveryBatchLog {
            batch_id: format!("startup-{}", started_at.timestamp_millis()),
            started_at,
            ended_at: Some(Utc::now()),
            tokens_checked: checked,
            tokens_recovered: 0,
            tokens_failed: 0,
            external_queries: 0,
            duration_ms: 0,
            status: BatchStatus::Completed,
        };
        if let Err(err) = self.store.upsert_recovery_batch(&log) {
            logger::error(LogTag::Recovery, &format!("failed to persist startup recovery batch log: {err}"));
        }
    }

    /// One scan pass: finds stale candidates, scores and enqueues them, and
    /// records the run (§4.7 "Scan").
    async fn scan_once(&self) {
        let started_at = Utc::now();
        let cutoff = started_at - chrono::Duration::minutes(self.config.stale_threshold_minutes);

        let candidates = match self.store.stale_candidates(self.config.mcap_tier_low, cutoff) {
            Ok(candidates) => candidates,
            Err(err) => {
                logger::error(LogTag::Recovery, &format!("stale scan query failed: {err}"));
                return;
            }
        };

        let scanned = candidates.len() as u32;
        let mut marked_stale = 0u32;

        for token in candidates.into_iter().take(self.config.batch_size) {
            let stale_minutes = token
                .last_price_update_time
                .map(|t| started_at.signed_duration_since(t).num_minutes())
                .unwrap_or(self.config.critical_stale_minutes + 1);
            let score = priority::score(token.latest_market_cap_usd, stale_minutes, &self.config);

            if self.queue.enqueue(token.mint.clone(), score) {
                marked_stale += 1;
                if let Err(err) = self.store.set_stale_flag(&token.mint, true) {
                    logger::error(LogTag::Recovery, &format!("failed to set stale flag for {}: {err}", token.mint));
                }
            }
        }

        if let Err(err) = self.store.record_stale_detection_run(started_at, Utc::now(), scanned, marked_stale) {
            logger::error(LogTag::Recovery, &format!("failed to persist stale detection run: {err}"));
        }
    }

    async fn worker_loop(self: Arc<Self>, shutdown: Arc<Notify>) {
        loop {
            if let Some(item) = self.queue.take() {
                self.recover_one(item).await;
                continue;
            }

            tokio::select! {
                _ = shutdown.notified() => return,
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }
    }

    async fn recover_one(&self, item: RecoveryQueueItem) {
        self.external_queries.fetch_add(1, Ordering::Relaxed);

        let previous_failures = match self.store.recovery_progress_by_mint(&item.mint) {
            Ok(Some(progress)) => progress.consecutive_failures,
            Ok(None) => 0,
            Err(err) => {
                logger::error(LogTag::Recovery, &format!("recovery progress lookup failed for {}: {err}", item.mint));
                0
            }
        };

        match self.adapters.quote(&item.mint).await {
            Ok(quote) => {
                self.queue.complete(&item.mint);
                self.tokens_recovered.fetch_add(1, Ordering::Relaxed);

                let now = Utc::now();
                if let Err(err) = self.store.upsert_recovery_progress(&RecoveryProgress {
                    mint: item.mint.clone(),
                    last_attempt_at: now,
                    last_success_at: Some(now),
                    consecutive_failures: 0,
                    last_source: Some(quote.source_tag.to_string()),
                }) {
                    logger::error(LogTag::Recovery, &format!("failed to record recovery progress for {}: {err}", item.mint));
                }

                match self.store.token_by_mint(&item.mint) {
                    Ok(Some(mut token)) => {
                        token.latest_price_sol = quote.price_sol;
                        token.latest_price_usd = quote.price_usd;
                        token.latest_market_cap_usd = quote.market_cap_usd;
                        token.last_price_update_time = Some(now);
                        token.price_source = Some(quote.source_tag.to_string());
                        token.is_stale = false;
                        self.batch_queue.enqueue(PendingRow::TokenUpsert(token));
                    }
                    Ok(None) => {}
                    Err(err) => logger::error(LogTag::Recovery, &format!("token lookup failed for {}: {err}", item.mint)),
                }
            }
            Err(err) => {
                logger::warning(LogTag::Recovery, &format!("recovery failed for {}: {err}", item.mint));

                if let Err(store_err) = self.store.upsert_recovery_progress(&RecoveryProgress {
                    mint: item.mint.clone(),
                    last_attempt_at: Utc::now(),
                    last_success_at: None,
                    consecutive_failures: previous_failures + 1,
                    last_source: None,
                }) {
                    logger::error(
                        LogTag::Recovery,
                        &format!("failed to record recovery progress for {}: {store_err}", item.mint),
                    );
                }

                if !self.queue.requeue_or_drop(item.clone(), self.config.max_retries) {
                    self.tokens_failed.fetch_add(1, Ordering::Relaxed);
                    logger::warning(LogTag::Recovery, &format!("dropping {} after max retries", item.mint));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{PoolStateAdapter, PriceAdapter};
    use crate::config::{AdapterConfig, PriceConfig};
    use crate::domain::{Program, Token};
    use crate::events::EventBus;
    use crate::persistence::PersistenceStore;
    use crate::trade_handler::StaticSolPrice;

    fn detector() -> StaleDetector {
        crate::config::ensure_test_config();
        let store = Arc::new(PersistenceStore::in_memory().unwrap());
        let batch_queue = Arc::new(BatchQueue::new(store.clone(), crate::config::PersistenceConfig::default(), EventBus::new()));
        let pool_state = Arc::new(PoolStateAdapter::new(
            store.clone(),
            PriceConfig::default(),
            AdapterConfig::default(),
            Arc::new(StaticSolPrice(200.0)),
        ));
        let chain = Arc::new(FallbackAdapterChain::new(vec![pool_state as Arc<dyn PriceAdapter>]));
        StaleDetector::new(RecoveryConfig::default(), store, batch_queue, chain)
    }

    #[tokio::test]
    async fn scan_enqueues_stale_tokens_above_floor() {
        let detector = detector();
        let mut token = Token::placeholder("Mint1", Program::BondingCurve, 1);
        token.latest_market_cap_usd = 60_000.0;
        token.last_price_update_time = None;
        detector.store.insert_batch(&[PendingRow::TokenUpsert(token)]).unwrap();

        detector.scan_once().await;
        assert_eq!(detector.queue_len(), 1);
    }

    #[tokio::test]
    async fn scan_skips_tokens_below_floor() {
        let detector = detector();
        let mut token = Token::placeholder("Mint2", Program::BondingCurve, 1);
        token.latest_market_cap_usd = 100.0;
        detector.store.insert_batch(&[PendingRow::TokenUpsert(token)]).unwrap();

        detector.scan_once().await;
        assert_eq!(detector.queue_len(), 0);
    }

    #[tokio::test]
    async fn worker_recovers_queued_item_via_adapter_chain() {
        let detector = detector();
        let mut token = Token::placeholder("Mint3", Program::BondingCurve, 1);
        token.latest_market_cap_usd = 60_000.0;
        detector.store.insert_batch(&[PendingRow::TokenUpsert(token)]).unwrap();

        let snapshot = crate::domain::PoolStateSnapshot {
            pool_address: "pool1".to_string(),
            mint: "Mint3".to_string(),
            virtual_sol_reserves: 30_000_000_000,
            virtual_token_reserves: 1_000_000_000_000_000,
            real_sol_reserves: 0,
            real_token_reserves: 0,
            pool_open: true,
            slot: 1,
            timestamp: Utc::now(),
        };
        detector
            .store
            .insert_batch(&[PendingRow::PoolSnapshot { snapshot, program: Program::BondingCurve }])
            .unwrap();

        assert!(detector.queue.enqueue("Mint3".to_string(), 90));
        let item = detector.queue.take().unwrap();
        detector.recover_one(item).await;

        assert_eq!(detector.tokens_recovered.load(Ordering::Relaxed), 1);
        assert!(detector.batch_queue.pending_len() >= 1);

        let progress = detector.store.recovery_progress_by_mint("Mint3").unwrap().unwrap();
        assert_eq!(progress.consecutive_failures, 0);
        assert_eq!(progress.last_source.as_deref(), Some("pool_state"));
        assert!(progress.last_success_at.is_some());
    }

    #[tokio::test]
    async fn failed_recovery_increments_per_mint_progress() {
        let detector = detector();
        let item = RecoveryQueueItem::new("MintMissing".to_string(), 80);

        detector.recover_one(item.clone()).await;
        detector.recover_one(item).await;

        let progress = detector.store.recovery_progress_by_mint("MintMissing").unwrap().unwrap();
        assert_eq!(progress.consecutive_failures, 2);
        assert!(progress.last_success_at.is_none());
    }
}
