use super::backoff::ReconnectBackoff;
use super::state::StreamState;
use super::transport::{StreamMessage, SubscribeRequest, Transport, TransportError};
use crate::config::StreamConfig;
use crate::domain::{DowntimePeriod, Program};
use crate::events::{EventBus, PipelineEvent};
use crate::logger::{self, LogTag};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::transport::RawTransaction;

/// Drives a single Geyser-style subscription covering both the bonding-curve
/// and AMM programs, reconnecting with backoff on failure and tracking
/// downtime for the recovery engine (C7) to consume (§4.1).
pub struct SubscriptionManager {
    transport: Arc<dyn Transport>,
    config: StreamConfig,
    events: EventBus,
    state: Mutex<StreamState>,
    last_slot: AtomicU64,
    downtime_periods: Mutex<Vec<DowntimePeriod>>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn Transport>, config: StreamConfig, events: EventBus) -> Self {
        Self {
            transport,
            config,
            events,
            state: Mutex::new(StreamState::Disconnected),
            last_slot: AtomicU64::new(0),
            downtime_periods: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    pub fn last_slot(&self) -> u64 {
        self.last_slot.load(Ordering::Relaxed)
    }

    /// Drains downtime periods recorded since the last call, so the recovery
    /// engine's startup pass (C7) can reason about persisted staleness.
    pub fn take_downtime_periods(&self) -> Vec<DowntimePeriod> {
        std::mem::take(&mut self.downtime_periods.lock())
    }

    fn set_state(&self, new_state: StreamState) {
        let previous = {
            let mut guard = self.state.lock();
            let previous = *guard;
            *guard = new_state;
            previous
        };
        if previous != new_state {
            self.events.publish(PipelineEvent::StreamStateChanged {
                program: "combined".to_string(),
                state: new_state.to_string(),
            });
        }
    }

    /// Spawns the reconnect-driven ingestion loop, pushing every received
    /// transaction onto `sender`. The loop exits when `shutdown` fires.
    pub fn start(
        self: Arc<Self>,
        sender: tokio::sync::mpsc::Sender<RawTransaction>,
        shutdown: Arc<Notify>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(sender, shutdown).await;
        })
    }

    async fn run(self: Arc<Self>, sender: tokio::sync::mpsc::Sender<RawTransaction>, shutdown: Arc<Notify>) {
        let mut backoff = ReconnectBackoff::new(
            self.config.reconnect_base_ms,
            self.config.reconnect_max_ms,
            self.config.max_failures_before_tip_reset,
            self.config.max_reconnects_per_minute,
        );
        let mut downtime_start: Option<Instant> = None;
        let mut downtime_started_at = Utc::now();

        loop {
            if self.state() == StreamState::Stopped {
                return;
            }

            let now = Instant::now();
            if backoff.rate_limited(now) {
                logger::warning(LogTag::Stream, "reconnect rate limit reached, waiting out the window");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(60)) => {}
                    _ = shutdown.notified() => { self.set_state(StreamState::Stopped); return; }
                }
                continue;
            }

            self.set_state(StreamState::Connecting);
            backoff.record_attempt(Instant::now());

            let from_slot = if backoff.should_reset_to_tip() {
                logger::warning(LogTag::Stream, "too many consecutive failures, resubscribing from tip");
                None
            } else {
                let slot = self.last_slot.load(Ordering::Relaxed);
                if slot == 0 { None } else { Some(slot) }
            };

            let request = SubscribeRequest {
                program_ids: vec![self.config.bonding_curve_program_id.clone(), self.config.amm_program_id.clone()],
                commitment: self.config.commitment.clone(),
                from_slot,
            };

            match self.transport.subscribe(request).await {
                Ok(subscription) => {
                    let mut stream = subscription.stream;
                    let pong = subscription.pong;
                    self.set_state(StreamState::Connected);
                    backoff.record_success();
                    if let Some(start) = downtime_start.take() {
                        self.downtime_periods.lock().push(DowntimePeriod {
                            program: Program::BondingCurve,
                            started_at: downtime_started_at,
                            ended_at: Some(Utc::now()),
                            last_slot_before: Some(self.last_slot.load(Ordering::Relaxed)),
                            reason: "reconnected".to_string(),
                        });
                        let _ = start;
                    }

                    logger::info(LogTag::Stream, "subscription established");

                    loop {
                        let stall = Duration::from_secs(self.config.stall_timeout_secs);
                        let next = tokio::time::timeout(stall, futures::StreamExt::next(&mut stream));

                        tokio::select! {
                            result = next => {
                                match result {
                                    Ok(Some(Ok(StreamMessage::Transaction(tx)))) => {
                                        self.last_slot.store(tx.slot, Ordering::Relaxed);
                                        if sender.send(tx).await.is_err() {
                                            logger::error(LogTag::Stream, "downstream queue closed, stopping");
                                            self.set_state(StreamState::Stopped);
                                            return;
                                        }
                                    }
                                    Ok(Some(Ok(StreamMessage::Ping(id)))) => {
                                        if let Err(err) = pong.send_pong(id).await {
                                            logger::error(LogTag::Stream, &format!("failed to write pong for ping {id}: {err}"));
                                        } else {
                                            logger::verbose(LogTag::Stream, &format!("ping/pong keepalive (id={id})"));
                                        }
                                    }
                                    Ok(Some(Err(err))) => {
                                        logger::error(LogTag::Stream, &format!("stream error: {err}"));
                                        break;
                                    }
                                    Ok(None) => {
                                        logger::warning(LogTag::Stream, "stream ended");
                                        break;
                                    }
                                    Err(_) => {
                                        logger::warning(LogTag::Stream, "stream stalled, reconnecting");
                                        break;
                                    }
                                }
                            }
                            _ = shutdown.notified() => {
                                self.set_state(StreamState::Stopped);
                                return;
                            }
                        }
                    }

                    self.set_state(StreamState::Disconnected);
                    downtime_start = Some(Instant::now());
                    downtime_started_at = Utc::now();
                }
                Err(err) => {
                    self.handle_connect_error(&err);
                    backoff.record_failure();
                    if downtime_start.is_none() {
                        downtime_start = Some(Instant::now());
                        downtime_started_at = Utc::now();
                    }
                }
            }

            let delay = backoff.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.notified() => { self.set_state(StreamState::Stopped); return; }
            }
        }
    }

    fn handle_connect_error(&self, err: &TransportError) {
        self.set_state(StreamState::Error);
        logger::error(LogTag::Stream, &format!("connection failed: {err}"));
    }

    pub fn stop(&self) {
        self.set_state(StreamState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::transport::{PongSink, SubscribeRequest as Req, Subscription};
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex as StdMutex;

    struct NoopPongSink;

    #[async_trait]
    impl PongSink for NoopPongSink {
        async fn send_pong(&self, _id: i32) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Records every id it is asked to pong, so tests can assert the manager
    /// writes exactly one pong per received ping (Property 6).
    #[derive(Default)]
    struct RecordingPongSink {
        sent: StdMutex<Vec<i32>>,
    }

    #[async_trait]
    impl PongSink for RecordingPongSink {
        async fn send_pong(&self, id: i32) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(id);
            Ok(())
        }
    }

    struct AlwaysFailsTransport;

    #[async_trait]
    impl Transport for AlwaysFailsTransport {
        async fn subscribe(&self, _request: Req) -> Result<Subscription, TransportError> {
            Err(TransportError::Connection("refused".to_string()))
        }
    }

    struct OneShotTransport;

    #[async_trait]
    impl Transport for OneShotTransport {
        async fn subscribe(&self, _request: Req) -> Result<Subscription, TransportError> {
            let tx = RawTransaction {
                signature: "sig".to_string(),
                slot: 42,
                block_time: Utc::now(),
                accounts: vec![],
                program_ids: vec![],
                logs: vec![],
                instruction_data: None,
            };
            Ok(Subscription {
                stream: Box::pin(stream::iter(vec![Ok(StreamMessage::Transaction(tx))])),
                pong: Arc::new(NoopPongSink),
            })
        }
    }

    /// Yields a single ping with id 42 (§8 Scenario 2) and records whatever
    /// the manager sends back through `pong`.
    struct PingTransport {
        pong: Arc<RecordingPongSink>,
    }

    #[async_trait]
    impl Transport for PingTransport {
        async fn subscribe(&self, _request: Req) -> Result<Subscription, TransportError> {
            Ok(Subscription {
                stream: Box::pin(stream::iter(vec![Ok(StreamMessage::Ping(42))])),
                pong: self.pong.clone(),
            })
        }
    }

    #[tokio::test]
    async fn manager_reports_error_state_on_connect_failure() {
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(AlwaysFailsTransport),
            StreamConfig { reconnect_base_ms: 1, reconnect_max_ms: 2, max_reconnects_per_minute: 1, ..Default::default() },
            EventBus::new(),
        ));
        let (sender, _receiver) = tokio::sync::mpsc::channel(8);
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();
        let handle = manager.clone().start(sender, shutdown);
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_clone.notify_waiters();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert_eq!(manager.state(), StreamState::Stopped);
    }

    #[tokio::test]
    async fn manager_forwards_transactions_and_tracks_slot() {
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(OneShotTransport),
            StreamConfig::default(),
            EventBus::new(),
        ));
        let (sender, mut receiver) = tokio::sync::mpsc::channel(8);
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();
        let handle = manager.clone().start(sender, shutdown);

        let received = tokio::time::timeout(Duration::from_secs(1), receiver.recv()).await.unwrap().unwrap();
        assert_eq!(received.slot, 42);
        assert_eq!(manager.last_slot(), 42);

        shutdown_clone.notify_waiters();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    // Property 6 / Scenario 2: a received ping with id X gets exactly one
    // pong with id X written back on the same stream.
    #[tokio::test]
    async fn manager_replies_to_ping_with_matching_pong() {
        let pong = Arc::new(RecordingPongSink::default());
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(PingTransport { pong: pong.clone() }),
            StreamConfig::default(),
            EventBus::new(),
        ));
        let (sender, _receiver) = tokio::sync::mpsc::channel(8);
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();
        let handle = manager.clone().start(sender, shutdown);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_clone.notify_waiters();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

        assert_eq!(*pong.sent.lock().unwrap(), vec![42]);
    }
}
