//! Process-wide observability event bus.
//!
//! Every component publishes onto a single [`tokio::sync::broadcast`] channel
//! instead of mixing callbacks, promises and ad-hoc emitters (§9 design
//! note: "use a single concurrency primitive per task boundary"). The
//! performance monitor (C9) gets its latency/lag/queue-depth samples
//! directly from a shared `MetricsRecorder` handle rather than this bus;
//! `subscribe()` exists for alerting, tests and debug tooling that want a
//! read-only tap on pipeline activity.

use crate::domain::{PoolReserves, Trade};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 4096;

/// A single observability event. Deliberately flat (no nested enums beyond
/// payload structs) so `PipelineEvent::kind()` stays a simple match.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    ParserSuccess { strategy: &'static str, signature: String },
    ParserFailed { signature: String, reason: String },
    PoolStateUpdated { mint: String, pool_address: String, reserves: PoolReserves },
    TradeProcessed { trade: Box<Trade> },
    BatchFlushed { kind: String, rows: usize },
    BatchFailed { kind: String, reason: String },
    StreamStateChanged { program: String, state: String },
    RecoveryBatchCompleted { batch_id: String, recovered: u32, failed: u32 },
    AlertRaised { metric: String, severity: String, value: f64 },
    AlertResolved { metric: String },
}

impl PipelineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::ParserSuccess { .. } => "parser:success",
            PipelineEvent::ParserFailed { .. } => "parser:failed",
            PipelineEvent::PoolStateUpdated { .. } => "pool:state_updated",
            PipelineEvent::TradeProcessed { .. } => "trade:processed",
            PipelineEvent::BatchFlushed { .. } => "persistence:batch_flushed",
            PipelineEvent::BatchFailed { .. } => "persistence:batch_failed",
            PipelineEvent::StreamStateChanged { .. } => "stream:state_changed",
            PipelineEvent::RecoveryBatchCompleted { .. } => "recovery:batch_completed",
            PipelineEvent::AlertRaised { .. } => "monitor:alert_raised",
            PipelineEvent::AlertResolved { .. } => "monitor:alert_resolved",
        }
    }
}

/// A timestamped envelope, since the broadcast channel itself carries no
/// ordering metadata beyond arrival order.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: PipelineEvent,
    pub emitted_at: DateTime<Utc>,
}

/// Thin wrapper around a broadcast sender. Cloning an [`EventBus`] is cheap
/// and shares the same underlying channel (it is the composition root's job
/// to construct one and hand clones to every component).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes an event. Errors (no subscribers) are swallowed: the bus is
    /// fire-and-forget observability, not a delivery-guaranteed queue.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(Envelope { event, emitted_at: Utc::now() });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
