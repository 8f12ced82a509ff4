use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A raw transaction delivered by the transport, already flattened into the
/// fields the parser (C2) needs. The transport is responsible for filtering
/// out vote and failed transactions before it ever reaches this type
/// (§4.1 "vote and failed transactions are excluded at subscription time").
#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
    pub accounts: Vec<String>,
    pub program_ids: Vec<String>,
    pub logs: Vec<String>,
    pub instruction_data: Option<Vec<u8>>,
}

/// One update out of the transport's subscription stream (§4.1).
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Transaction(RawTransaction),
    /// A keepalive ping carrying the id the manager must echo back in a pong
    /// on the same stream (§6 "The client must reply to pings with
    /// `{pong: {id}}`").
    Ping(i32),
}

/// Writes pongs back on the same bidirectional stream a [`Transport::subscribe`]
/// call opened. Kept separate from `Transport` (rather than a method taking
/// `&self`) so the manager can hold one sink per live subscription without
/// re-resolving which stream it belongs to; implementations must serialise
/// concurrent writes internally (§4.3 "ping/pong writes are serialised per
/// stream").
#[async_trait]
pub trait PongSink: Send + Sync {
    async fn send_pong(&self, id: i32) -> Result<(), TransportError>;
}

/// A subscription's inbound stream paired with the sink used to answer pings
/// on it.
pub struct Subscription {
    pub stream: TransportStream,
    pub pong: std::sync::Arc<dyn PongSink>,
}

/// Abstracts the Geyser-style gRPC transport so the reconnect/backoff state
/// machine in [`super::manager::SubscriptionManager`] can be tested without a
/// live endpoint. [`super::yellowstone::YellowstoneTransport`] is the
/// production implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the subscription and returns its stream plus a pong sink.
    /// Returning an error here (or the returned stream ending) triggers the
    /// manager's reconnect logic.
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription, TransportError>;
}

/// What to subscribe to: the two program ids, filtered to non-vote,
/// non-failed transactions at the requested commitment level (§4.1).
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub program_ids: Vec<String>,
    pub commitment: String,
    /// Slot to resume from, if the manager is recovering from a disconnect
    /// rather than starting cold.
    pub from_slot: Option<u64>,
}

pub type TransportStream = std::pin::Pin<Box<dyn futures::Stream<Item = Result<StreamMessage, TransportError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport connection failed: {0}")]
    Connection(String),
    #[error("transport stream ended unexpectedly")]
    StreamEnded,
    #[error("transport stalled: no message in the configured window")]
    Stalled,
}
