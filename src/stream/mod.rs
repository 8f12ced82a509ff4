//! Subscription manager (C3): a reconnecting Geyser-style gRPC client that
//! feeds raw transactions into the parser (C2) through a bounded queue
//! (§4.1).

mod backoff;
mod manager;
mod state;
pub mod transport;
mod yellowstone;

pub use backoff::ReconnectBackoff;
pub use manager::SubscriptionManager;
pub use state::StreamState;
pub use transport::{PongSink, RawTransaction, StreamMessage, SubscribeRequest, Subscription, Transport, TransportError};
pub use yellowstone::YellowstoneTransport;
