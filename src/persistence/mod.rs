//! Batching persistence (C6): a sqlite-backed store plus a timer-driven
//! batch queue in front of it (§4.6).

mod batch;
mod queue;
mod schema;
mod store;

pub use batch::BatchQueue;
pub use queue::{PendingBatch, PendingRow};
pub use store::PersistenceStore;
