use crate::persistence::BatchQueue;
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Wraps the batching persistence flusher (C6) as a composition-root
/// service so its lifecycle is registered alongside everything else that
/// reads from it (§2 A5: "owns the lifecycle of ... the batch flusher task
/// in C6").
pub struct PersistenceService {
    batch_queue: Arc<BatchQueue>,
}

impl PersistenceService {
    pub fn new(batch_queue: Arc<BatchQueue>) -> Self {
        Self { batch_queue }
    }
}

#[async_trait]
impl Service for PersistenceService {
    fn name(&self) -> &'static str {
        "persistence"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        Ok(vec![self.batch_queue.clone().start(shutdown)])
    }

    async fn health(&self) -> ServiceHealth {
        if self.batch_queue.dropped_total() > 0 {
            ServiceHealth::Degraded(format!("{} batches dropped", self.batch_queue.dropped_total()))
        } else {
            ServiceHealth::Healthy
        }
    }
}
