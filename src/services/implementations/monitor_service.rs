use crate::monitor::PerformanceMonitor;
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Wraps the performance monitor (C9) as a composition-root service. Takes
/// an already-constructed `PerformanceMonitor` (rather than building one
/// internally) so the composition root can hand its `MetricsRecorder` to
/// the ingestion and persistence services before this one starts (§4.9).
pub struct MonitorService {
    monitor: Arc<PerformanceMonitor>,
}

impl MonitorService {
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl Service for MonitorService {
    fn name(&self) -> &'static str {
        "monitor"
    }

    fn priority(&self) -> i32 {
        90
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        Ok(vec![self.monitor.clone().start(shutdown)])
    }

    async fn health(&self) -> ServiceHealth {
        let score = self.monitor.health_score();
        if score >= 80 {
            ServiceHealth::Healthy
        } else if score >= 50 {
            ServiceHealth::Degraded(format!("health score {score}"))
        } else {
            ServiceHealth::Unhealthy(format!("health score {score}"))
        }
    }
}
