mod health;
pub mod implementations;

pub use health::ServiceHealth;

use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// One long-running component the composition root (A5) owns the
/// lifecycle of: a subscription stream, a batch flusher, the stale
/// detector, the performance monitor (§5 "each component owns one or more
/// independent tasks, registered with the composition root").
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower starts earlier, stops later.
    fn priority(&self) -> i32 {
        100
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }

    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self { services: HashMap::new(), handles: HashMap::new(), shutdown: Arc::new(Notify::new()) }
    }

    pub fn register(&mut self, service: Box<dyn Service>) {
        self.services.insert(service.name(), service);
    }

    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Starts every registered service in dependency- then priority-order
    /// (§A5 "starts (priority + dependency ordered)").
    pub async fn start_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "starting all services");

        let names: Vec<&'static str> = self.services.keys().copied().collect();
        let ordered = self.resolve_startup_order(&names)?;

        for name in ordered {
            if let Some(service) = self.services.get_mut(name) {
                service.initialize().await?;
                let handles = service.start(self.shutdown.clone()).await?;
                self.handles.insert(name, handles);
                logger::info(LogTag::System, &format!("service started: {name}"));
            }
        }
        Ok(())
    }

    /// Signals cooperative shutdown and waits for every service's handles to
    /// drain in reverse startup order.
    pub async fn stop_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "stopping all services");
        self.shutdown.notify_waiters();

        let names: Vec<&'static str> = self.handles.keys().copied().collect();
        let mut ordered = self.resolve_startup_order(&names)?;
        ordered.reverse();

        for name in ordered {
            if let Some(service) = self.services.get_mut(name) {
                if let Err(err) = service.stop().await {
                    logger::warning(LogTag::System, &format!("service stop error for {name}: {err}"));
                }
            }
            if let Some(handles) = self.handles.remove(name) {
                for handle in handles {
                    let _ = tokio::time::timeout(tokio::time::Duration::from_secs(15), handle).await;
                }
            }
            logger::info(LogTag::System, &format!("service stopped: {name}"));
        }
        Ok(())
    }

    pub async fn health_report(&self) -> HashMap<&'static str, ServiceHealth> {
        let mut report = HashMap::new();
        for (name, service) in &self.services {
            report.insert(*name, service.health().await);
        }
        report
    }

    fn resolve_startup_order(&self, names: &[&'static str]) -> Result<Vec<&'static str>, String> {
        use std::collections::HashSet;

        fn visit<'a>(
            name: &'static str,
            services: &'a HashMap<&'static str, Box<dyn Service>>,
            ordered: &mut Vec<&'static str>,
            visited: &mut HashSet<&'static str>,
            visiting: &mut HashSet<&'static str>,
        ) -> Result<(), String> {
            if visited.contains(name) {
                return Ok(());
            }
            if visiting.contains(name) {
                return Err(format!("circular service dependency at {name}"));
            }
            visiting.insert(name);
            if let Some(service) = services.get(name) {
                for dep in service.dependencies() {
                    visit(dep, services, ordered, visited, visiting)?;
                }
            }
            visiting.remove(name);
            visited.insert(name);
            ordered.push(name);
            Ok(())
        }

        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();
        for &name in names {
            visit(name, &self.services, &mut ordered, &mut visited, &mut visiting)?;
        }

        ordered.sort_by_key(|name| self.services.get(name).map(|s| s.priority()).unwrap_or(100));
        Ok(ordered)
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}
