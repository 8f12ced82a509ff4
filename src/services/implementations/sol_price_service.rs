use crate::config::AdapterConfig;
use crate::logger::{self, LogTag};
use crate::persistence::PersistenceStore;
use crate::services::{Service, ServiceHealth};
use crate::trade_handler::SharedSolPrice;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Response shape for the SOL/USD spot-price source (§6: "a simple
/// `{solana: {usd: <number>}}` shape").
#[derive(Debug, Deserialize)]
struct SpotPriceResponse {
    solana: SpotPrice,
}

#[derive(Debug, Deserialize)]
struct SpotPrice {
    usd: f64,
}

/// Refreshes the shared SOL/USD rate every `sol_price_refresh_secs`,
/// persisting it to `sol_price_cache` so a restart can seed from the last
/// known value instead of starting cold (§6, ambient to C8).
pub struct SolPriceService {
    config: AdapterConfig,
    store: Arc<PersistenceStore>,
    shared: Arc<SharedSolPrice>,
    client: reqwest::Client,
    healthy: Arc<AtomicBool>,
}

impl SolPriceService {
    pub fn new(config: AdapterConfig, store: Arc<PersistenceStore>, shared: Arc<SharedSolPrice>) -> Self {
        Self { config, store, shared, client: reqwest::Client::new(), healthy: Arc::new(AtomicBool::new(false)) }
    }

    async fn refresh_once(config: &AdapterConfig, client: &reqwest::Client, store: &PersistenceStore, shared: &SharedSolPrice) -> Result<f64, String> {
        let response = client
            .get(&config.sol_usd_api_url)
            .timeout(Duration::from_secs(config.sol_price_timeout_secs))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json::<SpotPriceResponse>()
            .await
            .map_err(|e| e.to_string())?;

        shared.set(response.solana.usd);
        store
            .upsert_sol_price(response.solana.usd, Utc::now())
            .map_err(|e| e.to_string())?;
        Ok(response.solana.usd)
    }
}

#[async_trait]
impl Service for SolPriceService {
    fn name(&self) -> &'static str {
        "sol_price"
    }

    fn priority(&self) -> i32 {
        5
    }

    async fn initialize(&mut self) -> Result<(), String> {
        if let Ok(Some(price)) = self.store.latest_sol_price() {
            self.shared.set(price);
            logger::info(LogTag::Adapter, &format!("seeded SOL/USD from cache: {price}"));
        }
        Ok(())
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let config = self.config.clone();
        let store = self.store.clone();
        let shared = self.shared.clone();
        let client = self.client.clone();
        let healthy = self.healthy.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(config.sol_price_refresh_secs));
            loop {
                tokio::select! {
                    _ = shutdown.notified() => return,
                    _ = ticker.tick() => {
                        match Self::refresh_once(&config, &client, &store, &shared).await {
                            Ok(price) => {
                                healthy.store(true, Ordering::Relaxed);
                                logger::debug(LogTag::Adapter, &format!("refreshed SOL/USD: {price}"));
                            }
                            Err(err) => {
                                healthy.store(false, Ordering::Relaxed);
                                logger::warning(LogTag::Adapter, &format!("SOL/USD refresh failed: {err}"));
                            }
                        }
                    }
                }
            }
        });

        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        if self.healthy.load(Ordering::Relaxed) {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Degraded("sol/usd rate not yet confirmed fresh".to_string())
        }
    }
}
