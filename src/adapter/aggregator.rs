use super::{AdapterError, AdapterQuote, PriceAdapter};
use crate::config::AdapterConfig;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct AggregatorResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
struct Pair {
    #[serde(rename = "pairAddress")]
    pair_address: String,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    #[serde(rename = "priceNative")]
    price_native: Option<String>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}

/// Queries a token-pair aggregator HTTP API and picks the highest-liquidity
/// pair (§4.8 adapter 2). Enforces an in-process sliding-window rate limit
/// and honours 429s by recording a deferral window rather than retrying
/// immediately.
pub struct AggregatorAdapter {
    client: reqwest::Client,
    config: AdapterConfig,
    requests: Mutex<VecDeque<Instant>>,
    rate_limited_until: Mutex<Option<Instant>>,
    cache: Mutex<HashMap<String, (Instant, AdapterQuote)>>,
}

impl AggregatorAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            requests: Mutex::new(VecDeque::new()),
            rate_limited_until: Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, mint: &str) -> Option<AdapterQuote> {
        let cache = self.cache.lock();
        let (cached_at, quote) = cache.get(mint)?;
        if cached_at.elapsed() <= Duration::from_secs(self.config.aggregator_cache_ttl_secs) {
            Some(quote.clone())
        } else {
            None
        }
    }

    fn currently_rate_limited(&self) -> Option<Duration> {
        let until = *self.rate_limited_until.lock();
        until.and_then(|deadline| {
            let now = Instant::now();
            if now >= deadline { None } else { Some(deadline - now) }
        })
    }

    /// Slides the request window; returns `Err` with the wait needed if the
    /// queue of recent requests is already at capacity and the caller
    /// should back off rather than block indefinitely (§4.8 "requests
    /// exceeding the window await the oldest-timestamp expiry").
    fn admit_request(&self) -> Result<(), Duration> {
        let window = Duration::from_millis(self.config.rate_limit_window_ms);
        let mut requests = self.requests.lock();
        let now = Instant::now();
        while let Some(&front) = requests.front() {
            if now.duration_since(front) <= window {
                break;
            }
            requests.pop_front();
        }

        if requests.len() as u32 >= self.config.max_requests_per_window {
            let oldest = *requests.front().expect("len >= 1 implies a front element");
            return Err(window.saturating_sub(now.duration_since(oldest)));
        }

        if requests.len() >= self.config.max_queued_requests {
            return Err(window);
        }

        requests.push_back(now);
        Ok(())
    }
}

#[async_trait]
impl PriceAdapter for AggregatorAdapter {
    fn name(&self) -> &'static str {
        "aggregator"
    }

    async fn quote(&self, mint: &str) -> Result<AdapterQuote, AdapterError> {
        if let Some(quote) = self.cached(mint) {
            return Ok(quote);
        }
        if let Some(wait) = self.currently_rate_limited() {
            return Err(AdapterError::RateLimited(wait));
        }
        if let Err(wait) = self.admit_request() {
            return Err(AdapterError::RateLimited(wait));
        }

        let url = format!("{}/tokens/{mint}", self.config.aggregator_base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.aggregator_timeout_secs))
            .send()
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        if response.status().as_u16() == 429 {
            let retry_after = Duration::from_millis(self.config.rate_limit_window_ms);
            *self.rate_limited_until.lock() = Some(Instant::now() + retry_after);
            logger::warning(LogTag::Adapter, "aggregator returned 429, deferring requests");
            return Err(AdapterError::RateLimited(retry_after));
        }
        if !response.status().is_success() {
            return Err(AdapterError::Request(format!("HTTP {}", response.status())));
        }

        let parsed: AggregatorResponse =
            response.json().await.map_err(|e| AdapterError::Request(e.to_string()))?;
        let pairs = parsed.pairs.unwrap_or_default();
        let best = pairs
            .into_iter()
            .filter_map(|p| {
                let liquidity_usd = p.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
                let price_usd: f64 = p.price_usd.as_deref()?.parse().ok()?;
                Some((liquidity_usd, price_usd, p))
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let Some((liquidity_usd, price_usd, pair)) = best else {
            return Err(AdapterError::Miss);
        };
        let price_native: f64 = pair.price_native.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let market_cap_usd = pair.market_cap.or(pair.fdv).unwrap_or(0.0);

        let quote = AdapterQuote {
            price_sol: price_native,
            price_usd,
            market_cap_usd,
            source_tag: "aggregator",
            metadata: json!({ "pair_address": pair.pair_address, "liquidity_usd": liquidity_usd }),
        };
        self.cache.lock().insert(mint.to_string(), (Instant::now(), quote.clone()));
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_window_capacity() {
        let config = AdapterConfig { max_requests_per_window: 2, rate_limit_window_ms: 60_000, ..AdapterConfig::default() };
        let adapter = AggregatorAdapter::new(config);

        assert!(adapter.admit_request().is_ok());
        assert!(adapter.admit_request().is_ok());
        assert!(adapter.admit_request().is_err());
    }

    #[test]
    fn rate_limited_until_expires() {
        let adapter = AggregatorAdapter::new(AdapterConfig::default());
        assert!(adapter.currently_rate_limited().is_none());

        *adapter.rate_limited_until.lock() = Some(Instant::now() + Duration::from_millis(50));
        assert!(adapter.currently_rate_limited().is_some());

        *adapter.rate_limited_until.lock() = Some(Instant::now() - Duration::from_millis(1));
        assert!(adapter.currently_rate_limited().is_none());
    }
}
