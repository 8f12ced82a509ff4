use super::{AdapterError, AdapterQuote, PriceAdapter};
use crate::logger::{self, LogTag};
use std::sync::Arc;

/// Tries each adapter in order, stopping at the first success (§4.8 "Three
/// adapters in fallback order").
pub struct FallbackAdapterChain {
    adapters: Vec<Arc<dyn PriceAdapter>>,
}

impl FallbackAdapterChain {
    pub fn new(adapters: Vec<Arc<dyn PriceAdapter>>) -> Self {
        Self { adapters }
    }

    pub async fn quote(&self, mint: &str) -> Result<AdapterQuote, AdapterError> {
        let mut last_err = AdapterError::Miss;
        for adapter in &self.adapters {
            match adapter.quote(mint).await {
                Ok(quote) => return Ok(quote),
                Err(err) => {
                    logger::debug(
                        LogTag::Adapter,
                        &format!("{} missed for {mint}: {err}", adapter.name()),
                    );
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubAdapter {
        name: &'static str,
        result: Result<f64, AdapterError>,
    }

    #[async_trait::async_trait]
    impl PriceAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn quote(&self, _mint: &str) -> Result<AdapterQuote, AdapterError> {
            self.result.clone().map(|price_sol| AdapterQuote {
                price_sol,
                price_usd: price_sol * 200.0,
                market_cap_usd: 0.0,
                source_tag: self.name,
                metadata: json!({}),
            })
        }
    }

    #[tokio::test]
    async fn falls_through_to_first_success() {
        let chain = FallbackAdapterChain::new(vec![
            Arc::new(StubAdapter { name: "a", result: Err(AdapterError::Miss) }),
            Arc::new(StubAdapter { name: "b", result: Ok(1.5) }),
        ]);

        let quote = chain.quote("mint").await.unwrap();
        assert_eq!(quote.source_tag, "b");
    }

    #[tokio::test]
    async fn returns_last_error_when_all_miss() {
        let chain = FallbackAdapterChain::new(vec![
            Arc::new(StubAdapter { name: "a", result: Err(AdapterError::Miss) }),
            Arc::new(StubAdapter { name: "b", result: Err(AdapterError::Request("down".to_string())) }),
        ]);

        assert!(matches!(chain.quote("mint").await, Err(AdapterError::Request(_))));
    }
}
