//! Event parser (C2): a registry of strategies, tried in order, each
//! declaring `can_parse`/`parse` (§4.2). The first match wins; exceptions
//! inside a strategy are caught so the registry can try the next one
//! (§4.2 "Failure semantics").

mod context;
mod event;
pub mod strategies;

pub use context::ParseContext;
pub use event::ParsedEvent;

use crate::events::{EventBus, PipelineEvent};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A single parsing strategy. Implementors must be cheap to call
/// `can_parse` on (it runs for every transaction against every strategy
/// until one matches).
#[async_trait]
pub trait ParseStrategy: Send + Sync {
    /// Stable name, used for per-strategy counters and logging.
    fn name(&self) -> &'static str;

    /// Cheap predicate: does this strategy recognise the transaction?
    fn can_parse(&self, ctx: &ParseContext) -> bool;

    /// Extracts a typed event. Only called after `can_parse` returned true.
    /// Returning `Ok(None)` means the strategy matched the shape but could
    /// not extract a usable event (e.g. a required field was unparsable);
    /// the registry treats that the same as "no match" and tries the rest.
    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String>;
}

#[derive(Debug, Default, Clone)]
pub struct StrategyCounters {
    pub attempted: u64,
    pub matched: u64,
}

/// Aggregate parser statistics exposed to the performance monitor (C9).
#[derive(Debug, Clone, Default)]
pub struct ParserStats {
    pub total: u64,
    pub parsed: u64,
    pub failed: u64,
    pub per_strategy: HashMap<String, StrategyCounters>,
}

impl ParserStats {
    /// Fraction of transactions that produced an event (§4.2 "aggregate
    /// parse-rate (parsed/total)").
    pub fn parse_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.parsed as f64) / (self.total as f64)
        }
    }
}

struct Counters {
    total: AtomicU64,
    parsed: AtomicU64,
    failed: AtomicU64,
}

/// The ordered strategy registry. Constructed once at startup with the
/// default strategy set (see [`strategies::default_strategies`]).
pub struct EventParser {
    strategies: Vec<Arc<dyn ParseStrategy>>,
    counters: Counters,
    per_strategy: Mutex<HashMap<&'static str, StrategyCounters>>,
    events: EventBus,
}

impl EventParser {
    pub fn new(strategies: Vec<Arc<dyn ParseStrategy>>, events: EventBus) -> Self {
        let per_strategy = strategies.iter().map(|s| (s.name(), StrategyCounters::default())).collect();
        Self {
            strategies,
            counters: Counters {
                total: AtomicU64::new(0),
                parsed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            },
            per_strategy: Mutex::new(per_strategy),
            events,
        }
    }

    /// Tries each strategy in registration order, returning the first
    /// match. Never propagates a strategy panic: it is caught and treated
    /// as a failed match so the registry moves on (§4.2).
    pub async fn parse(&self, ctx: &ParseContext) -> Option<ParsedEvent> {
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        for strategy in &self.strategies {
            if !strategy.can_parse(ctx) {
                continue;
            }

            {
                let mut counts = self.per_strategy.lock().await;
                counts.entry(strategy.name()).or_default().attempted += 1;
            }

            let outcome = futures::FutureExt::catch_unwind(
                std::panic::AssertUnwindSafe(strategy.parse(ctx)),
            )
            .await;

            match outcome {
                Ok(Ok(Some(parsed_event))) => {
                    self.counters.parsed.fetch_add(1, Ordering::Relaxed);
                    {
                        let mut counts = self.per_strategy.lock().await;
                        counts.entry(strategy.name()).or_default().matched += 1;
                    }
                    self.events.publish(PipelineEvent::ParserSuccess {
                        strategy: strategy.name(),
                        signature: ctx.signature.clone(),
                    });
                    return Some(parsed_event);
                }
                Ok(Ok(None)) => continue,
                Ok(Err(reason)) => {
                    logger::debug(
                        LogTag::Parser,
                        &format!("strategy {} failed on {}: {reason}", strategy.name(), ctx.signature),
                    );
                    continue;
                }
                Err(_) => {
                    logger::debug(
                        LogTag::Parser,
                        &format!("strategy {} panicked on {}", strategy.name(), ctx.signature),
                    );
                    continue;
                }
            }
        }

        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        self.events.publish(PipelineEvent::ParserFailed {
            signature: ctx.signature.clone(),
            reason: "no strategy matched".to_string(),
        });
        logger::debug(LogTag::Parser, &format!("no strategy matched signature {}", ctx.signature));
        None
    }

    pub async fn stats(&self) -> ParserStats {
        ParserStats {
            total: self.counters.total.load(Ordering::Relaxed),
            parsed: self.counters.parsed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            per_strategy: self
                .per_strategy
                .lock()
                .await
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}
