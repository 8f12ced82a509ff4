use super::sol_price::SolPriceSource;
use crate::config::{PersistenceConfig, PriceConfig};
use crate::domain::{PoolReserves, Program, Token, Trade};
use crate::events::{EventBus, PipelineEvent};
use crate::logger::{self, LogTag};
use crate::parser::ParsedEvent;
use crate::persistence::{BatchQueue, PendingRow, PersistenceStore};
use crate::pool_cache::PoolCache;
use crate::price;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Consumes parsed trade events, resolves reserves and price, enriches AMM
/// trades with impact/slippage, and enqueues the result for persistence
/// (§4.5). Also handles liquidity, fee, graduation and pool-created events,
/// which need the same reserve bookkeeping but no price computation.
pub struct TradeHandler {
    price_config: PriceConfig,
    persistence_config: PersistenceConfig,
    pool_cache: Arc<PoolCache>,
    store: Arc<PersistenceStore>,
    batch_queue: Arc<BatchQueue>,
    sol_price: Arc<dyn SolPriceSource>,
    events: EventBus,
    processed: AtomicU64,
    discarded_below_threshold: AtomicU64,
}

impl TradeHandler {
    pub fn new(
        price_config: PriceConfig,
        persistence_config: PersistenceConfig,
        pool_cache: Arc<PoolCache>,
        store: Arc<PersistenceStore>,
        batch_queue: Arc<BatchQueue>,
        sol_price: Arc<dyn SolPriceSource>,
        events: EventBus,
    ) -> Self {
        Self {
            price_config,
            persistence_config,
            pool_cache,
            store,
            batch_queue,
            sol_price,
            events,
            processed: AtomicU64::new(0),
            discarded_below_threshold: AtomicU64::new(0),
        }
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn discarded_below_threshold_count(&self) -> u64 {
        self.discarded_below_threshold.load(Ordering::Relaxed)
    }

    pub async fn handle(&self, event: ParsedEvent) {
        match event {
            ParsedEvent::BondingCurveTrade(trade) => self.handle_trade(trade, Program::BondingCurve).await,
            ParsedEvent::AmmTrade(trade) => self.handle_trade(trade, Program::AmmPool).await,
            ParsedEvent::Liquidity(liquidity) => {
                self.pool_cache.update(
                    &liquidity.mint,
                    Some(&liquidity.pool_address),
                    0,
                    0,
                    liquidity.sol_reserves_after,
                    liquidity.token_reserves_after,
                    liquidity.slot,
                );
                self.batch_queue.enqueue(PendingRow::Liquidity(liquidity));
            }
            ParsedEvent::Fee(fee) => {
                self.batch_queue.enqueue(PendingRow::Fee(fee));
            }
            ParsedEvent::Graduation(graduation) => {
                if let Ok(Some(mut token)) = self.store.token_by_mint(&graduation.mint) {
                    token.mark_graduated(graduation.slot, &graduation.signature);
                    self.batch_queue.enqueue(PendingRow::TokenUpsert(token));
                } else {
                    let mut token = Token::placeholder(&graduation.mint, Program::BondingCurve, graduation.slot);
                    token.mark_graduated(graduation.slot, &graduation.signature);
                    self.batch_queue.enqueue(PendingRow::TokenUpsert(token));
                }
            }
            ParsedEvent::PoolCreated(created) => {
                self.pool_cache.update(
                    &created.mint,
                    Some(&created.pool_address),
                    created.initial_sol_reserves,
                    created.initial_token_reserves,
                    created.initial_sol_reserves,
                    created.initial_token_reserves,
                    created.slot,
                );
            }
        }
    }

    async fn handle_trade(&self, mut trade: Trade, program: Program) {
        self.processed.fetch_add(1, Ordering::Relaxed);

        let reserves_before = self.resolve_reserves(&trade, program);
        trade.virtual_sol_reserves = reserves_before.virtual_sol_reserves;
        trade.virtual_token_reserves = reserves_before.virtual_token_reserves;

        let sol_usd = self.sol_price.sol_usd();
        let reserve_price = price::price_from_reserves(
            trade.virtual_sol_reserves,
            trade.virtual_token_reserves,
            sol_usd,
            self.price_config.sol_decimals,
            self.price_config.token_decimals,
            self.price_config.fully_diluted_supply,
        );
        let trade_price = price::price_from_trade(
            trade.sol_amount,
            trade.token_amount,
            sol_usd,
            trade.side == crate::domain::TradeSide::Buy,
            self.price_config.sol_decimals,
            self.price_config.token_decimals,
            self.price_config.fully_diluted_supply,
        );

        // Reserve-based price is authoritative when available (§4.5 step 2).
        let authoritative = if reserve_price.price_sol > 0.0 { reserve_price } else { trade_price };
        trade.price_sol = authoritative.price_sol;
        trade.price_usd = authoritative.price_usd;
        trade.market_cap_usd = authoritative.market_cap_usd;

        if reserve_price.price_sol > 0.0 && trade_price.price_sol > 0.0 {
            let divergence = trade.price_divergence(trade_price.price_sol);
            if divergence > self.price_config.price_reconciliation_tolerance {
                logger::warning(
                    LogTag::TradeHandler,
                    &format!(
                        "price divergence {:.4} exceeds tolerance for {} (reserve={:.10} trade={:.10})",
                        divergence, trade.mint, reserve_price.price_sol, trade_price.price_sol
                    ),
                );
            }
        }

        if program == Program::BondingCurve {
            let sol_in_curve = price::to_ui_amount(trade.virtual_sol_reserves, self.price_config.sol_decimals);
            trade.bonding_curve_progress = price::bonding_curve_progress(
                sol_in_curve,
                self.price_config.bc_start_sol,
                self.price_config.bc_target_sol,
            );
        } else {
            trade.bonding_curve_progress = 100.0;
            self.enrich_amm_trade(&mut trade, reserves_before);
        }

        self.pool_cache.update(
            &trade.mint,
            None,
            trade.virtual_sol_reserves,
            trade.virtual_token_reserves,
            0,
            0,
            trade.slot,
        );

        if trade.market_cap_usd < self.persistence_config.market_cap_threshold_usd {
            self.discarded_below_threshold.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.upsert_token_from_trade(&trade, program).await;
        self.batch_queue.enqueue(PendingRow::Trade(trade.clone()));
        self.events.publish(PipelineEvent::TradeProcessed { trade: Box::new(trade) });
    }

    fn enrich_amm_trade(&self, trade: &mut Trade, reserves_before: PoolReserves) {
        if reserves_before.virtual_sol_reserves == 0 || reserves_before.virtual_token_reserves == 0 {
            return;
        }

        let is_buy = trade.side == crate::domain::TradeSide::Buy;
        let reserves = if is_buy {
            (reserves_before.virtual_sol_reserves, reserves_before.virtual_token_reserves)
        } else {
            (reserves_before.virtual_token_reserves, reserves_before.virtual_sol_reserves)
        };
        let amount_in = if is_buy { trade.sol_amount } else { trade.token_amount };
        let actual_out = if is_buy { trade.token_amount } else { trade.sol_amount };

        let result = price::price_impact(amount_in, reserves, is_buy);
        trade.price_impact_pct = Some(result.impact_pct);
        trade.slippage_pct = Some(price::slippage(result.amount_out, actual_out));
        trade.spot_price_sol = Some(if is_buy { 1.0 / result.execution_price.max(f64::MIN_POSITIVE) } else { result.execution_price });
        trade.execution_price_sol = Some(result.execution_price);
    }

    /// Waterfall: event-provided reserves -> pool-state cache -> (bonding
    /// curve only) configured defaults (§4.5 step 1).
    fn resolve_reserves(&self, trade: &Trade, program: Program) -> PoolReserves {
        if trade.virtual_sol_reserves > 0 && trade.virtual_token_reserves > 0 {
            return PoolReserves {
                virtual_sol_reserves: trade.virtual_sol_reserves,
                virtual_token_reserves: trade.virtual_token_reserves,
                real_sol_reserves: 0,
                real_token_reserves: 0,
                slot: trade.slot,
            };
        }

        if let Some(cached) = self.pool_cache.get(&trade.mint) {
            if cached.virtual_sol_reserves > 0 && cached.virtual_token_reserves > 0 {
                return cached;
            }
        }

        if program == Program::BondingCurve {
            return PoolReserves {
                virtual_sol_reserves: self.price_config.default_virtual_sol_reserves,
                virtual_token_reserves: self.price_config.default_virtual_token_reserves,
                real_sol_reserves: 0,
                real_token_reserves: 0,
                slot: trade.slot,
            };
        }

        PoolReserves::default()
    }

    async fn upsert_token_from_trade(&self, trade: &Trade, program: Program) {
        let mut token = match self.store.token_by_mint(&trade.mint) {
            Ok(Some(existing)) => existing,
            _ => Token::placeholder(&trade.mint, program, trade.slot),
        };

        token.program = program;
        token.latest_price_sol = trade.price_sol;
        token.latest_price_usd = trade.price_usd;
        token.latest_market_cap_usd = trade.market_cap_usd;
        token.bonding_curve_progress = trade.bonding_curve_progress;
        if trade.bonding_curve_progress >= 100.0 {
            token.bonding_curve_complete = true;
        }
        token.last_trade_time = Some(trade.block_time);
        token.last_price_update_time = Some(trade.block_time);
        token.price_source = Some("trade".to_string());

        self.batch_queue.enqueue(PendingRow::TokenUpsert(token));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeSide;
    use chrono::Utc;

    fn sample_trade(mint: &str, program: Program, sol_reserves: u64, token_reserves: u64) -> Trade {
        Trade {
            signature: format!("sig-{mint}"),
            mint: mint.to_string(),
            program,
            side: TradeSide::Buy,
            user: None,
            sol_amount: 1_000_000_000,
            token_amount: 10_000_000,
            price_sol: 0.0,
            price_usd: 0.0,
            market_cap_usd: 0.0,
            virtual_sol_reserves: sol_reserves,
            virtual_token_reserves: token_reserves,
            bonding_curve_progress: 0.0,
            slot: 100,
            block_time: Utc::now(),
            price_impact_pct: None,
            slippage_pct: None,
            spot_price_sol: None,
            execution_price_sol: None,
            min_received: None,
            max_received: None,
        }
    }

    fn test_handler() -> TradeHandler {
        crate::config::ensure_test_config();
        let store = Arc::new(PersistenceStore::in_memory().unwrap());
        let events = EventBus::new();
        let batch_queue = Arc::new(BatchQueue::new(store.clone(), PersistenceConfig::default(), events.clone()));
        TradeHandler::new(
            PriceConfig::default(),
            PersistenceConfig::default(),
            Arc::new(PoolCache::new()),
            store,
            batch_queue,
            Arc::new(StaticSolPrice(200.0)),
            events,
        )
    }

    #[tokio::test]
    async fn trade_above_threshold_is_enqueued_and_cached() {
        let handler = test_handler();
        let trade = sample_trade("MintA", Program::BondingCurve, 30_000_000_000, 1_000_000_000_000_000);
        handler.handle(ParsedEvent::BondingCurveTrade(trade)).await;

        assert_eq!(handler.processed_count(), 1);
        assert_eq!(handler.discarded_below_threshold_count(), 0);
        assert!(handler.batch_queue.pending_len() >= 1);
        assert!(handler.pool_cache.get("MintA").is_some());
    }

    #[tokio::test]
    async fn trade_below_threshold_is_discarded_but_cache_updates() {
        let handler = test_handler();
        // Zero reserves and zero trade amounts keep derived price/mcap at 0,
        // which is below the default $8,888 threshold.
        let mut trade = sample_trade("MintB", Program::BondingCurve, 0, 0);
        trade.sol_amount = 0;
        trade.token_amount = 0;
        handler.handle(ParsedEvent::BondingCurveTrade(trade)).await;

        assert_eq!(handler.discarded_below_threshold_count(), 1);
        assert_eq!(handler.batch_queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn amm_trade_gets_impact_annotations() {
        let handler = test_handler();
        let trade = sample_trade("MintC", Program::AmmPool, 50_000_000_000, 900_000_000_000_000);
        handler.handle(ParsedEvent::AmmTrade(trade)).await;

        assert_eq!(handler.processed_count(), 1);
        assert!(handler.pool_cache.get("MintC").unwrap().virtual_sol_reserves > 0);
    }

    #[tokio::test]
    async fn graduation_marks_token_graduated() {
        let handler = test_handler();
        let event = crate::domain::GraduationEvent {
            signature: "sig-grad".to_string(),
            mint: "MintD".to_string(),
            bonding_curve_address: "curve1".to_string(),
            final_sol_reserves: 85_000_000_000,
            final_token_reserves: 0,
            slot: 500,
            block_time: Utc::now(),
        };
        handler.handle(ParsedEvent::Graduation(event)).await;
        assert!(handler.batch_queue.pending_len() >= 1);
    }
}
