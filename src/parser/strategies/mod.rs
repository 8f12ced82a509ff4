mod amm_trade;
mod bonding_curve_trade;
mod fee;
mod graduation;
mod liquidity;

pub use amm_trade::AmmTradeStrategy;
pub use bonding_curve_trade::BondingCurveTradeStrategy;
pub use fee::FeeStrategy;
pub use graduation::GraduationStrategy;
pub use liquidity::LiquidityStrategy;

use super::ParseStrategy;
use crate::config::Config;
use crate::pool_cache::PoolCache;
use std::sync::Arc;

/// Builds the default, ordered strategy set (§4.2). Order matters: more
/// specific strategies (graduation/pool-creation) run before the broader
/// trade strategies would otherwise also match on shared log lines.
pub fn default_strategies(config: &Config, pool_cache: Arc<PoolCache>) -> Vec<Arc<dyn ParseStrategy>> {
    vec![
        Arc::new(GraduationStrategy::new(config.stream.bonding_curve_program_id.clone())),
        Arc::new(BondingCurveTradeStrategy::new(
            config.stream.bonding_curve_program_id.clone(),
            config.parser.clone(),
            config.price.clone(),
            pool_cache.clone(),
        )),
        Arc::new(AmmTradeStrategy::new(config.stream.amm_program_id.clone(), config.parser.wrapped_sol_mint.clone())),
        Arc::new(LiquidityStrategy::new(config.stream.amm_program_id.clone())),
        Arc::new(FeeStrategy::new()),
    ]
}
