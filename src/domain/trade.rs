use super::Program;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single trade (§3 "Trade"). Keyed by signature, the idempotency key
/// everywhere downstream. Immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub signature: String,
    pub mint: String,
    pub program: Program,
    pub side: TradeSide,
    pub user: Option<String>,
    pub sol_amount: u64,
    pub token_amount: u64,
    pub price_sol: f64,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
    pub bonding_curve_progress: f64,
    pub slot: u64,
    pub block_time: DateTime<Utc>,

    // Enrichment, populated by the trade handler (C5) for AMM trades.
    pub price_impact_pct: Option<f64>,
    pub slippage_pct: Option<f64>,
    pub spot_price_sol: Option<f64>,
    pub execution_price_sol: Option<f64>,
    pub min_received: Option<u64>,
    pub max_received: Option<u64>,
}

impl Trade {
    /// Relative divergence between this trade's recorded price and an
    /// independently derived one, used for the reconciliation check in
    /// §4.5 step 2.
    pub fn price_divergence(&self, other_price_sol: f64) -> f64 {
        if self.price_sol <= 0.0 {
            return 0.0;
        }
        ((self.price_sol - other_price_sol) / self.price_sol).abs()
    }
}
