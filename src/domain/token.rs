use super::Program;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked mint (§3 "Token"). Created as a placeholder on first
/// observation or threshold crossing; never deleted, only flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub uri: Option<String>,
    pub program: Program,
    pub first_seen_slot: u64,
    pub first_seen_time: DateTime<Utc>,
    pub latest_price_sol: f64,
    pub latest_price_usd: f64,
    pub latest_market_cap_usd: f64,
    pub bonding_curve_progress: f64,
    pub bonding_curve_complete: bool,
    pub graduated: bool,
    pub graduation_slot: Option<u64>,
    pub graduation_signature: Option<String>,
    pub creator: Option<String>,
    pub decimals: u8,
    pub total_supply: u64,
    pub enriched: bool,
    pub last_trade_time: Option<DateTime<Utc>>,
    pub last_price_update_time: Option<DateTime<Utc>>,
    pub price_source: Option<String>,
    pub is_stale: bool,
    pub should_remove: bool,
}

impl Token {
    /// A minimal placeholder row, created when a trade/pool event references
    /// a mint we haven't seen before (§4.6 "trigger ... creates a
    /// placeholder token row on trade insert if the token is absent").
    pub fn placeholder(mint: impl Into<String>, program: Program, slot: u64) -> Self {
        let now = Utc::now();
        Self {
            mint: mint.into(),
            symbol: String::new(),
            name: String::new(),
            uri: None,
            program,
            first_seen_slot: slot,
            first_seen_time: now,
            latest_price_sol: 0.0,
            latest_price_usd: 0.0,
            latest_market_cap_usd: 0.0,
            bonding_curve_progress: 0.0,
            bonding_curve_complete: false,
            graduated: false,
            graduation_slot: None,
            graduation_signature: None,
            creator: None,
            decimals: crate::config::with_config(|c| c.price.token_decimals),
            total_supply: crate::config::with_config(|c| c.price.fully_diluted_supply),
            enriched: false,
            last_trade_time: None,
            last_price_update_time: None,
            price_source: None,
            is_stale: false,
            should_remove: false,
        }
    }

    /// Marks graduation. Per the invariant in §3, this is a one-way
    /// transition: calling it again is a no-op, it never clears the flag.
    pub fn mark_graduated(&mut self, slot: u64, signature: &str) {
        if self.graduated {
            return;
        }
        self.graduated = true;
        self.graduation_slot = Some(slot);
        self.graduation_signature = Some(signature.to_string());
        self.program = Program::AmmPool;
    }
}
