use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityKind {
    Deposit,
    Withdraw,
}

/// A liquidity add/remove event (§3 "Liquidity event"). The two variants are
/// distinguished by a tagged enum rather than the source's duck-typed
/// `'lpTokenAmountOut' in event` check (§9 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityEvent {
    pub signature: String,
    pub kind: LiquidityKind,
    pub pool_address: String,
    pub mint: String,
    pub user: Option<String>,
    pub lp_amount: u64,
    pub sol_amount: u64,
    pub token_amount: u64,
    pub sol_reserves_after: u64,
    pub token_reserves_after: u64,
    pub value_usd: f64,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    CreatorFee,
    ProtocolFee,
}

/// A fee event (§3 "Fee event"). Deduplicated on (signature, event_type)
/// since a single transaction can emit both a creator and a protocol fee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEvent {
    pub signature: String,
    pub kind: FeeKind,
    pub pool_address: String,
    pub mint: String,
    pub recipient: Option<String>,
    pub sol_fee_amount: u64,
    pub token_fee_amount: u64,
    pub sol_reserves_after: u64,
    pub token_reserves_after: u64,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
}

/// Emitted the moment a mint graduates from the bonding curve to an AMM
/// pool. The owning token row's `graduated` flag is a one-way transition;
/// this event is what triggers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraduationEvent {
    pub signature: String,
    pub mint: String,
    pub bonding_curve_address: String,
    pub final_sol_reserves: u64,
    pub final_token_reserves: u64,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
}

/// Emitted when a fresh AMM pool is created for a graduated mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCreatedEvent {
    pub signature: String,
    pub mint: String,
    pub pool_address: String,
    pub initial_sol_reserves: u64,
    pub initial_token_reserves: u64,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
}
