use crate::domain::{FeeEvent, LiquidityEvent, PoolStateSnapshot, Program, Token};
use crate::domain::Trade;

/// A single row awaiting a batch insert (§4.6). Classified by `kind()` so
/// the flush loop can group same-kind rows for a multi-row insert.
#[derive(Debug, Clone)]
pub enum PendingRow {
    Trade(Trade),
    Liquidity(LiquidityEvent),
    Fee(FeeEvent),
    TokenUpsert(Token),
    PoolSnapshot { snapshot: PoolStateSnapshot, program: Program },
}

impl PendingRow {
    /// Kinds: `bc-state`, `bc-trade`, `amm-swap`, `token-upsert`,
    /// `price-snapshot` (§4.6); `liquidity` and `fee` are added here since
    /// §3 requires those two tables too.
    pub fn kind(&self) -> &'static str {
        match self {
            PendingRow::Trade(t) => match t.program {
                Program::BondingCurve => "bc-trade",
                Program::AmmPool => "amm-swap",
            },
            PendingRow::Liquidity(_) => "liquidity",
            PendingRow::Fee(_) => "fee",
            PendingRow::TokenUpsert(_) => "token-upsert",
            PendingRow::PoolSnapshot { program: Program::BondingCurve, .. } => "bc-state",
            PendingRow::PoolSnapshot { program: Program::AmmPool, .. } => "price-snapshot",
        }
    }
}

/// A batch that failed to insert, retained for a single re-queue attempt
/// (§7 "re-queue once; on repeated failure ... drop the batch").
pub struct PendingBatch {
    pub rows: Vec<PendingRow>,
    pub attempts: u32,
}
