use crate::domain::{FeeEvent, GraduationEvent, LiquidityEvent, PoolCreatedEvent, Trade};

/// Tagged union of everything a strategy can produce. Replaces the source's
/// duck-typed payloads (§9 design note) with a sum type the trade handler
/// and persistence layer can match exhaustively.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    BondingCurveTrade(Trade),
    AmmTrade(Trade),
    Liquidity(LiquidityEvent),
    Fee(FeeEvent),
    Graduation(GraduationEvent),
    PoolCreated(PoolCreatedEvent),
}

impl ParsedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedEvent::BondingCurveTrade(_) => "bonding_curve_trade",
            ParsedEvent::AmmTrade(_) => "amm_trade",
            ParsedEvent::Liquidity(_) => "liquidity",
            ParsedEvent::Fee(_) => "fee",
            ParsedEvent::Graduation(_) => "graduation",
            ParsedEvent::PoolCreated(_) => "pool_created",
        }
    }

    pub fn mint(&self) -> &str {
        match self {
            ParsedEvent::BondingCurveTrade(t) | ParsedEvent::AmmTrade(t) => &t.mint,
            ParsedEvent::Liquidity(l) => &l.mint,
            ParsedEvent::Fee(f) => &f.mint,
            ParsedEvent::Graduation(g) => &g.mint,
            ParsedEvent::PoolCreated(p) => &p.mint,
        }
    }
}
