//! Trade handler (C5): resolves reserves, derives price/market cap, enriches
//! AMM trades with impact and slippage, and hands the result to the batch
//! queue for persistence (§4.5).

mod handler;
mod sol_price;

pub use handler::TradeHandler;
pub use sol_price::{SharedSolPrice, SolPriceSource, StaticSolPrice};
