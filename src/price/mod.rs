//! Price engine (C1): pure, stateless arithmetic over integer reserves.
//!
//! Every function here takes smallest-unit integers (9-decimal lamports for
//! SOL, 6-decimal units for the token) plus a SOL/USD rate, and returns
//! floating point prices. This is the one place in the crate where floating
//! point is allowed to touch amounts directly (§9 design note: "floating
//! point is confined to C1 and to user-facing formatting").

mod impact;
mod progress;
mod reserves;
mod slippage;

pub use impact::{price_impact, validate_constant_k, PriceImpactResult};
pub use progress::bonding_curve_progress;
pub use reserves::{price_from_reserves, price_from_trade, ReservePrice};
pub use slippage::slippage;

/// Adjusts an integer amount in its smallest unit to a floating-point
/// quantity given its decimal places. `10^9` lamports -> `1.0` SOL, etc.
pub fn to_ui_amount(raw: u64, decimals: u8) -> f64 {
    (raw as f64) / (10f64).powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_amount_adjusts_decimals() {
        assert!((to_ui_amount(1_000_000_000, 9) - 1.0).abs() < 1e-12);
        assert!((to_ui_amount(10_000_000, 6) - 10.0).abs() < 1e-12);
    }
}
