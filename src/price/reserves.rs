use super::to_ui_amount;

/// Result of a reserve- or trade-amount price computation (§4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReservePrice {
    pub price_sol: f64,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub progress_pct: f64,
}

/// Derives spot price and market cap from virtual reserves.
///
/// Divides after decimal adjustment: `price_sol = (sol/1e9) / (token/1e6)`.
/// Returns an all-zero [`ReservePrice`] when either reserve is zero, signalling
/// the caller to fall back to trade-amount pricing (§4.1).
pub fn price_from_reserves(
    sol_reserves: u64,
    token_reserves: u64,
    sol_usd: f64,
    sol_decimals: u8,
    token_decimals: u8,
    fully_diluted_supply: u64,
) -> ReservePrice {
    if sol_reserves == 0 || token_reserves == 0 {
        return ReservePrice::default();
    }

    let sol_ui = to_ui_amount(sol_reserves, sol_decimals);
    let token_ui = to_ui_amount(token_reserves, token_decimals);
    let price_sol = sol_ui / token_ui;
    let price_usd = price_sol * sol_usd;
    let market_cap_usd = price_usd * (fully_diluted_supply as f64);

    ReservePrice {
        price_sol,
        price_usd,
        market_cap_usd,
        progress_pct: 0.0,
    }
}

/// Derives price directly from a single trade's amounts, independent of
/// reserves (§4.1). `is_buy` has no effect on the arithmetic today (the ratio
/// is symmetric) but is kept in the signature to match the source contract
/// and leave room for side-specific fee adjustments.
pub fn price_from_trade(
    sol_amount: u64,
    token_amount: u64,
    sol_usd: f64,
    _is_buy: bool,
    sol_decimals: u8,
    token_decimals: u8,
    fully_diluted_supply: u64,
) -> ReservePrice {
    if sol_amount == 0 || token_amount == 0 {
        return ReservePrice::default();
    }

    let sol_ui = to_ui_amount(sol_amount, sol_decimals);
    let token_ui = to_ui_amount(token_amount, token_decimals);
    let price_sol = sol_ui / token_ui;
    let price_usd = price_sol * sol_usd;

    ReservePrice {
        price_sol,
        price_usd,
        market_cap_usd: price_usd * (fully_diluted_supply as f64),
        progress_pct: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Property 2: price round-trip within 1e-12 relative error, mcap = price_usd * supply.
    #[test]
    fn price_from_reserves_round_trips() {
        let sol_reserves = 30_500_000_000u64; // 30.5 SOL
        let token_reserves = 1_050_000_000_000_000u64; // ~1.05B tokens @ 6dp
        let sol_usd = 180.0;
        let result = price_from_reserves(sol_reserves, token_reserves, sol_usd, 9, 6, 1_000_000_000);

        let expected_price_sol = (sol_reserves as f64 / 1e9) / (token_reserves as f64 / 1e6);
        let rel_err = ((result.price_sol - expected_price_sol) / expected_price_sol).abs();
        assert!(rel_err < 1e-12, "relative error too large: {rel_err}");

        let expected_mcap = result.price_usd * 1_000_000_000.0;
        assert!((result.market_cap_usd - expected_mcap).abs() < 1e-6);
    }

    #[test]
    fn zero_reserves_return_default() {
        let result = price_from_reserves(0, 1_000_000, 180.0, 9, 6, 1_000_000_000);
        assert_eq!(result, ReservePrice::default());
    }

    #[test]
    fn scenario_1_bonding_curve_buy() {
        // End-to-end scenario 1 from SPEC_FULL.md §8.
        let result = price_from_reserves(30_500_000_000, 1_050_000_000_000_000, 180.0, 9, 6, 1_000_000_000);
        assert!((result.price_sol - 2.9048e-5).abs() < 1e-8);
        assert!((result.market_cap_usd - 5.226e6).abs() / 5.226e6 < 0.01);
    }
}
