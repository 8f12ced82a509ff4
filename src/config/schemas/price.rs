/// Price engine configuration (C1).
use crate::config_struct;

config_struct! {
    pub struct PriceConfig {
        /// Token decimal places (6 for pump.fun-style SPL mints).
        token_decimals: u8 = 6,

        /// SOL decimal places (9, lamports).
        sol_decimals: u8 = 9,

        /// Fully diluted supply used for market cap unless a per-token
        /// override is recorded.
        fully_diluted_supply: u64 = 1_000_000_000,

        /// Bonding-curve progress start, in SOL.
        bc_start_sol: f64 = 30.0,

        /// Bonding-curve progress target (completion), in SOL.
        bc_target_sol: f64 = 85.0,

        /// Default virtual SOL reserves used when a bonding-curve trade
        /// carries no reserves and none are cached (30 SOL in lamports).
        default_virtual_sol_reserves: u64 = 30_000_000_000,

        /// Default virtual token reserves used under the same fallback
        /// (~1.073B tokens at 6 decimals).
        default_virtual_token_reserves: u64 = 1_073_000_000_000_000,

        /// Relative divergence between reserve-based and trade-amount price
        /// above which the trade handler logs a reconciliation warning.
        /// See §9 Open Questions: not numerically specified upstream: the
        /// conservative default adopted here is 1%.
        price_reconciliation_tolerance: f64 = 0.01,

        /// Tolerance used by `validate_constant_k` for the constant-product
        /// diagnostic equality test.
        constant_k_tolerance: f64 = 0.001,
    }
}
