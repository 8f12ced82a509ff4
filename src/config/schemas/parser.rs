/// Event parser configuration (C2).
use crate::config_struct;

config_struct! {
    pub struct ParserConfig {
        /// Wrapped SOL mint, used to resolve AMM trade direction.
        wrapped_sol_mint: String = "So11111111111111111111111111111111111111112".to_string(),

        /// Minimum instruction-data length carrying virtual reserves inline
        /// for the bonding-curve trade layout (see §4.2).
        bonding_curve_full_layout_len: usize = 225,

        /// Minimum instruction-data length for the short bonding-curve
        /// layout (reserves absent, filled from the pool-state cache).
        bonding_curve_short_layout_len: usize = 113,
    }
}
