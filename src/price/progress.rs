/// Bonding-curve completion progress, linear between `start_sol` and
/// `target_sol`, clamped to `[0, 100]` (§4.1).
///
/// §9 Open Questions notes two conventions seen upstream for the endpoints
/// (30/85 vs a lamports/1e9/84*100 formula); both reduce to the same linear
/// shape, so both are expressible by choosing `start_sol`/`target_sol`
/// accordingly. The defaults (30, 85) live in [`crate::config::PriceConfig`].
pub fn bonding_curve_progress(sol_in_curve_ui: f64, start_sol: f64, target_sol: f64) -> f64 {
    if target_sol <= start_sol {
        return 0.0;
    }
    let pct = ((sol_in_curve_ui - start_sol) / (target_sol - start_sol)) * 100.0;
    pct.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_start_is_zero() {
        assert_eq!(bonding_curve_progress(10.0, 30.0, 85.0), 0.0);
    }

    #[test]
    fn at_target_is_complete() {
        assert_eq!(bonding_curve_progress(85.0, 30.0, 85.0), 100.0);
        assert_eq!(bonding_curve_progress(200.0, 30.0, 85.0), 100.0);
    }

    #[test]
    fn scenario_1_progress() {
        // 30.5 SOL in curve -> ~0.9% (SPEC_FULL.md §8 scenario 1).
        let pct = bonding_curve_progress(30.5, 30.0, 85.0);
        assert!((pct - 0.909).abs() < 0.01, "got {pct}");
    }
}
