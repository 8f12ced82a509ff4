use crate::config::RecoveryConfig;

/// Priority score for a stale-queue item (§4.7): base 50, plus the single
/// highest applicable market-cap tier bonus, plus the single highest
/// applicable staleness bonus, capped at 100.
///
/// Open question: the tier/staleness bonuses are defined as a flat series
/// ("+30 if ... +20 if ... +10 if ...") without saying whether they stack.
/// Read as mutually-exclusive tiers (only the highest one a token qualifies
/// for applies) since "tier" implies a single bucket per token.
pub fn score(market_cap_usd: f64, stale_minutes: i64, config: &RecoveryConfig) -> u8 {
    let mut total: i32 = 50;

    total += if market_cap_usd >= config.mcap_tier_critical {
        30
    } else if market_cap_usd >= config.mcap_tier_high {
        20
    } else if market_cap_usd >= config.mcap_tier_medium {
        10
    } else if market_cap_usd >= config.mcap_tier_low {
        5
    } else {
        0
    };

    total += if stale_minutes > 120 {
        15
    } else if stale_minutes > 60 {
        10
    } else if stale_minutes > 30 {
        5
    } else {
        0
    };

    total.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_tier_and_longest_staleness_combine() {
        let config = RecoveryConfig::default();
        assert_eq!(score(100_000.0, 200, &config), 95);
    }

    #[test]
    fn low_tier_short_staleness() {
        let config = RecoveryConfig::default();
        assert_eq!(score(6_000.0, 10, &config), 55);
    }

    #[test]
    fn below_every_tier_floor() {
        let config = RecoveryConfig::default();
        assert_eq!(score(100.0, 5, &config), 50);
    }
}
