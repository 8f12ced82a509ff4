/// The trade handler's only dependency on an external SOL/USD rate. Kept as
/// a trait so the handler can be tested without a live price source; the
/// external price adapter chain (C8) is the production implementation.
pub trait SolPriceSource: Send + Sync {
    fn sol_usd(&self) -> f64;
}

/// A fixed rate, used in tests and as a safety fallback before the first
/// real quote arrives.
pub struct StaticSolPrice(pub f64);

impl SolPriceSource for StaticSolPrice {
    fn sol_usd(&self) -> f64 {
        self.0
    }
}

/// A SOL/USD rate refreshed periodically from the external spot-price
/// source (§6: cached in a local table, refreshed every 60s). Stored as
/// raw bits in an [`std::sync::atomic::AtomicU64`] so readers never block
/// on the writer (the refresher is the only writer).
pub struct SharedSolPrice {
    bits: std::sync::atomic::AtomicU64,
}

impl SharedSolPrice {
    pub fn new(initial_usd: f64) -> Self {
        Self { bits: std::sync::atomic::AtomicU64::new(initial_usd.to_bits()) }
    }

    pub fn set(&self, usd: f64) {
        self.bits.store(usd.to_bits(), std::sync::atomic::Ordering::Relaxed);
    }
}

impl SolPriceSource for SharedSolPrice {
    fn sol_usd(&self) -> f64 {
        f64::from_bits(self.bits.load(std::sync::atomic::Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_price_reflects_latest_set() {
        let shared = SharedSolPrice::new(150.0);
        assert_eq!(shared.sol_usd(), 150.0);
        shared.set(180.0);
        assert_eq!(shared.sol_usd(), 180.0);
    }
}
