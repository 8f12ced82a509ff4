// Config schema submodule - splits the monolithic schema into manageable files,
// one per subsystem, matching the component boundaries in SPEC_FULL.md §10 (A1).

use crate::config_struct;

mod adapter;
mod monitor;
mod parser;
mod persistence;
mod price;
mod recovery;
mod stream;

pub use adapter::*;
pub use monitor::*;
pub use parser::*;
pub use persistence::*;
pub use price::*;
pub use recovery::*;
pub use stream::*;

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations.
    pub struct Config {
        /// Subscription manager tunables (C3).
        stream: StreamConfig = StreamConfig::default(),

        /// Event parser tunables (C2).
        parser: ParserConfig = ParserConfig::default(),

        /// Price engine tunables (C1).
        price: PriceConfig = PriceConfig::default(),

        /// Batching persistence tunables (C6).
        persistence: PersistenceConfig = PersistenceConfig::default(),

        /// Stale detector / recovery queue tunables (C7).
        recovery: RecoveryConfig = RecoveryConfig::default(),

        /// External price recovery adapter tunables (C8).
        adapter: AdapterConfig = AdapterConfig::default(),

        /// Performance monitor tunables (C9).
        monitor: MonitorConfig = MonitorConfig::default(),
    }
}
