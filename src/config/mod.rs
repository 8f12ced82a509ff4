/// Configuration module - organized config system with zero repetition
///
/// This module provides a clean, type-safe configuration system for the
/// ingestion pipeline (SPEC_FULL.md §10, A1).
///
/// # Architecture
///
/// - `macros.rs` - The `config_struct!` macro for defining configs with embedded defaults
/// - `schemas/` - One file per subsystem config section, re-exported here
/// - `utils.rs` - Loading, reloading, and access utilities
///
/// # Usage
///
/// ## Loading configuration at startup:
/// ```
/// use curve_pipeline::config::load_config;
///
/// fn main() -> Result<(), String> {
///     load_config()?;
///     // Config is now available globally
///     Ok(())
/// }
/// ```
///
/// ## Accessing configuration (one-liner):
/// ```
/// use curve_pipeline::config::with_config;
///
/// let threshold = with_config(|cfg| cfg.persistence.market_cap_threshold_usd);
/// ```
///
/// ## Hot-reloading configuration:
/// ```
/// use curve_pipeline::config::reload_config;
///
/// // After modifying data/config.toml
/// reload_config()?;
/// // New values are now active
/// ```
///
/// # Adding new configuration parameters
///
/// Edit the relevant file under `schemas/` and add your field:
/// ```
/// config_struct! {
///     pub struct RecoveryConfig {
///         max_concurrent_recoveries: usize = 3,
///         new_param: bool = false,  // ← Add this line
///     }
/// }
/// ```
/// Then read it anywhere with `with_config(|cfg| cfg.recovery.new_param)`.
/// No helper functions, no boilerplate, no repetition.

// Export the macro
#[macro_use]
mod macros;

// Export schemas (all config structures)
pub mod schemas;

// Export utilities (loading, reloading, access)
pub mod utils;

pub use schemas::{
    AdapterConfig, Config, MonitorConfig, ParserConfig, PersistenceConfig, PriceConfig,
    RecoveryConfig, StreamConfig,
};

pub use utils::{
    get_config_clone, is_config_initialized, load_config, load_config_from_path, reload_config,
    reload_config_from_path, save_config, with_config, CONFIG,
};

#[cfg(test)]
pub use utils::ensure_test_config;
