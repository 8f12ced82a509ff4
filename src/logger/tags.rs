//! Subsystem tags used to scope and filter log output.
//!
//! Every call site logs through one of these tags so that `--debug-<module>`
//! flags and the `enabled_tags` filter can gate output per subsystem instead
//! of globally.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    /// Subscription manager: connect/reconnect, ping/pong, backoff (C3).
    Stream,
    /// Event parser strategy registry (C2).
    Parser,
    /// Price engine and pool-state cache (C1, C4).
    Pricing,
    /// Trade handler enrichment pipeline (C5).
    TradeHandler,
    /// Batching persistence layer (C6).
    Persistence,
    /// Stale detector and recovery queue/workers (C7).
    Recovery,
    /// External price recovery adapters (C8).
    Adapter,
    /// Performance monitor, health score, alerts (C9).
    Monitor,
    /// Configuration loading/reloading (A1).
    Config,
    /// Composition root, service lifecycle, shutdown (A5).
    System,
    Other(String),
}

impl LogTag {
    /// Stable lowercase key used for `--debug-<key>` flags and config maps.
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Stream => "stream".to_string(),
            LogTag::Parser => "parser".to_string(),
            LogTag::Pricing => "pricing".to_string(),
            LogTag::TradeHandler => "trade_handler".to_string(),
            LogTag::Persistence => "persistence".to_string(),
            LogTag::Recovery => "recovery".to_string(),
            LogTag::Adapter => "adapter".to_string(),
            LogTag::Monitor => "monitor".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Plain (uncolored) string used in the file sink.
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Stream => "STREAM".to_string(),
            LogTag::Parser => "PARSER".to_string(),
            LogTag::Pricing => "PRICING".to_string(),
            LogTag::TradeHandler => "TRADEHANDLER".to_string(),
            LogTag::Persistence => "PERSISTENCE".to_string(),
            LogTag::Recovery => "RECOVERY".to_string(),
            LogTag::Adapter => "ADAPTER".to_string(),
            LogTag::Monitor => "MONITOR".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
