use thiserror::Error;

/// Crate-wide error type for the composition root and anything that needs
/// to classify a failure rather than just propagate it (§7 "Taxonomy").
/// Per-module code mostly returns `anyhow::Result`/typed adapter errors;
/// this is the type those get folded into at task boundaries that need to
/// decide retry vs. drop vs. fatal.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("recovery error: {0}")]
    Recovery(String),

    #[error("monitor error: {0}")]
    Monitor(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("timeout: operation did not complete within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("rate limited: {service}")]
    RateLimit { service: String },

    #[error("service unavailable: {service}")]
    ServiceUnavailable { service: String },

    #[error("{0}")]
    Unknown(String),
}

impl PipelineError {
    /// §7 "Transient network errors ... retry with backoff". Used by
    /// workers deciding whether a failure is worth a retry at all.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Stream(_)
                | PipelineError::Http(_)
                | PipelineError::RateLimit { .. }
                | PipelineError::ServiceUnavailable { .. }
                | PipelineError::Timeout { .. }
        )
    }

    /// §7 "Configuration errors at startup: fatal, exit with non-zero
    /// status". Anything else is handled within its own task boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Config(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
