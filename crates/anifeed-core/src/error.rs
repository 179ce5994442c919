use thiserror::Error;

/// Top-level error type for anifeed.
#[derive(Debug, Error)]
pub enum AnifeedError {
    /// Unknown account handle, or an untrack target that is not tracked.
    #[error("not found: {0}")]
    NotFound(String),

    /// The (channel, account) pair is already tracked.
    #[error("already tracked: {0}")]
    DuplicateSubscription(String),

    /// Network or parse failure talking to the activity source.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Delivery failure on a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Durable storage failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnifeedError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Adapter(_) | Self::Channel(_))
    }
}
