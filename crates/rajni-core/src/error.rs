use thiserror::Error;

/// Top-level error type for RajniAI.
///
/// The gateways classify every upstream failure into one of these kinds and
/// attach the raw upstream message as diagnostic detail. The HTTP layer is the
/// only place that maps a kind to a status code.
#[derive(Debug, Error)]
pub enum RajniError {
    /// Missing or malformed required request field — user-correctable.
    #[error("validation error: {0}")]
    Validation(String),

    /// No record exists for the given user key. Not a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Error from the keyed-record store.
    #[error("store error: {0}")]
    Store(String),

    /// Error from a completion or speech provider.
    #[error("provider error: {0}")]
    Provider(String),

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
