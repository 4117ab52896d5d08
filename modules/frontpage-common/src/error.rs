use thiserror::Error;

/// Failures from the shared store backing staging and pending links.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Database(String),

    /// Corrupt or schema-mismatched stored payload. Consumed inside `list()`
    /// (record dropped, index pruned) and never surfaced as a crash.
    #[error("Payload decode error: {0}")]
    Decode(String),

    #[error("Candidate {0} is not staged")]
    NotStaged(String),
}

impl StoreError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        StoreError::Database(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Failures from the outbound messaging side effects.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Publish went through but the response was missing what we need
    /// (e.g. no message id to key the pending link on).
    #[error("Publish rejected: {0}")]
    Rejected(String),
}
