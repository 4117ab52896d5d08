use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelegramError>;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {description}")]
    Api { status: u16, description: String },

    #[error("Malformed API response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        TelegramError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TelegramError {
    fn from(err: serde_json::Error) -> Self {
        TelegramError::Malformed(err.to_string())
    }
}
