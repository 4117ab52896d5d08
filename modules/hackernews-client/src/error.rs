use thiserror::Error;

pub type Result<T> = std::result::Result<T, HnError>;

#[derive(Debug, Error)]
pub enum HnError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unknown story list '{0}'")]
    UnknownList(String),
}

impl From<reqwest::Error> for HnError {
    fn from(err: reqwest::Error) -> Self {
        HnError::Network(err.to_string())
    }
}
