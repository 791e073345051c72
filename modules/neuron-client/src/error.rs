use thiserror::Error;

pub type Result<T> = std::result::Result<T, NeuronError>;

#[derive(Debug, Error)]
pub enum NeuronError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NeuronError {
    fn from(err: reqwest::Error) -> Self {
        NeuronError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for NeuronError {
    fn from(err: serde_json::Error) -> Self {
        NeuronError::Parse(err.to_string())
    }
}
