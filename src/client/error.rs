use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Session rejected by the server")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server responded {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("Refusing to send local-only id {0} to the server")]
    LocalId(String),
    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}
