//! Client error taxonomy
//!
//! Every variant is recoverable at the screen level; `message()` is what the
//! user sees.

use thiserror::Error;

/// Message shown when the server cannot be reached
pub const CONNECTIVITY_MESSAGE: &str =
    "Cannot connect to backend server. Please make sure the backend is running.";

#[derive(Error, Debug)]
pub enum ClientError {
    /// No response from the server
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// Rejected locally before any request
    #[error("{0}")]
    Validation(String),

    /// Microphone denied or absent
    #[error("{0}")]
    Permission(String),

    /// Non-2xx response with the server's detail message
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// 2xx response whose body could not be decoded
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Capture failure or invalid capture transition
    #[error("{0}")]
    Capture(String),
}

impl ClientError {
    /// User-facing message
    pub fn message(&self) -> String {
        match self {
            ClientError::Connectivity(_) => CONNECTIVITY_MESSAGE.to_string(),
            ClientError::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status, when the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Connectivity(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
