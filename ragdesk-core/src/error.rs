//! Error types for ragdesk-core

use thiserror::Error;

/// Main error type for the ragdesk-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the document API
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success response from the document API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(String),

    /// Document not found on the server
    #[error("document not found: {0}")]
    NotFound(String),

    /// The typewriter actor has shut down
    #[error("reveal session closed")]
    SessionClosed,
}

impl Error {
    /// Whether retrying the same request might succeed.
    ///
    /// Transport failures and 5xx responses are transient; everything else
    /// (4xx, malformed bodies, missing documents) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias for ragdesk-core
pub type Result<T> = std::result::Result<T, Error>;
