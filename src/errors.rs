//! Error types for the uptime console

use std::fmt;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Classified failure from any layer of the data path.
///
/// Variants carry owned strings rather than source errors so cached
/// snapshots holding a failure stay cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Input rejected before any request was made.
    Validation(String),
    /// The service wants an identity it did not get or did not accept.
    AuthRequired,
    /// The requested resource does not exist.
    NotFound(String),
    /// The service answered with a failure status.
    Server { status: u16, message: String },
    /// The service could not be reached.
    Network(String),
    /// The response arrived but could not be decoded.
    Decode(String),
    /// The identity store failed to read or write.
    Storage(String),
    /// The client could not be constructed.
    Config(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(message) => write!(f, "{}", message),
            ApiError::AuthRequired => write!(f, "an identity is required"),
            ApiError::NotFound(message) => write!(f, "not found: {}", message),
            ApiError::Server { status, message } => {
                write!(f, "server error ({}): {}", status, message)
            }
            ApiError::Network(message) => write!(f, "network error: {}", message),
            ApiError::Decode(message) => write!(f, "decode error: {}", message),
            ApiError::Storage(message) => write!(f, "storage error: {}", message),
            ApiError::Config(message) => write!(f, "configuration error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl ApiError {
    /// True when the failure means an identity must be supplied first.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::AuthRequired)
    }
}
