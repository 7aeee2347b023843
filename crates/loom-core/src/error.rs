//! Error types for the Loom assistant core

use thiserror::Error;

/// Result type alias for assistant operations
pub type AssistResult<T> = Result<T, AssistError>;

/// Errors that abort a request or a host operation.
///
/// Malformed protocol records, stale responses and rejected sends are not
/// represented here: they are recovered or ignored where they occur.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Transport returned non-success status {0}")]
    TransportStatus(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No credential available")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistError {
    /// True for failures that happened on the wire (open or mid-stream).
    pub fn is_transport(&self) -> bool {
        matches!(self, AssistError::TransportStatus(_) | AssistError::Transport(_))
    }
}

impl From<config::ConfigError> for AssistError {
    fn from(err: config::ConfigError) -> Self {
        AssistError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AssistError::TransportStatus(status.as_u16()),
            None => AssistError::Transport(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for AssistError {
    fn from(err: toml::de::Error) -> Self {
        AssistError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AssistError {
    fn from(err: toml::ser::Error) -> Self {
        AssistError::Serialization(err.to_string())
    }
}
