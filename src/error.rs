// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names where a failure happened: at the command boundary,
//! while decoding a payload, in the cache, in routing or in the local
//! block store.

use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The backend answered with its failure envelope (`ok: false`).
    #[error("{message}")]
    Gateway { command: String, message: String },

    /// The backend answered, but the payload is not the documented shape.
    #[error("Malformed payload from {command}: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The invocation itself could not be carried out.
    #[error("Command transport failed: {0}")]
    Transport(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Block {id} is a {block_type} block, only pages can be opened")]
    NotAPage { id: String, block_type: String },

    #[error("Page {page} has no child #{index}")]
    NoSuchChild { page: String, index: usize },

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Cached value for query {key} has a different type")]
    QueryTypeMismatch { key: String },

    #[error("Block store error: {0}")]
    Storage(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Builds the error for a failure envelope returned by `command`.
    pub fn gateway(command: &str, message: impl Into<String>) -> Self {
        AppError::Gateway {
            command: command.to_string(),
            message: message.into(),
        }
    }

    /// Whether the backend itself reported the failure.
    pub fn is_backend_reported(&self) -> bool {
        matches!(self, AppError::Gateway { .. })
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_display_the_backend_message_verbatim() {
        let err = AppError::gateway("get_block_command", "not found");
        assert_eq!(err.to_string(), "not found");
        assert!(err.is_backend_reported());
    }

    #[test]
    fn decode_errors_name_the_command() {
        let source = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let err = AppError::Decode {
            command: "load_configuration_command".to_string(),
            source,
        };
        assert!(err
            .to_string()
            .starts_with("Malformed payload from load_configuration_command"));
        assert!(!err.is_backend_reported());
    }
}
