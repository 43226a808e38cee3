//! Error types and handling for Perla Bridge
//!
//! The session client raises the specific kinds (`Connection`, `Auth`,
//! `Api`); the coordinator matches on them explicitly and surfaces a single
//! `UpdateFailed` to its own callers.

use thiserror::Error;

/// Result type alias for Perla Bridge operations
pub type Result<T> = std::result::Result<T, PerlaError>;

/// Main error type for Perla Bridge
#[derive(Debug, Error)]
pub enum PerlaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Network-level failures: connect refused, timeouts, closed session
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Credentials rejected or portal session expired
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Portal answered, but the content was unexpected or missing
    #[error("API error: {message}")]
    Api { message: String },

    /// Merged state too small to be trusted after a tick
    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    /// Unified failure surfaced by the coordinator
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl PerlaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PerlaError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        PerlaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        PerlaError::Connection {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        PerlaError::Auth {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        PerlaError::Api {
            message: message.into(),
        }
    }

    /// Create a new insufficient-data error
    pub fn insufficient_data<S: Into<String>>(message: S) -> Self {
        PerlaError::InsufficientData {
            message: message.into(),
        }
    }

    /// Create a new update-failed error
    pub fn update_failed<S: Into<String>>(message: S) -> Self {
        PerlaError::UpdateFailed {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PerlaError::Io {
            message: message.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, PerlaError::Auth { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, PerlaError::Connection { .. })
    }

    pub fn is_api(&self) -> bool {
        matches!(self, PerlaError::Api { .. })
    }
}

impl From<std::io::Error> for PerlaError {
    fn from(err: std::io::Error) -> Self {
        PerlaError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PerlaError {
    fn from(err: serde_yaml::Error) -> Self {
        PerlaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PerlaError {
    fn from(err: serde_json::Error) -> Self {
        PerlaError::Serialization {
            message: err.to_string(),
        }
    }
}
