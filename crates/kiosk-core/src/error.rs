//! Error types for the Kiosk service.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Kiosk service.
#[derive(Error, Debug)]
pub enum Error {
    /// A request parameter was missing or malformed.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the offending parameter.
        message: String,
    },

    /// Division by zero was requested.
    #[error("Division by zero is not allowed")]
    DivisionByZero,

    /// A requested file does not exist in the upload store.
    #[error("File not found: {name}")]
    FileNotFound {
        /// The requested file name.
        name: String,
    },

    /// A file name contained path separators or parent references.
    #[error("Unsafe file name: {name}")]
    UnsafeFileName {
        /// The rejected file name.
        name: String,
    },

    /// The upstream completion API call failed.
    #[error("Upstream completion error: {message}")]
    Upstream {
        /// HTTP status returned by the upstream, if any.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error was caused by bad client input.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. }
                | Self::DivisionByZero
                | Self::FileNotFound { .. }
                | Self::UnsafeFileName { .. }
        )
    }

    /// Creates an invalid parameter error with the given message.
    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates an upstream error from a status code and message.
    #[must_use]
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
