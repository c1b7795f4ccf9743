//! Error types shared by all file-source connectors.

use std::fmt;

use thiserror::Error;

/// Result type alias for file-source operations
pub type Result<T> = std::result::Result<T, Error>;

/// A classified diagnosis for one failed file-source operation.
///
/// Constructed by a connector only when the raw outcome of an operation is
/// ambiguous; the message carries the human-meaningful cause the connector
/// reconstructed (for example "no such file or directory /a/b"). Consumed
/// once by the reporting boundary and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    /// Operation name, e.g. "list directory" or "rename"
    pub operation: String,
    /// Primary path the operation targeted
    pub path: String,
    /// Second path for two-path operations (rename, copy, upload)
    pub secondary_path: Option<String>,
    /// Classified human-readable cause
    pub message: String,
}

impl OperationError {
    pub fn new(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            path: path.into(),
            secondary_path: None,
            message: message.into(),
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary_path = Some(secondary.into());
        self
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary_path {
            Some(secondary) => write!(
                f,
                "{} {} -> {}: {}",
                self.operation, self.path, secondary, self.message
            ),
            None => write!(f, "{} {}: {}", self.operation, self.path, self.message),
        }
    }
}

/// File-source error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unrecognized configuration; fatal, never retried locally
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication was attempted and failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An operation failed with a classified diagnosis
    #[error("{0}")]
    Operation(OperationError),

    /// Transport-level failure (connect, channel, session)
    #[error("connection error: {0}")]
    Connection(String),

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a classified operation error.
    pub fn operation(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Operation(OperationError::new(operation, path, message))
    }

    /// Whether this error means the configuration itself is unusable and
    /// retrying with the same configuration can never succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_display_single_path() {
        let err = OperationError::new("list directory", "/srv", "permission denied reading /srv");
        assert_eq!(
            err.to_string(),
            "list directory /srv: permission denied reading /srv"
        );
    }

    #[test]
    fn operation_error_display_two_paths() {
        let err = OperationError::new("rename", "/a", "unknown error moving /a to /b")
            .with_secondary("/b");
        assert_eq!(err.to_string(), "rename /a -> /b: unknown error moving /a to /b");
    }

    #[test]
    fn config_errors_are_fatal() {
        assert!(Error::Config("unknown SFTP authentication method 'x'".into()).is_fatal());
        assert!(!Error::Authentication("rejected".into()).is_fatal());
        assert!(!Error::operation("delete file", "/x", "permission denied deleting /x").is_fatal());
    }
}
