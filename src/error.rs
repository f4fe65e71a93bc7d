//! Error types for the docforest source and tree services.

use thiserror::Error;

/// Errors raised by a source backend (local directory or git snapshot).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Missing path, ref, or object. Safe to report to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The path escapes the declared root; rejected before dispatch.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The tool is missing or the transport failed.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend produced text in a shape we could not parse.
    #[error("Malformed backend output: {0}")]
    MalformedOutput(String),
}

impl BackendError {
    /// True for errors that mean "nothing lives at this path".
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// Map a host filesystem error onto the backend taxonomy.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
            _ => BackendError::Unavailable(format!("{}: {}", path, err)),
        }
    }
}

/// Service-level errors surfaced by configuration, document access, watching
/// and the live channel.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Path is a directory: {0}")]
    IsDirectory(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Live channel error: {0}")]
    LiveError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<notify::Error> for ApiError {
    fn from(err: notify::Error) -> Self {
        ApiError::WatchError(err.to_string())
    }
}
