//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, BackendError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Backend(BackendError::NotFound(path)) if path.is_empty() => {
            "Not found".to_string()
        }
        ApiError::Backend(BackendError::PermissionDenied(path)) => {
            format!("Access denied: {}", path)
        }
        ApiError::IsDirectory(path) => format!("Path is a directory, not a document: {}", path),
        other => other.to_string(),
    }
}
