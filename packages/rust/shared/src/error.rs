//! Error types for RosterSync.
//!
//! Library crates use [`RosterSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all RosterSync operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterSyncError {
    /// Configuration loading, validation, or missing-secret error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Spreadsheet read failure. Fatal to the run.
    #[error("sheet error: {message}")]
    Sheet { message: String },

    /// Network/HTTP error during image fetch or API calls.
    #[error("network error: {0}")]
    Network(String),

    /// Row-level schema violation (missing required field, bad type).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A fetched resource did not resolve to an image.
    #[error("image error: {url} served content type {content_type:?}")]
    InvalidImage { url: String, content_type: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Version-control operation failure (clone, checkout, commit, ...).
    #[error("git error: {message}")]
    Git { message: String },

    /// Push rejected because the remote branch moved. Fatal for this run.
    #[error("push conflict: {message}")]
    PublishConflict { message: String },

    /// Pull-request API failure. Logged by callers, never fatal.
    #[error("pull request error: {0}")]
    PullRequest(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RosterSyncError>;

impl RosterSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a sheet error from any displayable message.
    pub fn sheet(msg: impl Into<String>) -> Self {
        Self::Sheet {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a git error from any displayable message.
    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git {
            message: msg.into(),
        }
    }

    /// Create a push-conflict error from any displayable message.
    pub fn publish_conflict(msg: impl Into<String>) -> Self {
        Self::PublishConflict {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RosterSyncError::config("missing GITHUB_TOKEN");
        assert_eq!(err.to_string(), "config error: missing GITHUB_TOKEN");

        let err = RosterSyncError::sheet("HTTP 403 from values endpoint");
        assert!(err.to_string().contains("403"));

        let err = RosterSyncError::InvalidImage {
            url: "https://example.com/a".into(),
            content_type: "text/html".into(),
        };
        assert!(err.to_string().contains("text/html"));
    }
}
