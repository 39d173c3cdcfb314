//! Error types for `tracker_store`.
//!
//! Errors fall into three groups:
//! - validation failures raised by `check` (user-correctable)
//! - invalid arguments raised at the bind boundary (programmer errors)
//! - storage failures, propagated unmodified from `rusqlite`

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors produced by the issue store.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// One or more record invariants were violated. The message lists every
    /// violation, one per line.
    #[error("{message}")]
    Validation { message: String },

    /// Unsupported input shape or uncoercible value.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Issue not found: {id}")]
    IssueNotFound { id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tracker directory not found (create .tracker/ or set TRACKER_DIR)")]
    NotInitialized,
}

impl TrackerError {
    /// Build a validation error from a list of violation messages.
    #[must_use]
    pub fn validation(violations: &[&str]) -> Self {
        Self::Validation {
            message: violations.join("\n"),
        }
    }

    /// Classify this error for exit codes and structured output.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::Validation,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::IssueNotFound { .. } => ErrorCode::NotFound,
            Self::Database(_) => ErrorCode::Storage,
            Self::Json(_) | Self::Yaml(_) => ErrorCode::Parse,
            Self::Io(_) => ErrorCode::Io,
            Self::Config(_) | Self::NotInitialized => ErrorCode::Config,
        }
    }
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    InvalidArgument,
    NotFound,
    Storage,
    Parse,
    Io,
    Config,
}

impl ErrorCode {
    /// Process exit status used by the `trk` binary.
    #[must_use]
    pub const fn exit_status(self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::InvalidArgument => 3,
            Self::NotFound => 4,
            Self::Storage => 5,
            Self::Parse => 6,
            Self::Io => 7,
            Self::Config => 8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
            Self::Parse => "parse",
            Self::Io => "io",
            Self::Config => "config",
        }
    }
}
