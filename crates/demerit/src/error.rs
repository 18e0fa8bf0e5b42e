//! Error types for demerit.
//!
//! This module defines all error types used throughout the demerit crate,
//! separating user-facing rejections (bad scan, bad selection) from storage
//! and network failures so callers can react to each family appropriately.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for demerit operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store worker has shut down and can no longer accept jobs.
    #[error("record store worker is no longer running")]
    StoreClosed,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Intake Errors ===
    /// A scanned payload could not be parsed into the expected structure.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// Description of what went wrong.
        message: String,
    },

    /// A scanned payload carried an integrity token that does not match
    /// the identity it claims to cover.
    #[error("payload integrity check failed")]
    TamperedPayload,

    /// A violation selection or a required entry field was unusable.
    #[error("invalid selection: {message}")]
    InvalidSelection {
        /// Description of the validation failure.
        message: String,
    },

    // === Remote Errors ===
    /// The HTTP transport failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server rejected request with status {status}: {message}")]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Short preview of the response body.
        message: String,
    },

    /// The login endpoint did not hand out a token.
    #[error("login rejected: {message}")]
    LoginRejected {
        /// Server-supplied reason, when present.
        message: String,
    },

    /// A sync attempt failed; the pending records were left intact.
    #[error("sync failed for {school}: {message}")]
    SyncFailed {
        /// Origin whose batch could not be delivered.
        school: String,
        /// Description of the underlying failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for demerit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a malformed-payload error.
    #[must_use]
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create an invalid-selection error.
    #[must_use]
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            message: message.into(),
        }
    }

    /// Create a sync-failed error for the given origin.
    #[must_use]
    pub fn sync_failed(school: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SyncFailed {
            school: school.into(),
            message: message.into(),
        }
    }

    /// Create a login-rejected error.
    #[must_use]
    pub fn login_rejected(message: impl Into<String>) -> Self {
        Self::LoginRejected {
            message: message.into(),
        }
    }

    /// Check if this error is a user-facing rejection of the attempted
    /// action (nothing was persisted, nothing needs cleanup).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::TamperedPayload | Self::InvalidSelection { .. }
        )
    }

    /// Check if this error means local persistence is unavailable.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::DirectoryCreate { .. }
                | Self::StoreClosed
        )
    }

    /// Check if this error came from the remote side (transport or
    /// server), i.e. a condition a later sync attempt may clear.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ServerRejected { .. } | Self::SyncFailed { .. }
        )
    }
}
