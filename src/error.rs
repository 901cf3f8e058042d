//! Domain errors for the config store and the change publisher.

use thiserror::Error;

/// Failures of the named-configuration store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration `{0}` not found")]
    NotFound(String),

    #[error("configuration `{0}` already exists")]
    AlreadyExists(String),

    #[error("invalid configuration name `{0}`")]
    InvalidName(String),

    #[error("configuration `{name}` is not valid JSON: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a "load changed files" or "dispatch" request.
///
/// Per-path HTTP failures are not errors: they come back as a failed
/// [`DispatchResult`](crate::publish::outcome::DispatchResult).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("git sync failed: {0}")]
    Sync(#[source] git2::Error),

    #[error("reading commits failed: {0}")]
    Collect(#[source] git2::Error),

    #[error("no webhook configured for `{0}`")]
    Unmapped(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PublishError {
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, PublishError::InvalidConfig(_))
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, PublishError::Sync(_))
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, PublishError::Unmapped(_))
    }
}
