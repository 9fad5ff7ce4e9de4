//! Error taxonomy for catalog fetches.
//!
//! Transport failures and malformed payloads are both caught at the fetch
//! boundary and folded into [`CatalogError`]. The store turns them into a
//! human-readable message on its published state; rendering code never sees
//! the error as a panic or an unwinding signal.

use serde::Serialize;
use thiserror::Error;

/// Errors produced while fetching or decoding the remote catalog.
///
/// The type is `Clone` because a single coalesced fetch hands its outcome to
/// every caller that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("could not reach the catalog service ({resource}): {message}")]
    Transport { resource: String, message: String },

    /// The service answered with a non-success status code.
    #[error("catalog service returned {status} for {resource}")]
    Status { resource: String, status: u16 },

    /// The response body did not match the expected shape.
    #[error("catalog service sent an unreadable {resource} payload: {message}")]
    Decode { resource: String, message: String },

    /// The fetch task ended without producing an outcome.
    #[error("catalog fetch was interrupted: {0}")]
    Interrupted(String),
}

impl CatalogError {
    pub fn transport(resource: impl Into<String>, error: impl std::fmt::Display) -> Self {
        CatalogError::Transport {
            resource: resource.into(),
            message: error.to_string(),
        }
    }

    pub fn decode(resource: impl Into<String>, error: impl std::fmt::Display) -> Self {
        CatalogError::Decode {
            resource: resource.into(),
            message: error.to_string(),
        }
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            CatalogError::Transport { .. } => "transport",
            CatalogError::Status { .. } => "status",
            CatalogError::Decode { .. } => "decode",
            CatalogError::Interrupted(_) => "interrupted",
        }
    }

    /// The message consumers display next to a retry affordance.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Serializable error view placed on [`crate::store::CatalogState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorState {
    pub category: &'static str,
    pub message: String,
}

impl From<&CatalogError> for ErrorState {
    fn from(error: &CatalogError) -> Self {
        Self {
            category: error.category(),
            message: error.user_message(),
        }
    }
}

impl std::fmt::Display for ErrorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
