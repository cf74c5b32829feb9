use thiserror::Error;

use crate::models::ItemReference;

/// Invalid run configuration. Always fatal, raised before any gateway is used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No project keys were supplied
    #[error("at least one project key is required")]
    EmptyKeySet,

    /// A key is empty or contains characters other than letters, digits and underscores
    #[error("invalid project key '{0}': expected a letter followed by letters, digits or underscores")]
    InvalidKey(String),

    /// A reference does not have the canonical `KEY-NUMBER` form for a configured key
    #[error("'{0}' is not a canonical item reference for the configured keys")]
    InvalidReference(String),

    /// A per-key rule failed to compile
    #[error("failed to compile pattern for key '{key}': {message}")]
    Pattern { key: String, message: String },
}

/// Failure reported by the issue tracker or the language model service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The tracker does not know the item
    #[error("item {0} not found")]
    NotFound(String),

    /// The request never produced a response (connection, timeout, TLS)
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status (auth, permission, quota)
    #[error("service rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body could not be understood
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

/// The confirmation surface could not obtain an answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("confirmation unavailable: {0}")]
pub struct ConfirmationError(pub String);

/// Failure of a single item's fetch/analyze/confirm/commit cycle.
///
/// A cycle error never stops the run; the orchestrator records it and moves
/// on to the next reference.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CycleError {
    #[error("fetching {reference} failed: {source}")]
    Fetch {
        reference: ItemReference,
        #[source]
        source: GatewayError,
    },

    #[error("analyzing {reference} failed: {source}")]
    Analyze {
        reference: ItemReference,
        #[source]
        source: GatewayError,
    },

    /// The model returned blank text, which is neither a proposal nor the sentinel
    #[error("language model returned an empty response for {0}")]
    AmbiguousResponse(ItemReference),

    #[error("confirming the note for {reference} failed: {source}")]
    Confirm {
        reference: ItemReference,
        #[source]
        source: ConfirmationError,
    },

    #[error("committing the note to {reference} failed: {source}")]
    Commit {
        reference: ItemReference,
        #[source]
        source: GatewayError,
    },

    /// The task running the cycle panicked or was cancelled
    #[error("cycle for {reference} aborted: {message}")]
    Aborted {
        reference: ItemReference,
        message: String,
    },
}

impl CycleError {
    /// Whether the tracker reported the item as unknown
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Fetch {
                source: GatewayError::NotFound(_),
                ..
            }
        )
    }
}
