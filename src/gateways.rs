use async_trait::async_trait;

use crate::error::{ConfirmationError, GatewayError};
use crate::llm::ModelRequest;
use crate::models::{ItemDetail, ItemReference};

/// Issue tracker boundary: read an item, append a note to it
#[async_trait]
pub trait IssueGateway: Send + Sync {
    /// Fetch the item's summary, description and comments.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when the tracker does not know the
    /// reference, or another [`GatewayError`] for transport and auth failures.
    async fn fetch_detail(&self, reference: &ItemReference) -> Result<ItemDetail, GatewayError>;

    /// Append `text` as a new comment on the item
    async fn append_comment(&self, reference: &ItemReference, text: &str)
    -> Result<(), GatewayError>;
}

/// Language model boundary.
///
/// Implementations always return text; the orchestrator alone decides what
/// the text means.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn respond(&self, request: &ModelRequest) -> Result<String, GatewayError>;
}

/// Human gate in front of every remote mutation.
///
/// Synchronous: implementations may block on a terminal. The orchestrator
/// never calls it from two places at once.
pub trait ConfirmationSurface: Send + Sync {
    /// Show the note proposed for `reference` and return whether to commit it
    fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, ConfirmationError>;
}
