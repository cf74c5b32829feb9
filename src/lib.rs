pub mod confirm;
pub mod error;
pub mod gateways;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;
pub mod tracker;

pub use confirm::{AlwaysConfirmation, PromptConfirmation, ReviewOnly, ScriptedConfirmation};
pub use error::{ConfigError, ConfirmationError, CycleError, GatewayError};
pub use gateways::{ConfirmationSurface, IssueGateway, LanguageModel};
pub use io::{list_transcripts, pick_transcript, read_transcript};
pub use llm::{AnthropicClient, AnthropicConfig, ModelRequest, NO_NEW_INFO};
pub use models::{
    ItemDetail, ItemReference, NormalizedTranscript, ParticipantSet, ProjectKeys, Transcript,
    UpdateDecision, UpdateOutcome,
};
pub use stages::{
    AmbiguousPolicy, Extraction, Extractor, KeyAnchoring, Normalizer, Orchestrator,
    OrchestratorConfig, RunReport, extract_participants, normalize,
};
pub use tracker::{InMemoryTracker, JiraClient, JiraConfig};
