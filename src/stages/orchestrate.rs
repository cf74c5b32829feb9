use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::error::CycleError;
use crate::gateways::{ConfirmationSurface, IssueGateway, LanguageModel};
use crate::llm::{build_update_request, interpret_response};
use crate::models::{
    CycleState, ItemReference, NormalizedTranscript, UpdateDecision, UpdateOutcome, format_note,
};

/// What to do when the model returns blank text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguousPolicy {
    /// Treat it as "no new information" and log a warning
    #[default]
    Skip,
    /// Fail the item's cycle with [`CycleError::AmbiguousResponse`]
    Fail,
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub ambiguous_policy: AmbiguousPolicy,
    /// How many items are fetched and analyzed at once (1 = sequential)
    pub analysis_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ambiguous_policy: AmbiguousPolicy::Skip,
            analysis_concurrency: 1,
        }
    }
}

/// Result of one item's cycle
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub reference: ItemReference,
    pub result: Result<UpdateOutcome, CycleError>,
}

/// Per-item results of a run, in processing order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub items: Vec<ItemReport>,
}

impl RunReport {
    fn record(&mut self, reference: ItemReference, result: Result<UpdateOutcome, CycleError>) {
        self.items.push(ItemReport { reference, result });
    }

    /// Result recorded for `reference`, if it was processed
    pub fn result(&self, reference: &ItemReference) -> Option<&Result<UpdateOutcome, CycleError>> {
        self.items
            .iter()
            .find(|item| &item.reference == reference)
            .map(|item| &item.result)
    }

    pub fn count(&self, outcome: UpdateOutcome) -> usize {
        self.items
            .iter()
            .filter(|item| item.result.as_ref().is_ok_and(|o| *o == outcome))
            .count()
    }

    pub fn committed(&self) -> usize {
        self.count(UpdateOutcome::Committed)
    }

    pub fn declined(&self) -> usize {
        self.count(UpdateOutcome::Declined)
    }

    pub fn skipped(&self) -> usize {
        self.count(UpdateOutcome::SkippedNoUpdate)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CycleError> {
        self.items.iter().filter_map(|item| item.result.as_ref().err())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

/// Drives the fetch → analyze → confirm → commit cycle for each item
/// reference. The only component that talks to the gateways.
pub struct Orchestrator {
    issues: Arc<dyn IssueGateway>,
    model: Arc<dyn LanguageModel>,
    confirmation: Arc<dyn ConfirmationSurface>,
    config: OrchestratorConfig,
    mentions: BTreeMap<ItemReference, BTreeSet<String>>,
}

impl Orchestrator {
    pub fn new(
        issues: Arc<dyn IssueGateway>,
        model: Arc<dyn LanguageModel>,
        confirmation: Arc<dyn ConfirmationSurface>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            issues,
            model,
            confirmation,
            config,
            mentions: BTreeMap::new(),
        }
    }

    /// Speakers who raised each item, shown when its note is reviewed
    pub fn with_mentions(mut self, mentions: BTreeMap<ItemReference, BTreeSet<String>>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Process every reference once, in lexicographic order.
    ///
    /// Never fails as a whole: per-item failures are logged and recorded in
    /// the report, and the run moves on.
    pub async fn run(
        &self,
        transcript: &NormalizedTranscript,
        references: &BTreeSet<ItemReference>,
    ) -> RunReport {
        let ordered: Vec<ItemReference> = references.iter().cloned().collect();
        let batch_size = self.config.analysis_concurrency.max(1);
        let transcript = Arc::new(transcript.clone());

        info!(
            "Processing {} item references (analysis concurrency {})",
            ordered.len(),
            batch_size
        );

        let mut report = RunReport::default();

        for batch in ordered.chunks(batch_size) {
            let analyses = self.analyze_batch(batch, &transcript).await;

            // Confirmation and commit stay sequential and ordered
            for (reference, analysis) in batch.iter().zip(analyses) {
                let result = match analysis {
                    Ok(decision) => self.settle(reference, decision).await,
                    Err(e) => Err(e),
                };
                log_result(reference, &result);
                report.record(reference.clone(), result);
            }
        }

        info!(
            "Run complete: {} committed, {} declined, {} without new information, {} failed",
            report.committed(),
            report.declined(),
            report.skipped(),
            report.failed()
        );

        report
    }

    /// Fetch and analyze a batch, concurrently when it holds more than one item
    async fn analyze_batch(
        &self,
        batch: &[ItemReference],
        transcript: &Arc<NormalizedTranscript>,
    ) -> Vec<Result<UpdateDecision, CycleError>> {
        let policy = self.config.ambiguous_policy;

        if let [reference] = batch {
            let result = analyze(
                self.issues.as_ref(),
                self.model.as_ref(),
                reference,
                transcript,
                policy,
            )
            .await;
            return vec![result];
        }

        let mut tasks = JoinSet::new();
        for (index, reference) in batch.iter().enumerate() {
            let issues = Arc::clone(&self.issues);
            let model = Arc::clone(&self.model);
            let transcript = Arc::clone(transcript);
            let reference = reference.clone();

            tasks.spawn(async move {
                let result =
                    analyze(issues.as_ref(), model.as_ref(), &reference, &transcript, policy).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<UpdateDecision, CycleError>>> = vec![None; batch.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("Analysis task did not complete: {}", e),
            }
        }

        batch
            .iter()
            .zip(results)
            .map(|(reference, result)| {
                result.unwrap_or_else(|| {
                    Err(CycleError::Aborted {
                        reference: reference.clone(),
                        message: "analysis task panicked or was cancelled".to_string(),
                    })
                })
            })
            .collect()
    }

    /// Turn a decision into an outcome: confirm, then commit if accepted
    async fn settle(
        &self,
        reference: &ItemReference,
        decision: UpdateDecision,
    ) -> Result<UpdateOutcome, CycleError> {
        let content = match decision {
            UpdateDecision::NoUpdate => return Ok(finish(reference, CycleState::NoUpdate)),
            UpdateDecision::Proposed(content) => content,
        };
        transition(reference, CycleState::Proposed);

        let note = format_note(&content);
        if let Some(speakers) = self.mentions.get(reference) {
            let names: Vec<&str> = speakers.iter().map(String::as_str).collect();
            info!("{} was raised by {}", reference, names.join(", "));
        }

        transition(reference, CycleState::AwaitingConfirmation);
        if !self.confirm(reference, &note).await? {
            return Ok(finish(reference, CycleState::Declined));
        }

        self.issues
            .append_comment(reference, &note)
            .await
            .map_err(|source| CycleError::Commit {
                reference: reference.clone(),
                source,
            })?;

        Ok(finish(reference, CycleState::Committed))
    }

    /// Ask the confirmation surface on the blocking pool
    async fn confirm(&self, reference: &ItemReference, note: &str) -> Result<bool, CycleError> {
        let surface = Arc::clone(&self.confirmation);
        let shown = reference.clone();
        let note = note.to_string();

        tokio::task::spawn_blocking(move || surface.confirm(&shown, &note))
            .await
            .map_err(|e| CycleError::Aborted {
                reference: reference.clone(),
                message: e.to_string(),
            })?
            .map_err(|source| CycleError::Confirm {
                reference: reference.clone(),
                source,
            })
    }
}

/// Fetch the item and ask the model whether the transcript adds anything
#[instrument(skip_all, fields(reference = %reference))]
async fn analyze(
    issues: &dyn IssueGateway,
    model: &dyn LanguageModel,
    reference: &ItemReference,
    transcript: &NormalizedTranscript,
    policy: AmbiguousPolicy,
) -> Result<UpdateDecision, CycleError> {
    let detail = issues
        .fetch_detail(reference)
        .await
        .map_err(|source| CycleError::Fetch {
            reference: reference.clone(),
            source,
        })?;
    transition(reference, CycleState::Fetched);

    let request = build_update_request(reference, &detail, transcript);
    let response = model
        .respond(&request)
        .await
        .map_err(|source| CycleError::Analyze {
            reference: reference.clone(),
            source,
        })?;
    transition(reference, CycleState::Analyzed);

    match interpret_response(&response) {
        Some(decision) => Ok(decision),
        None => match policy {
            AmbiguousPolicy::Skip => {
                warn!(
                    "Blank model response for {}, treating it as no new information",
                    reference
                );
                Ok(UpdateDecision::NoUpdate)
            }
            AmbiguousPolicy::Fail => Err(CycleError::AmbiguousResponse(reference.clone())),
        },
    }
}

fn transition(reference: &ItemReference, state: CycleState) {
    debug!("{} -> {:?}", reference, state);
}

/// Enter a terminal state and return its outcome
fn finish(reference: &ItemReference, state: CycleState) -> UpdateOutcome {
    transition(reference, state);
    state.outcome().unwrap_or(UpdateOutcome::Declined)
}

fn log_result(reference: &ItemReference, result: &Result<UpdateOutcome, CycleError>) {
    match result {
        Ok(UpdateOutcome::Committed) => info!("Comment added to {}", reference),
        Ok(UpdateOutcome::Declined) => info!("Skipped adding comment to {}", reference),
        Ok(UpdateOutcome::SkippedNoUpdate) => info!("No new information for {}", reference),
        Err(e) if e.is_not_found() => warn!("{}", e),
        Err(e) => error!("{}", e),
    }
}
