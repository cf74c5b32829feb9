use std::fmt;

/// Header line of every committed stand-up note
pub const NOTE_HEADER: &str = "Stand-up update:";

/// Snapshot of a tracked item, fetched once per cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetail {
    /// One-line summary
    pub summary: String,
    /// Long description, empty when the tracker has none
    pub description: String,
    /// Existing comment bodies, oldest first
    pub comments: Vec<String>,
}

impl ItemDetail {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            comments: Vec::new(),
        }
    }

    pub fn with_comments<I, S>(mut self, comments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comments = comments.into_iter().map(Into::into).collect();
        self
    }
}

/// What the language model said about one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// The model found nothing new
    NoUpdate,
    /// The model proposes this note content
    Proposed(String),
}

/// Terminal result of one item's cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Committed,
    Declined,
    SkippedNoUpdate,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Committed => "committed",
            Self::Declined => "declined",
            Self::SkippedNoUpdate => "no new information",
        };
        f.write_str(label)
    }
}

/// States an item moves through during its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Fetched,
    Analyzed,
    NoUpdate,
    Proposed,
    AwaitingConfirmation,
    Committed,
    Declined,
}

impl CycleState {
    /// The outcome a terminal state maps to, `None` while the cycle is still running
    pub fn outcome(self) -> Option<UpdateOutcome> {
        match self {
            Self::NoUpdate => Some(UpdateOutcome::SkippedNoUpdate),
            Self::Committed => Some(UpdateOutcome::Committed),
            Self::Declined => Some(UpdateOutcome::Declined),
            Self::Fetched | Self::Analyzed | Self::Proposed | Self::AwaitingConfirmation => None,
        }
    }
}

/// Render proposed content into the committed note format
pub fn format_note(content: &str) -> String {
    format!("{NOTE_HEADER}\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_note() {
        assert_eq!(
            format_note("Deployed to staging"),
            "Stand-up update:\nDeployed to staging"
        );
    }

    #[test]
    fn test_format_note_keeps_content_verbatim() {
        let content = "  - blocked on review\n  - ETA Friday  ";
        assert_eq!(format_note(content), format!("Stand-up update:\n{content}"));
    }

    #[test]
    fn test_terminal_states() {
        assert_eq!(
            CycleState::NoUpdate.outcome(),
            Some(UpdateOutcome::SkippedNoUpdate)
        );
        assert_eq!(CycleState::Committed.outcome(), Some(UpdateOutcome::Committed));
        assert_eq!(CycleState::Declined.outcome(), Some(UpdateOutcome::Declined));
        assert_eq!(CycleState::AwaitingConfirmation.outcome(), None);
    }
}
