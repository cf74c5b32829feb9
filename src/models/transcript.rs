use std::collections::BTreeSet;

/// Distinct candidate speaker names, no identity validation
pub type ParticipantSet = BTreeSet<String>;

/// Raw meeting transcript as read from its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Transcript whose item mentions have been rewritten to canonical form.
///
/// Only the normalizer creates these, so holding one means the text is
/// already a fixed point of normalization for the keys it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTranscript {
    text: String,
}

impl NormalizedTranscript {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
