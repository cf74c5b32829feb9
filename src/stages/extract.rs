use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::{ItemReference, NormalizedTranscript, ParticipantSet, ProjectKeys};

/// Separator between a speaker name and what they said
const SPEAKER_SEPARATOR: char = ':';

/// Everything the extractor derives from one normalized transcript
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub participants: ParticipantSet,
    pub references: BTreeSet<ItemReference>,
    /// Speakers whose lines mention each reference
    pub mentions: BTreeMap<ItemReference, BTreeSet<String>>,
}

/// Finds participants and canonical item references in normalized text
#[derive(Debug, Clone)]
pub struct Extractor {
    reference_pattern: Regex,
}

impl Extractor {
    pub fn new(keys: &ProjectKeys) -> Result<Self, ConfigError> {
        let alternatives: Vec<String> = keys.iter().map(regex::escape).collect();
        let pattern = format!(r"\b(?:{})-\d+\b", alternatives.join("|"));

        let reference_pattern = Regex::new(&pattern).map_err(|e| ConfigError::Pattern {
            key: keys.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self { reference_pattern })
    }

    /// Run all extractions over the transcript
    pub fn extract(&self, transcript: &NormalizedTranscript) -> Extraction {
        let participants = extract_participants(transcript);
        let references = self.extract_references(transcript);
        let mentions = self.attribute_mentions(transcript);

        info!(
            "Found {} participants and {} item references",
            participants.len(),
            references.len()
        );

        Extraction {
            participants,
            references,
            mentions,
        }
    }

    /// Distinct whole-word `KEY-NUMBER` tokens for the configured keys
    pub fn extract_references(&self, transcript: &NormalizedTranscript) -> BTreeSet<ItemReference> {
        self.references_in(transcript.as_str()).collect()
    }

    /// Map each reference to the speakers whose lines mention it.
    ///
    /// Lines without a speaker prefix still count as mentions in
    /// [`extract_references`](Self::extract_references) but are not attributed.
    pub fn attribute_mentions(
        &self,
        transcript: &NormalizedTranscript,
    ) -> BTreeMap<ItemReference, BTreeSet<String>> {
        let mut mentions: BTreeMap<ItemReference, BTreeSet<String>> = BTreeMap::new();

        for line in transcript.as_str().split('\n') {
            let Some(speaker) = speaker_of(line) else {
                continue;
            };
            for reference in self.references_in(line) {
                mentions
                    .entry(reference)
                    .or_default()
                    .insert(speaker.to_string());
            }
        }

        debug!("Attributed {} references to speakers", mentions.len());
        mentions
    }

    fn references_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = ItemReference> + 'a {
        self.reference_pattern
            .find_iter(text)
            .map(|m| ItemReference::from_canonical(m.as_str()))
    }
}

/// Names found before the first colon of each line, trimmed and deduplicated
pub fn extract_participants(transcript: &NormalizedTranscript) -> ParticipantSet {
    transcript
        .as_str()
        .split('\n')
        .filter_map(speaker_of)
        .map(str::to_string)
        .collect()
}

fn speaker_of(line: &str) -> Option<&str> {
    let (name, _) = line.split_once(SPEAKER_SEPARATOR)?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transcript;
    use crate::stages::normalize;

    fn keys() -> ProjectKeys {
        ProjectKeys::parse("OSC,ML").unwrap()
    }

    fn normalized(text: &str) -> NormalizedTranscript {
        normalize(&Transcript::new(text), &keys()).unwrap()
    }

    fn names(references: &BTreeSet<ItemReference>) -> Vec<&str> {
        references.iter().map(ItemReference::as_str).collect()
    }

    #[test]
    fn test_extract_participants() {
        let transcript = normalized("Alice: working on OSC-123\nno colon line\nBob: fixed ML-45");
        let participants = extract_participants(&transcript);

        let expected: ParticipantSet = ["Alice", "Bob"].iter().map(|s| s.to_string()).collect();
        assert_eq!(participants, expected);
    }

    #[test]
    fn test_participants_use_first_colon_and_trim() {
        let transcript = normalized("  Alice  : at 10:30 we synced\r\nAlice: again\n: orphan");
        let participants = extract_participants(&transcript);

        assert_eq!(participants.len(), 1);
        assert!(participants.contains("Alice"));
    }

    #[test]
    fn test_participants_are_case_sensitive() {
        let transcript = normalized("alice: hi\nAlice: hello");
        assert_eq!(extract_participants(&transcript).len(), 2);
    }

    #[test]
    fn test_extract_references_deduplicates() {
        let extractor = Extractor::new(&keys()).unwrap();
        let transcript = normalized("Alice: osc 12 then OSC-12 again\nBob: Osc-12, ml 3");

        let references = extractor.extract_references(&transcript);
        assert_eq!(names(&references), vec!["ML-3", "OSC-12"]);
    }

    #[test]
    fn test_extract_references_requires_whole_words() {
        let extractor = Extractor::new(&keys()).unwrap();
        let text = NormalizedTranscript::new("XOSC-1 OSC-2x OSC-3 ABC-4".to_string());

        let references = extractor.extract_references(&text);
        assert_eq!(names(&references), vec!["OSC-3"]);
    }

    #[test]
    fn test_extract_references_ignores_unknown_keys() {
        let extractor = Extractor::new(&ProjectKeys::parse("OSC").unwrap()).unwrap();
        let text = NormalizedTranscript::new("OSC-1 ML-2".to_string());

        assert_eq!(names(&extractor.extract_references(&text)), vec!["OSC-1"]);
    }

    #[test]
    fn test_attribute_mentions() {
        let extractor = Extractor::new(&keys()).unwrap();
        let transcript = normalized(
            "Alice: working on OSC-123\nBob: helped with osc 123 and ML-45\nOSC-9 came up too",
        );

        let mentions = extractor.attribute_mentions(&transcript);
        let osc = ItemReference::from_canonical("OSC-123");
        let ml = ItemReference::from_canonical("ML-45");

        assert_eq!(mentions[&osc].iter().collect::<Vec<_>>(), vec!["Alice", "Bob"]);
        assert_eq!(mentions[&ml].iter().collect::<Vec<_>>(), vec!["Bob"]);
        assert!(!mentions.contains_key(&ItemReference::from_canonical("OSC-9")));
    }

    #[test]
    fn test_extract_combines_results() {
        let extractor = Extractor::new(&keys()).unwrap();
        let extraction = extractor.extract(&normalized("Alice: ml 7\nBob: ML-7 done"));

        assert_eq!(extraction.participants.len(), 2);
        assert_eq!(names(&extraction.references), vec!["ML-7"]);
        assert_eq!(extraction.mentions.len(), 1);
    }
}
