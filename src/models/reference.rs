use std::collections::BTreeSet;
use std::fmt;

use crate::error::ConfigError;

/// Validated set of project keys (e.g. `OSC`, `ML`), stored uppercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectKeys {
    keys: BTreeSet<String>,
}

impl ProjectKeys {
    /// Build a key set from raw keys, compared case-insensitively.
    ///
    /// Blank entries are ignored so that `"OSC, ,ML"` is accepted; the result
    /// must still contain at least one key.
    pub fn new<I, S>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validated = BTreeSet::new();

        for raw in keys {
            let key = raw.as_ref().trim();
            if key.is_empty() {
                continue;
            }
            if !is_valid_key(key) {
                return Err(ConfigError::InvalidKey(key.to_string()));
            }
            validated.insert(key.to_ascii_uppercase());
        }

        if validated.is_empty() {
            return Err(ConfigError::EmptyKeySet);
        }

        Ok(Self { keys: validated })
    }

    /// Parse a comma-separated list such as `"OSC,ML"`
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Self::new(input.split(','))
    }

    /// Keys in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&key.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Display for ProjectKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Canonical `KEY-NUMBER` identifier of a tracked item.
///
/// Equality and ordering use the canonical string, so `OSC-10 < OSC-9`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemReference(String);

impl ItemReference {
    /// Validate a canonical reference against the configured keys
    pub fn parse(input: &str, keys: &ProjectKeys) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidReference(input.to_string());

        let (key, number) = input.rsplit_once('-').ok_or_else(invalid)?;
        let canonical_key = key == key.to_ascii_uppercase() && keys.contains(key);
        let numeric = !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());

        if canonical_key && numeric {
            Ok(Self(input.to_string()))
        } else {
            Err(invalid())
        }
    }

    /// Wrap a token the extractor has already matched against the canonical pattern
    pub(crate) fn from_canonical(token: &str) -> Self {
        Self(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_uppercased_and_deduplicated() {
        let keys = ProjectKeys::new(["osc", "OSC", "ml"]).unwrap();
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["ML", "OSC"]);
        assert!(keys.contains("osc"));
    }

    #[test]
    fn test_parse_comma_separated_keys() {
        let keys = ProjectKeys::parse(" OSC , ,ml").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.to_string(), "ML,OSC");
    }

    #[test]
    fn test_empty_key_set_is_rejected() {
        assert_eq!(ProjectKeys::parse(""), Err(ConfigError::EmptyKeySet));
        assert_eq!(
            ProjectKeys::new(Vec::<String>::new()),
            Err(ConfigError::EmptyKeySet)
        );
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        assert_eq!(
            ProjectKeys::parse("OSC,1AB"),
            Err(ConfigError::InvalidKey("1AB".to_string()))
        );
        assert_eq!(
            ProjectKeys::parse("O-SC"),
            Err(ConfigError::InvalidKey("O-SC".to_string()))
        );
    }

    #[test]
    fn test_reference_parse() {
        let keys = ProjectKeys::parse("OSC,ML").unwrap();

        let reference = ItemReference::parse("OSC-123", &keys).unwrap();
        assert_eq!(reference.as_str(), "OSC-123");

        assert!(ItemReference::parse("osc-123", &keys).is_err());
        assert!(ItemReference::parse("ABC-1", &keys).is_err());
        assert!(ItemReference::parse("OSC-", &keys).is_err());
        assert!(ItemReference::parse("OSC123", &keys).is_err());
    }

    #[test]
    fn test_reference_ordering_is_lexicographic() {
        let mut refs = vec![
            ItemReference::from_canonical("OSC-9"),
            ItemReference::from_canonical("ML-45"),
            ItemReference::from_canonical("OSC-10"),
        ];
        refs.sort();

        let ordered: Vec<&str> = refs.iter().map(ItemReference::as_str).collect();
        assert_eq!(ordered, vec!["ML-45", "OSC-10", "OSC-9"]);
    }
}
