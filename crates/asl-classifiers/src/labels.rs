//! Bidirectional mapping between class tokens (letters) and label indices.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AslError, Result};

/// Unique in both directions: no token and no index appears twice.
///
/// Tokens are usually single uppercase letters, but datasets may also carry
/// composite tokens such as `del` or `space`; those are kept here and only
/// filtered out by the letter-range partitioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, usize>",
    into = "BTreeMap<String, usize>"
)]
pub struct LabelMapping {
    by_letter: BTreeMap<String, usize>,
    by_index: BTreeMap<usize, String>,
}

impl LabelMapping {
    /// Build a mapping from `(token, index)` pairs.
    pub fn new<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut by_letter = BTreeMap::new();
        let mut by_index = BTreeMap::new();

        for (token, index) in pairs {
            let token = token.into();
            if token.is_empty() {
                return Err(AslError::InvalidLabelMapping(
                    "empty label token".to_string(),
                ));
            }
            if by_letter.contains_key(&token) {
                return Err(AslError::InvalidLabelMapping(format!(
                    "duplicate label token '{}'",
                    token
                )));
            }
            if let Some(existing) = by_index.get(&index) {
                return Err(AslError::InvalidLabelMapping(format!(
                    "index {} assigned to both '{}' and '{}'",
                    index, existing, token
                )));
            }
            by_letter.insert(token.clone(), index);
            by_index.insert(index, token);
        }

        Ok(Self {
            by_letter,
            by_index,
        })
    }

    /// Assign indices `0..n` to the distinct tokens in sorted order.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut distinct: Vec<String> = tokens.into_iter().map(Into::into).collect();
        distinct.sort();
        distinct.dedup();
        Self::new(distinct.into_iter().enumerate().map(|(i, t)| (t, i)))
    }

    pub fn index_of(&self, letter: &str) -> Option<usize> {
        self.by_letter.get(letter).copied()
    }

    pub fn letter_of(&self, index: usize) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn contains_index(&self, index: usize) -> bool {
        self.by_index.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.by_letter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_letter.is_empty()
    }

    /// Iterate `(token, index)` pairs in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_letter.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn letters(&self) -> Vec<String> {
        self.by_letter.keys().cloned().collect()
    }

    /// Keep only the entries whose token satisfies `keep`. Indices are
    /// preserved, so restricted mappings stay compatible with the dataset
    /// they were cut from.
    pub fn restrict<F>(&self, mut keep: F) -> LabelMapping
    where
        F: FnMut(&str) -> bool,
    {
        let by_letter: BTreeMap<String, usize> = self
            .by_letter
            .iter()
            .filter(|(token, _)| keep(token))
            .map(|(token, index)| (token.clone(), *index))
            .collect();
        let by_index = by_letter
            .iter()
            .map(|(token, index)| (*index, token.clone()))
            .collect();
        LabelMapping {
            by_letter,
            by_index,
        }
    }
}

impl TryFrom<BTreeMap<String, usize>> for LabelMapping {
    type Error = AslError;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self> {
        LabelMapping::new(map)
    }
}

impl From<LabelMapping> for BTreeMap<String, usize> {
    fn from(mapping: LabelMapping) -> Self {
        mapping.by_letter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_directions() {
        let mapping = LabelMapping::new([("A", 0), ("B", 1), ("del", 2)]).unwrap();
        assert_eq!(mapping.index_of("B"), Some(1));
        assert_eq!(mapping.letter_of(2), Some("del"));
        assert_eq!(mapping.letter_of(7), None);
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(matches!(
            LabelMapping::new([("A", 0), ("B", 0)]),
            Err(AslError::InvalidLabelMapping(_))
        ));
        assert!(LabelMapping::new([("", 0)]).is_err());
    }

    #[test]
    fn test_from_tokens_sorted() {
        let mapping = LabelMapping::from_tokens(["C", "A", "B", "A"]).unwrap();
        assert_eq!(mapping.index_of("A"), Some(0));
        assert_eq!(mapping.index_of("C"), Some(2));
    }

    #[test]
    fn test_json_validation() {
        let mapping: LabelMapping = serde_json::from_str(r#"{"A": 0, "B": 1}"#).unwrap();
        assert_eq!(mapping.letter_of(1), Some("B"));

        let dup = serde_json::from_str::<LabelMapping>(r#"{"A": 0, "B": 0}"#);
        assert!(dup.is_err());
    }
}
