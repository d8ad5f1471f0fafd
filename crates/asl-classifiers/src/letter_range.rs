//! Inclusive alphabetic letter ranges and the file naming shared by
//! training and registry bootstrap.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AslError, Result};

/// File name of the general (all letters) model.
pub const GENERAL_MODEL_FILE: &str = "asl_model.json";

/// Model key reported when the general model served a request.
pub const GENERAL_MODEL_KEY: &str = "general";

/// An inclusive span of uppercase letters, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "(char, char)", into = "(char, char)")]
pub struct LetterRange {
    start: char,
    end: char,
}

impl LetterRange {
    pub fn new(start: char, end: char) -> Result<Self> {
        for letter in [start, end] {
            if !letter.is_ascii_uppercase() {
                return Err(AslError::InvalidLetterRange(format!(
                    "'{}' is not an uppercase letter",
                    letter
                )));
            }
        }
        if start > end {
            return Err(AslError::InvalidLetterRange(format!(
                "start letter {} comes after end letter {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn end(&self) -> char {
        self.end
    }

    /// True iff `label` is exactly one character inside the range.
    pub fn contains(&self, label: &str) -> bool {
        let mut chars = label.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.start <= c && c <= self.end,
            _ => false,
        }
    }

    /// Registry key, e.g. `A_to_F`.
    pub fn key(&self) -> String {
        format!("{}_to_{}", self.start, self.end)
    }

    /// Persisted model file name, e.g. `model_A_to_F.json`.
    pub fn file_name(&self) -> String {
        format!("model_{}.json", self.key())
    }

    pub fn letters(&self) -> impl Iterator<Item = char> {
        self.start..=self.end
    }
}

/// Location of a specialised model inside `dir`. Training writes here and
/// the registry reads from here.
pub fn specialized_model_path(dir: impl AsRef<Path>, range: &LetterRange) -> PathBuf {
    dir.as_ref().join(range.file_name())
}

/// The ranges deployed by default, in registry load order.
pub fn default_letter_ranges() -> Vec<LetterRange> {
    [('A', 'F'), ('G', 'K'), ('L', 'P'), ('Q', 'U'), ('V', 'Z')]
        .into_iter()
        .map(|(start, end)| LetterRange { start, end })
        .collect()
}

impl fmt::Display for LetterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for LetterRange {
    type Err = AslError;

    /// Accepts `A_to_F` and `A-F`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once("_to_")
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| AslError::InvalidLetterRange(format!("cannot parse '{}'", s)))?;
        let single = |part: &str| -> Result<char> {
            let mut chars = part.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c.to_ascii_uppercase()),
                _ => Err(AslError::InvalidLetterRange(format!(
                    "'{}' is not a single letter",
                    part
                ))),
            }
        };
        LetterRange::new(single(start)?, single(end)?)
    }
}

impl TryFrom<(char, char)> for LetterRange {
    type Error = AslError;

    fn try_from((start, end): (char, char)) -> Result<Self> {
        LetterRange::new(start, end)
    }
}

impl From<LetterRange> for (char, char) {
    fn from(range: LetterRange) -> Self {
        (range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_only_single_letters() {
        let range = LetterRange::new('A', 'F').unwrap();
        assert!(range.contains("A"));
        assert!(range.contains("F"));
        assert!(!range.contains("G"));
        assert!(!range.contains("del"));
        assert!(!range.contains(""));
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(LetterRange::new('F', 'A').is_err());
        assert!(LetterRange::new('a', 'f').is_err());
        assert!(LetterRange::new('A', '1').is_err());
        assert!(LetterRange::new('Q', 'Q').is_ok());
    }

    #[test]
    fn test_naming_contract() {
        let range = LetterRange::new('G', 'K').unwrap();
        assert_eq!(range.key(), "G_to_K");
        assert_eq!(
            specialized_model_path("models", &range),
            PathBuf::from("models").join("model_G_to_K.json")
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("A_to_F".parse::<LetterRange>().unwrap(), LetterRange::new('A', 'F').unwrap());
        assert_eq!("l-p".parse::<LetterRange>().unwrap(), LetterRange::new('L', 'P').unwrap());
        assert!("AB_to_C".parse::<LetterRange>().is_err());
        assert!("general".parse::<LetterRange>().is_err());
    }

    #[test]
    fn test_json_form() {
        let range: LetterRange = serde_json::from_str(r#"["V", "Z"]"#).unwrap();
        assert_eq!(range.key(), "V_to_Z");
        assert!(serde_json::from_str::<LetterRange>(r#"["Z", "V"]"#).is_err());
    }
}
