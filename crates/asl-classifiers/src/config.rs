use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::letter_range::{default_letter_ranges, LetterRange, GENERAL_MODEL_FILE};

/// Central configuration for classifiers in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Seed for bootstrap sampling, feature sub-sampling and data splits.
    pub random_state: u64,

    /// Share of each class held out for validation during `train`.
    pub validation_fraction: f32,

    /// Search space used when hyperparameter tuning is requested.
    pub tuning: TuningGrid,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    RandomForest {
        n_estimators: usize,
        /// `None` grows trees until leaves are pure.
        max_depth: Option<usize>,
        min_samples_split: usize,
        /// Features each tree is grown on; `None` uses the square root of
        /// the number of non-constant features.
        max_features: Option<usize>,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::RandomForest {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

impl ModelType {
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::RandomForest { .. } => "random_forest",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random_forest" | "randomforest" | "rf" => Ok(ModelType::default()),
            _ => Err(format!(
                "Unknown model type: {}. Supported model types: random_forest",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(random_state: u64, model_type: ModelType) -> Self {
        Self {
            random_state,
            model_type,
            ..Self::default()
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            validation_fraction: 0.2,
            tuning: TuningGrid::default(),
            model_type: ModelType::default(),
        }
    }
}

/// Exhaustive hyper-parameter grid scored by stratified cross-validation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TuningGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub cv_folds: usize,
}

impl Default for TuningGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![None, Some(10), Some(20), Some(30)],
            min_samples_split: vec![2, 5, 10],
            cv_folds: 5,
        }
    }
}

impl TuningGrid {
    /// Candidate model types in grid order, keeping `max_features` from
    /// `base`.
    pub fn candidates(&self, base: &ModelType) -> Vec<ModelType> {
        let ModelType::RandomForest { max_features, .. } = base;
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    out.push(ModelType::RandomForest {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                        max_features: *max_features,
                    });
                }
            }
        }
        out
    }
}

/// Where the serving side finds persisted models. Must match the layout the
/// training side wrote.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub general_model_path: PathBuf,
    pub specialized_dir: PathBuf,
    /// Loaded in this order.
    pub letter_ranges: Vec<LetterRange>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            general_model_path: PathBuf::from("data").join(GENERAL_MODEL_FILE),
            specialized_dir: PathBuf::from("data").join("specialized"),
            letter_ranges: default_letter_ranges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size() {
        let grid = TuningGrid::default();
        assert_eq!(grid.candidates(&ModelType::default()).len(), 36);
    }

    #[test]
    fn test_model_config_json() {
        let json = serde_json::to_string(&ModelConfig::default()).unwrap();
        assert!(json.contains("RandomForest"));
        let parsed: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ModelConfig::default());
    }

    #[test]
    fn test_model_config_flat_json() {
        let cfg: ModelConfig = serde_json::from_str(
            r#"{
                "random_state": 7,
                "RandomForest": {
                    "n_estimators": 12,
                    "max_depth": 4,
                    "min_samples_split": 3,
                    "max_features": null
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.random_state, 7);
        assert_eq!(cfg.validation_fraction, ModelConfig::default().validation_fraction);
        assert_eq!(
            cfg.model_type,
            ModelType::RandomForest {
                n_estimators: 12,
                max_depth: Some(4),
                min_samples_split: 3,
                max_features: None,
            }
        );
    }

    #[test]
    fn test_model_config_serializes_flat() {
        let json = serde_json::to_value(ModelConfig::default()).unwrap();
        assert!(json.get("RandomForest").is_some());
        assert!(json.get("model_type").is_none());
        let back: ModelConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, ModelConfig::default());
    }

    #[test]
    fn test_registry_config_partial_json() {
        let cfg: RegistryConfig =
            serde_json::from_str(r#"{"letter_ranges": [["A", "C"]]}"#).unwrap();
        assert_eq!(cfg.letter_ranges.len(), 1);
        assert_eq!(cfg.specialized_dir, RegistryConfig::default().specialized_dir);
    }
}
