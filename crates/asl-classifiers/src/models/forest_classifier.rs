use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::ModelConfig;
use crate::data_handling::{stratified_split, FeatureMatrix};
use crate::error::{AslError, Result};
use crate::labels::LabelMapping;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::random_forest::RandomForest;
use crate::models::tuning::grid_search;
use crate::stats::EvaluationReport;

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 1;

const MODEL_TYPE: &str = "random_forest";

#[derive(Serialize)]
struct PersistedModelRef<'a> {
    format_version: u32,
    model_type: &'a str,
    config: &'a ModelConfig,
    label_mapping: &'a LabelMapping,
    forest: &'a RandomForest,
}

#[derive(Deserialize)]
struct PersistedModel {
    format_version: u32,
    model_type: String,
    config: ModelConfig,
    label_mapping: LabelMapping,
    forest: RandomForest,
}

#[derive(Debug, Clone)]
struct Trained {
    forest: RandomForest,
    label_mapping: LabelMapping,
}

/// Random-forest letter classifier that owns the label mapping it was
/// trained with.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    config: ModelConfig,
    state: Option<Trained>,
    validation: Option<EvaluationReport>,
}

impl ForestClassifier {
    pub fn new(config: ModelConfig) -> Self {
        ForestClassifier {
            config,
            state: None,
            validation: None,
        }
    }

    /// Effective configuration; after tuning or loading it holds the
    /// hyper-parameters the forest was actually grown with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Hold-out report of the last `train` call, if a validation split was
    /// possible.
    pub fn validation_report(&self) -> Option<&EvaluationReport> {
        self.validation.as_ref()
    }

    /// Mean impurity decrease per feature, summing to one.
    pub fn feature_importance(&self) -> Result<Vec<f32>> {
        let state = self.trained()?;
        Ok(state.forest.feature_importances().to_vec())
    }

    pub fn n_features(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.forest.n_features())
    }

    fn trained(&self) -> Result<&Trained> {
        self.state.as_ref().ok_or(AslError::NotTrained)
    }

    fn check_len(state: &Trained, features: &[f32]) -> Result<()> {
        let expected = state.forest.n_features();
        if features.len() != expected {
            return Err(AslError::FeatureLength {
                expected,
                got: features.len(),
            });
        }
        Ok(())
    }

    fn validate_training_input(x: &FeatureMatrix, y: &[usize], label_mapping: &LabelMapping) -> Result<()> {
        if x.n_samples() != y.len() {
            return Err(AslError::Training(format!(
                "features and labels differ in length ({} vs {})",
                x.n_samples(),
                y.len()
            )));
        }
        if let Some(missing) = y.iter().find(|&&label| !label_mapping.contains_index(label)) {
            return Err(AslError::Training(format!(
                "label index {} has no entry in the label mapping",
                missing
            )));
        }
        let mut distinct = y.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(AslError::Training(format!(
                "need at least 2 distinct classes, found {}",
                distinct.len()
            )));
        }
        Ok(())
    }
}

impl ClassifierModel for ForestClassifier {
    fn train(
        &mut self,
        x: &FeatureMatrix,
        y: &[usize],
        label_mapping: &LabelMapping,
        tune_hyperparams: bool,
    ) -> Result<()> {
        Self::validate_training_input(x, y, label_mapping)?;

        let seed = self.config.random_state;
        let (train_idx, val_idx) = stratified_split(y, self.config.validation_fraction, seed);
        let x_train = x.select_rows(&train_idx);
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
        log::info!(
            "Training on {} samples, validating on {}",
            train_idx.len(),
            val_idx.len()
        );

        if tune_hyperparams {
            if let Some(outcome) = grid_search(&x_train, &y_train, &self.config)? {
                log::info!(
                    "Best parameters: {:?} (mean CV accuracy {:.4})",
                    outcome.best,
                    outcome.score
                );
                self.config.model_type = outcome.best;
            }
        }

        let forest = RandomForest::fit(&x_train, &y_train, &self.config.model_type, seed)?;

        self.validation = if val_idx.is_empty() {
            log::warn!("Too few samples per class for a validation split");
            None
        } else {
            let truth: Vec<usize> = val_idx.iter().map(|&i| y[i]).collect();
            let predicted = forest.predict_matrix(&x.select_rows(&val_idx));
            let report = EvaluationReport::new(&truth, &predicted, label_mapping);
            log::info!("Validation accuracy: {:.4}", report.accuracy);
            log::debug!("Classification report:\n{}", report);
            Some(report)
        };

        self.state = Some(Trained {
            forest,
            label_mapping: label_mapping.clone(),
        });
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<(String, f32)> {
        let state = self.trained()?;
        Self::check_len(state, features)?;

        let (index, confidence) = state.forest.predict(features);
        let label = state
            .label_mapping
            .letter_of(index)
            .ok_or(AslError::UnknownLabel(index))?;
        Ok((label.to_string(), confidence))
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<(String, f32)>> {
        let state = self.trained()?;
        Self::check_len(state, features)?;

        let proba = state.forest.predict_proba(features);
        let mut out = Vec::with_capacity(state.label_mapping.len());
        for (token, index) in state.label_mapping.iter() {
            let p = state
                .forest
                .classes()
                .binary_search(&index)
                .map(|pos| proba[pos])
                .unwrap_or(0.0);
            out.push((token.to_string(), p));
        }
        Ok(out)
    }

    fn evaluate(&self, x: &FeatureMatrix, y: &[usize]) -> Result<EvaluationReport> {
        let state = self.trained()?;
        if x.n_samples() != y.len() {
            return Err(AslError::Dataset(format!(
                "{} feature rows but {} labels",
                x.n_samples(),
                y.len()
            )));
        }
        if x.n_samples() > 0 {
            Self::check_len(state, x.row(0))?;
        }
        let predicted = state.forest.predict_matrix(x);
        let report = EvaluationReport::new(y, &predicted, &state.label_mapping);
        log::info!("Test accuracy: {:.4}", report.accuracy);
        Ok(report)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let state = self.trained()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let document = PersistedModelRef {
            format_version: FORMAT_VERSION,
            model_type: MODEL_TYPE,
            config: &self.config,
            label_mapping: &state.label_mapping,
            forest: &state.forest,
        };
        let bytes = serde_json::to_vec(&document)?;

        // Write next to the target and rename, so readers never see a
        // half-written model.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| AslError::Io(e.error))?;

        log::info!("Model saved to {}", path.display());
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let bytes = fs::read(path).map_err(|e| AslError::model_load(path, e))?;
        let document: PersistedModel = serde_json::from_slice(&bytes)
            .map_err(|e| AslError::model_load(path, format!("corrupt model file: {}", e)))?;

        if document.format_version != FORMAT_VERSION {
            return Err(AslError::model_load(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    document.format_version, FORMAT_VERSION
                ),
            ));
        }
        if document.model_type != MODEL_TYPE {
            return Err(AslError::model_load(
                path,
                format!("unsupported model type '{}'", document.model_type),
            ));
        }
        document
            .forest
            .validate()
            .map_err(|e| AslError::model_load(path, e))?;
        if let Some(class) = document
            .forest
            .classes()
            .iter()
            .find(|&&c| !document.label_mapping.contains_index(c))
        {
            return Err(AslError::model_load(
                path,
                format!("class {} missing from the stored label mapping", class),
            ));
        }

        log::info!(
            "Model loaded from {} ({} trees, labels {:?})",
            path.display(),
            document.forest.n_trees(),
            document.label_mapping.letters()
        );

        self.config = document.config;
        self.validation = None;
        self.state = Some(Trained {
            forest: document.forest,
            label_mapping: document.label_mapping,
        });
        Ok(())
    }

    fn label_mapping(&self) -> Option<&LabelMapping> {
        self.state.as_ref().map(|s| &s.label_mapping)
    }

    fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &str {
        MODEL_TYPE
    }
}
