//! Offline training entry points for specialised and general models.
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{ModelConfig, RegistryConfig};
use crate::data_handling::{partition, LabeledDataset};
use crate::error::Result;
use crate::letter_range::{specialized_model_path, LetterRange};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::forest_classifier::ForestClassifier;
use crate::stats::EvaluationReport;

#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub model_path: PathBuf,
    pub n_samples: usize,
    /// Letters the model can predict.
    pub classes: Vec<String>,
    /// Hold-out report, when the data allowed a validation split.
    pub validation: Option<EvaluationReport>,
}

/// Partition `dataset` to `range`, train a classifier on it and save it as
/// `output_dir/model_<S>_to_<E>.json`.
pub fn train_specialized_model(
    dataset: &LabeledDataset,
    range: &LetterRange,
    output_dir: &Path,
    tune_hyperparams: bool,
    config: &ModelConfig,
) -> Result<TrainingOutcome> {
    let subset = partition(dataset, range)?;
    log::info!(
        "Training specialized model for letters {} to {}",
        range.start(),
        range.end()
    );

    let mut model = ForestClassifier::new(config.clone());
    model.train(
        &subset.features,
        &subset.labels,
        &subset.label_mapping,
        tune_hyperparams,
    )?;

    let model_path = specialized_model_path(output_dir, range);
    model.save(&model_path)?;
    log::info!(
        "Specialized model trained and saved to {}",
        model_path.display()
    );

    Ok(TrainingOutcome {
        model_path,
        n_samples: subset.len(),
        classes: subset.label_mapping.letters(),
        validation: model.validation_report().cloned(),
    })
}

/// Train on every class of `dataset` and save to `output_path`.
pub fn train_general_model(
    dataset: &LabeledDataset,
    output_path: &Path,
    tune_hyperparams: bool,
    config: &ModelConfig,
) -> Result<TrainingOutcome> {
    log::info!("Training general model on {} samples", dataset.len());

    let mut model = ForestClassifier::new(config.clone());
    model.train(
        &dataset.features,
        &dataset.labels,
        &dataset.label_mapping,
        tune_hyperparams,
    )?;
    model.save(output_path)?;

    Ok(TrainingOutcome {
        model_path: output_path.to_path_buf(),
        n_samples: dataset.len(),
        classes: dataset.label_mapping.letters(),
        validation: model.validation_report().cloned(),
    })
}

/// Train every configured range into `registry.specialized_dir`. Stops at
/// the first failure.
pub fn train_all_ranges(
    dataset: &LabeledDataset,
    registry: &RegistryConfig,
    tune_hyperparams: bool,
    config: &ModelConfig,
) -> Result<Vec<TrainingOutcome>> {
    registry
        .letter_ranges
        .iter()
        .map(|range| {
            train_specialized_model(
                dataset,
                range,
                &registry.specialized_dir,
                tune_hyperparams,
                config,
            )
        })
        .collect()
}
