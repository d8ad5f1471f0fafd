pub mod input;

use anyhow::{bail, Context, Result};

use asl_classifiers::config::RegistryConfig;
use asl_classifiers::io::read_dataset;
use asl_classifiers::letter_range::GENERAL_MODEL_FILE;
use asl_classifiers::training::{
    train_all_ranges, train_general_model, train_specialized_model, TrainingOutcome,
};

use crate::util::validate_dataset_file;
use input::{TrainConfig, TrainTarget};

pub fn run_training(config: &TrainConfig) -> Result<Vec<TrainingOutcome>> {
    if config.dataset.is_empty() {
        bail!("A dataset is required: pass -d/--dataset or set \"dataset\" in the config file");
    }
    let target = config.target()?;
    validate_dataset_file(&config.dataset)?;

    let dataset = read_dataset(&config.dataset)?;
    dataset.log_summary();

    let output_dir = config.output_dir(target);
    let outcomes = match target {
        TrainTarget::General => {
            let path = output_dir.join(GENERAL_MODEL_FILE);
            vec![train_general_model(
                &dataset,
                &path,
                config.tune_hyperparams,
                &config.model,
            )?]
        }
        TrainTarget::Range(range) => vec![train_specialized_model(
            &dataset,
            &range,
            &output_dir,
            config.tune_hyperparams,
            &config.model,
        )
        .with_context(|| format!("Training the {} model failed", range.key()))?],
        TrainTarget::AllRanges => {
            let registry = RegistryConfig {
                specialized_dir: output_dir,
                letter_ranges: config.letter_ranges.clone(),
                ..RegistryConfig::default()
            };
            train_all_ranges(&dataset, &registry, config.tune_hyperparams, &config.model)?
        }
    };

    for outcome in &outcomes {
        match &outcome.validation {
            Some(report) => log::info!(
                "{}: {} samples, classes {:?}, validation accuracy {:.4}",
                outcome.model_path.display(),
                outcome.n_samples,
                outcome.classes,
                report.accuracy
            ),
            None => log::info!(
                "{}: {} samples, classes {:?}",
                outcome.model_path.display(),
                outcome.n_samples,
                outcome.classes
            ),
        }
    }
    Ok(outcomes)
}
