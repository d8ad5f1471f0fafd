use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use asl_classifiers::config::ModelConfig;
use asl_classifiers::letter_range::{default_letter_ranges, LetterRange};

/// What a training run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainTarget {
    General,
    Range(LetterRange),
    AllRanges,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrainConfig {
    pub version: String,
    /// Labelled landmark dataset (.json, .csv or .tsv).
    pub dataset: String,
    /// Defaults to `data` for the general model and `data/specialized`
    /// otherwise.
    pub output_dir: Option<String>,
    pub start_letter: Option<char>,
    pub end_letter: Option<char>,
    pub all_ranges: bool,
    pub tune_hyperparams: bool,
    pub letter_ranges: Vec<LetterRange>,
    pub model: ModelConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            version: clap::crate_version!().to_string(),
            dataset: String::new(),
            output_dir: None,
            start_letter: None,
            end_letter: None,
            all_ranges: false,
            tune_hyperparams: false,
            letter_ranges: default_letter_ranges(),
            model: ModelConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => TrainConfig::default(),
        };

        // Apply CLI overrides
        if let Some(dataset) = matches.get_one::<String>("dataset") {
            config.dataset = dataset.clone();
        }
        if let Some(output_dir) = matches.get_one::<String>("output_dir") {
            config.output_dir = Some(output_dir.clone());
        }
        if let Some(start) = matches.get_one::<char>("start_letter") {
            config.start_letter = Some(start.to_ascii_uppercase());
        }
        if let Some(end) = matches.get_one::<char>("end_letter") {
            config.end_letter = Some(end.to_ascii_uppercase());
        }
        if matches.get_flag("all_ranges") {
            config.all_ranges = true;
        }
        if matches.get_flag("tune_hyperparams") {
            config.tune_hyperparams = true;
        }

        Ok(config)
    }

    /// Read a JSON config, keeping the default for any field that is missing
    /// or invalid.
    pub fn from_file(config_path: &PathBuf) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let partial: serde_json::Value = serde_json::from_str(&config_json)?;
        let mut config = TrainConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$field = parsed;
                    } else {
                        log::warn!(
                            "Config Invalid value for '{}', using default: {:?}",
                            stringify!($field),
                            config.$field
                        );
                    }
                } else {
                    log::debug!(
                        "Config Missing field '{}', using default: {:?}",
                        stringify!($field),
                        config.$field
                    );
                }
            };
        }

        load_or_default!(dataset);
        load_or_default!(output_dir);
        load_or_default!(start_letter);
        load_or_default!(end_letter);
        load_or_default!(all_ranges);
        load_or_default!(tune_hyperparams);
        load_or_default!(letter_ranges);
        load_or_default!(model);

        Ok(config)
    }

    pub fn target(&self) -> Result<TrainTarget> {
        match (self.start_letter, self.end_letter, self.all_ranges) {
            (None, None, false) => Ok(TrainTarget::General),
            (None, None, true) => Ok(TrainTarget::AllRanges),
            (Some(start), Some(end), false) => Ok(TrainTarget::Range(LetterRange::new(start, end)?)),
            (Some(_), Some(_), true) => {
                bail!("--all-ranges cannot be combined with --start-letter/--end-letter")
            }
            _ => bail!("--start-letter and --end-letter must be given together"),
        }
    }

    pub fn output_dir(&self, target: TrainTarget) -> PathBuf {
        match (&self.output_dir, target) {
            (Some(dir), _) => PathBuf::from(dir),
            (None, TrainTarget::General) => PathBuf::from("data"),
            (None, _) => PathBuf::from("data").join("specialized"),
        }
    }
}
