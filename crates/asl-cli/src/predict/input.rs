use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;

use asl_classifiers::config::RegistryConfig;

use crate::util::load_registry_config;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub landmarks_file: PathBuf,
    pub model_key: Option<String>,
    pub registry: RegistryConfig,
}

impl PredictConfig {
    pub fn from_arguments(landmarks_file: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let registry = load_registry_config(matches.get_one::<PathBuf>("registry"))?;
        Ok(PredictConfig {
            landmarks_file: landmarks_file.clone(),
            model_key: matches.get_one::<String>("model").cloned(),
            registry,
        })
    }
}

/// Read one hand from a JSON file: an array of `[x, y, z]` triples, or
/// `null` when no hand was detected. The point count is checked when the
/// triples are turned into `HandLandmarks`.
pub fn read_landmarks<P: AsRef<Path>>(path: P) -> Result<Option<Vec<[f32; 3]>>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read landmarks file: {}", path.display()))?;
    let hand: Option<Vec<[f32; 3]>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse landmarks file: {}", path.display()))?;
    Ok(hand)
}
