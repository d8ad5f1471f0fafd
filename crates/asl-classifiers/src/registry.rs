//! Process-wide set of loaded classifiers.
//!
//! The registry is built once from a [`RegistryConfig`] and is immutable
//! afterwards; share it behind an `Arc` with the request handlers.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, RegistryConfig};
use crate::letter_range::{specialized_model_path, LetterRange, GENERAL_MODEL_KEY};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::build_model;

pub type SharedModel = Arc<dyn ClassifierModel>;

/// What the registry knows about one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Loaded,
    /// Configured, but no model file was deployed.
    Missing,
    /// Configured and a file exists, but it could not be loaded.
    Failed(String),
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub general_model_loaded: bool,
    pub specialized_models: Vec<String>,
}

#[derive(Default)]
pub struct ModelRegistry {
    general: Option<SharedModel>,
    specialized: BTreeMap<String, SharedModel>,
    configured: BTreeSet<String>,
    failed: BTreeMap<String, String>,
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every model named by `config` with the default classifier.
    pub fn bootstrap(config: &RegistryConfig) -> Self {
        Self::bootstrap_with(config, || build_model(ModelConfig::default()))
    }

    /// Load every model named by `config`, creating fresh instances with
    /// `factory`.
    ///
    /// A missing or broken general model is logged and leaves the general
    /// slot empty. Specialised ranges without a file are skipped silently;
    /// ranges whose file fails to load are logged and recorded as failed.
    pub fn bootstrap_with<F>(config: &RegistryConfig, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ClassifierModel>,
    {
        let mut registry = ModelRegistry::empty();

        match load_one(&config.general_model_path, &factory) {
            Ok(model) => {
                log::info!(
                    "General model loaded successfully from {}",
                    config.general_model_path.display()
                );
                registry.general = Some(model);
            }
            Err(e) => log::error!("Error loading general model: {}", e),
        }

        for range in &config.letter_ranges {
            registry.load_range(range, &config.specialized_dir, &factory);
        }

        log::info!(
            "Model registry ready: general={}, specialised={:?}",
            registry.general.is_some(),
            registry.list_loaded_keys()
        );
        registry
    }

    fn load_range<F>(&mut self, range: &LetterRange, dir: &Path, factory: &F)
    where
        F: Fn() -> Box<dyn ClassifierModel>,
    {
        let key = range.key();
        self.configured.insert(key.clone());

        let path = specialized_model_path(dir, range);
        if !path.exists() {
            log::debug!("No specialised model for {} at {}", key, path.display());
            return;
        }

        match load_one(&path, factory) {
            Ok(model) => {
                log::info!("Specialized model {} loaded from {}", key, path.display());
                self.failed.remove(&key);
                self.specialized.insert(key, model);
            }
            Err(e) => {
                log::error!("Error loading specialized model {}: {}", key, e);
                self.failed.insert(key, e.to_string());
            }
        }
    }

    /// Install a general model directly.
    pub fn with_general(mut self, model: SharedModel) -> Self {
        self.general = Some(model);
        self
    }

    /// Install a specialised model directly under `key`.
    pub fn with_specialized(mut self, key: impl Into<String>, model: SharedModel) -> Self {
        let key = key.into();
        self.configured.insert(key.clone());
        self.failed.remove(&key);
        self.specialized.insert(key, model);
        self
    }

    pub fn get(&self, range_key: &str) -> Option<&SharedModel> {
        self.specialized.get(range_key)
    }

    pub fn get_general(&self) -> Option<&SharedModel> {
        self.general.as_ref()
    }

    pub fn list_loaded_keys(&self) -> BTreeSet<String> {
        self.specialized.keys().cloned().collect()
    }

    pub fn failed_keys(&self) -> BTreeSet<String> {
        self.failed.keys().cloned().collect()
    }

    pub fn slot_status(&self, key: &str) -> SlotStatus {
        if self.specialized.contains_key(key) {
            SlotStatus::Loaded
        } else if let Some(reason) = self.failed.get(key) {
            SlotStatus::Failed(reason.clone())
        } else if self.configured.contains(key) {
            SlotStatus::Missing
        } else {
            SlotStatus::NotConfigured
        }
    }

    /// `general` (when loaded) followed by the loaded specialised keys.
    pub fn available_models(&self) -> Vec<String> {
        self.general
            .iter()
            .map(|_| GENERAL_MODEL_KEY.to_string())
            .chain(self.specialized.keys().cloned())
            .collect()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            general_model_loaded: self.general.is_some(),
            specialized_models: self.specialized.keys().cloned().collect(),
        }
    }
}

/// Fresh instance plus `load`; only a fully loaded model is returned.
fn load_one<F>(path: &Path, factory: &F) -> crate::error::Result<SharedModel>
where
    F: Fn() -> Box<dyn ClassifierModel>,
{
    let mut model = factory();
    model.load(path)?;
    Ok(Arc::from(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = ModelRegistry::empty();
        assert!(registry.get_general().is_none());
        assert!(registry.list_loaded_keys().is_empty());
        assert!(registry.available_models().is_empty());
        assert_eq!(registry.slot_status("A_to_F"), SlotStatus::NotConfigured);
    }

    #[test]
    fn test_bootstrap_without_files_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            general_model_path: dir.path().join("asl_model.json"),
            specialized_dir: dir.path().join("specialized"),
            ..RegistryConfig::default()
        };
        let registry = ModelRegistry::bootstrap(&config);
        assert!(registry.get_general().is_none());
        assert!(registry.list_loaded_keys().is_empty());
        assert_eq!(registry.slot_status("A_to_F"), SlotStatus::Missing);
        assert!(!registry.health().general_model_loaded);
    }
}
