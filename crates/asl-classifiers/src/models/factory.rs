use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::forest_classifier::ForestClassifier;

/// Build an untrained boxed classifier from a `ModelConfig`.
pub fn build_model(params: ModelConfig) -> Box<dyn ClassifierModel> {
    match params.model_type {
        ModelType::RandomForest { .. } => Box::new(ForestClassifier::new(params)),
    }
}
