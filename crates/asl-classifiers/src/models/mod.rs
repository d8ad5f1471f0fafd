pub mod forest_classifier;
pub mod random_forest;
pub mod tuning;

pub mod classifier_trait;
pub mod factory;
