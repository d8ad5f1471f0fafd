use std::path::Path;

use crate::data_handling::FeatureMatrix;
use crate::error::Result;
use crate::labels::LabelMapping;
use crate::stats::EvaluationReport;

/// Trainable, persistable letter classifier.
///
/// Implementations must not mutate state in `predict`: one instance is
/// shared by concurrent requests once it has been trained or loaded.
pub trait ClassifierModel: Send + Sync {
    /// Fit the model on `x` / `y` and keep `label_mapping` so predictions can
    /// be translated back to letters. With `tune_hyperparams` a
    /// cross-validated search picks the hyper-parameters before the final fit.
    fn train(
        &mut self,
        x: &FeatureMatrix,
        y: &[usize],
        label_mapping: &LabelMapping,
        tune_hyperparams: bool,
    ) -> Result<()>;

    /// Predicted letter and the model's probability estimate for it. The
    /// confidence is not calibrated and not comparable across models.
    fn predict(&self, features: &[f32]) -> Result<(String, f32)>;

    /// Probability per known class, in label mapping order.
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<(String, f32)>>;

    /// Score the model on labelled data.
    fn evaluate(&self, x: &FeatureMatrix, y: &[usize]) -> Result<EvaluationReport>;

    /// Persist parameters and label mapping to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace this instance's state with the one stored at `path`. On error
    /// the instance is left unchanged.
    fn load(&mut self, path: &Path) -> Result<()>;

    fn label_mapping(&self) -> Option<&LabelMapping>;

    fn is_trained(&self) -> bool;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
