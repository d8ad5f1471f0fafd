//! Routes inference requests to a specialised or the general classifier and
//! assembles a uniform [`PredictionResult`].
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AslError, Result};
use crate::landmarks::{HandDetector, HandLandmarks, LandmarkNormalizer, WristScaleNormalizer};
use crate::letter_range::GENERAL_MODEL_KEY;
use crate::models::classifier_trait::ClassifierModel;
use crate::registry::{ModelRegistry, SlotStatus};

/// Label reported when the upstream detector found no hand.
pub const NO_HAND_LABEL: &str = "no_hand";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "sign")]
    pub predicted_label: String,
    pub confidence: f32,
    #[serde(rename = "landmarks")]
    pub raw_landmarks: Vec<IndexedLandmark>,
    #[serde(rename = "has_hand")]
    pub hand_detected: bool,
    pub model_used: String,
}

impl PredictionResult {
    fn no_hand(model_key: Option<&str>) -> Self {
        Self {
            predicted_label: NO_HAND_LABEL.to_string(),
            confidence: 0.0,
            raw_landmarks: Vec::new(),
            hand_detected: false,
            model_used: model_key.unwrap_or(GENERAL_MODEL_KEY).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No usable model for the request.
    Unavailable,
    /// The request itself was malformed (e.g. wrong landmark count).
    InvalidInput,
    Internal,
}

/// Error body handed to a request-serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub kind: FailureKind,
    pub detail: String,
}

impl From<AslError> for FailureResponse {
    fn from(err: AslError) -> Self {
        let kind = match &err {
            AslError::NoModelAvailable { .. } => FailureKind::Unavailable,
            AslError::InvalidLandmarks(_) => FailureKind::InvalidInput,
            _ => FailureKind::Internal,
        };
        let detail = match kind {
            FailureKind::Internal => format!("Error processing request: {}", err),
            _ => err.to_string(),
        };
        FailureResponse { kind, detail }
    }
}

pub struct PredictionRouter {
    registry: Arc<ModelRegistry>,
    normalizer: Box<dyn LandmarkNormalizer>,
}

impl PredictionRouter {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self::with_normalizer(registry, Box::new(WristScaleNormalizer))
    }

    pub fn with_normalizer(registry: Arc<ModelRegistry>, normalizer: Box<dyn LandmarkNormalizer>) -> Self {
        Self {
            registry,
            normalizer,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Pick the specialised model for `model_key` when it is loaded, else
    /// the general model. Returns the model and the key to report.
    pub fn select(&self, model_key: Option<&str>) -> Result<(&dyn ClassifierModel, String)> {
        if let Some(key) = model_key {
            if let Some(model) = self.registry.get(key) {
                return Ok((model.as_ref(), key.to_string()));
            }
            if key != GENERAL_MODEL_KEY {
                match self.registry.slot_status(key) {
                    SlotStatus::Failed(reason) => log::warn!(
                        "Model {} failed to load at startup ({}); using general model",
                        key,
                        reason
                    ),
                    SlotStatus::Missing => {
                        log::debug!("Model {} is not deployed; using general model", key)
                    }
                    _ => log::debug!("Model {} is not configured; using general model", key),
                }
            }
        }

        self.registry
            .get_general()
            .map(|model| (model.as_ref(), GENERAL_MODEL_KEY.to_string()))
            .ok_or_else(|| AslError::NoModelAvailable {
                requested: model_key.map(str::to_string),
            })
    }

    /// Predict from pre-extracted landmarks; `None` means no hand was
    /// detected, in which case no model is invoked.
    pub fn predict_landmarks(
        &self,
        hand: Option<&HandLandmarks>,
        model_key: Option<&str>,
    ) -> Result<PredictionResult> {
        let hand = match hand {
            Some(hand) => hand,
            None => return Ok(PredictionResult::no_hand(model_key)),
        };

        let (model, model_used) = self.select(model_key)?;
        let features = self.normalizer.normalize(hand);
        let expected = self.normalizer.feature_len();
        if features.len() != expected {
            return Err(AslError::FeatureLength {
                expected,
                got: features.len(),
            });
        }
        // Extreme but finite coordinates can still overflow while scaling.
        if features.iter().any(|v| !v.is_finite()) {
            return Err(AslError::InvalidLandmarks(
                "landmarks normalise to non-finite features".to_string(),
            ));
        }
        let (label, confidence) = model.predict(&features)?;
        log::debug!(
            "Predicted {} with confidence {:.3} using {}",
            label,
            confidence,
            model_used
        );

        let raw_landmarks = hand
            .points()
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedLandmark {
                x: p.x,
                y: p.y,
                z: p.z,
                index,
            })
            .collect();

        Ok(PredictionResult {
            predicted_label: label,
            confidence,
            raw_landmarks,
            hand_detected: true,
            model_used,
        })
    }

    /// Run the external detector on `input`, then predict.
    pub fn predict_with_detector<D: HandDetector>(
        &self,
        detector: &D,
        input: &D::Input,
        model_key: Option<&str>,
    ) -> anyhow::Result<PredictionResult> {
        let hand = detector.detect(input)?;
        Ok(self.predict_landmarks(hand.as_ref(), model_key)?)
    }

    /// Like [`predict_landmarks`](Self::predict_landmarks), with errors mapped
    /// to a response body.
    pub fn respond(
        &self,
        hand: Option<&HandLandmarks>,
        model_key: Option<&str>,
    ) -> std::result::Result<PredictionResult, FailureResponse> {
        self.predict_landmarks(hand, model_key).map_err(|e| {
            log::error!("Prediction failed: {}", e);
            FailureResponse::from(e)
        })
    }
}
