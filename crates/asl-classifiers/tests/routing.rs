//! Integration tests for model selection and the prediction result contract.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use asl_classifiers::data_handling::FeatureMatrix;
use asl_classifiers::labels::LabelMapping;
use asl_classifiers::landmarks::{
    HandDetector, HandLandmarks, Landmark, LandmarkNormalizer, WristScaleNormalizer, FEATURE_LEN,
};
use asl_classifiers::models::classifier_trait::ClassifierModel;
use asl_classifiers::registry::ModelRegistry;
use asl_classifiers::router::{FailureKind, PredictionRouter, NO_HAND_LABEL};
use asl_classifiers::stats::EvaluationReport;
use asl_classifiers::{AslError, Result};

/// Answers every request with a fixed letter and counts the calls.
struct FixedModel {
    letter: &'static str,
    calls: Arc<AtomicUsize>,
}

impl FixedModel {
    fn shared(letter: &'static str) -> (Arc<dyn ClassifierModel>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = FixedModel {
            letter,
            calls: Arc::clone(&calls),
        };
        (Arc::new(model), calls)
    }
}

impl ClassifierModel for FixedModel {
    fn train(&mut self, _: &FeatureMatrix, _: &[usize], _: &LabelMapping, _: bool) -> Result<()> {
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<(String, f32)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if features.len() != FEATURE_LEN {
            return Err(AslError::FeatureLength {
                expected: FEATURE_LEN,
                got: features.len(),
            });
        }
        Ok((self.letter.to_string(), 0.75))
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<(String, f32)>> {
        let (letter, p) = self.predict(features)?;
        Ok(vec![(letter, p)])
    }

    fn evaluate(&self, _: &FeatureMatrix, _: &[usize]) -> Result<EvaluationReport> {
        Err(AslError::NotTrained)
    }

    fn save(&self, _: &Path) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, _: &Path) -> Result<()> {
        Ok(())
    }

    fn label_mapping(&self) -> Option<&LabelMapping> {
        None
    }

    fn is_trained(&self) -> bool {
        true
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn hand() -> HandLandmarks {
    let points = (0..21)
        .map(|i| Landmark::new(0.3 + i as f32 * 0.01, 0.6 - i as f32 * 0.02, -0.01 * i as f32))
        .collect();
    HandLandmarks::new(points).unwrap()
}

#[test]
fn no_hand_short_circuits_without_calling_a_model() {
    let (general, general_calls) = FixedModel::shared("Z");
    let (special, special_calls) = FixedModel::shared("A");
    let registry = ModelRegistry::empty()
        .with_general(general)
        .with_specialized("A_to_F", special);
    let router = PredictionRouter::new(Arc::new(registry));

    for key in [Some("A_to_F"), Some("Q_to_U"), None] {
        let result = router.predict_landmarks(None, key).unwrap();
        assert_eq!(result.predicted_label, NO_HAND_LABEL);
        assert_eq!(result.confidence, 0.0);
        assert!(result.raw_landmarks.is_empty());
        assert!(!result.hand_detected);
        assert_eq!(result.model_used, key.unwrap_or("general"));
    }
    assert_eq!(general_calls.load(Ordering::SeqCst), 0);
    assert_eq!(special_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn no_hand_does_not_need_any_model() {
    let router = PredictionRouter::new(Arc::new(ModelRegistry::empty()));
    let result = router.predict_landmarks(None, Some("A_to_F")).unwrap();
    assert!(!result.hand_detected);
}

#[test]
fn loaded_specialised_model_is_used() {
    let (general, general_calls) = FixedModel::shared("Z");
    let (special, special_calls) = FixedModel::shared("B");
    let registry = ModelRegistry::empty()
        .with_general(general)
        .with_specialized("A_to_F", special);
    let router = PredictionRouter::new(Arc::new(registry));

    let result = router.predict_landmarks(Some(&hand()), Some("A_to_F")).unwrap();
    assert_eq!(result.predicted_label, "B");
    assert_eq!(result.model_used, "A_to_F");
    assert!(result.hand_detected);
    assert_eq!(result.raw_landmarks.len(), 21);
    assert_eq!(result.raw_landmarks[20].index, 20);
    assert_eq!(special_calls.load(Ordering::SeqCst), 1);
    assert_eq!(general_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_key_falls_back_to_general() {
    init_logging();
    let (general, general_calls) = FixedModel::shared("Z");
    let router = PredictionRouter::new(Arc::new(ModelRegistry::empty().with_general(general)));

    let result = router.predict_landmarks(Some(&hand()), Some("A_to_F")).unwrap();
    assert_eq!(result.predicted_label, "Z");
    assert_eq!(result.model_used, "general");
    assert_eq!(general_calls.load(Ordering::SeqCst), 1);

    let default = router.predict_landmarks(Some(&hand()), None).unwrap();
    assert_eq!(default.model_used, "general");
}

#[test]
fn no_model_at_all_is_an_error() {
    init_logging();
    let (special, _) = FixedModel::shared("B");
    let registry = ModelRegistry::empty().with_specialized("A_to_F", special);
    let router = PredictionRouter::new(Arc::new(registry));

    let err = router
        .predict_landmarks(Some(&hand()), Some("G_to_K"))
        .unwrap_err();
    assert!(matches!(
        err,
        AslError::NoModelAvailable { requested: Some(ref key) } if key == "G_to_K"
    ));

    let failure = router.respond(Some(&hand()), None).unwrap_err();
    assert_eq!(failure.kind, FailureKind::Unavailable);
}

#[test]
fn normaliser_length_mismatch_is_internal() {
    struct Truncating;
    impl LandmarkNormalizer for Truncating {
        fn normalize(&self, hand: &HandLandmarks) -> Vec<f32> {
            let mut features = WristScaleNormalizer.normalize(hand);
            features.truncate(10);
            features
        }
    }

    let (general, calls) = FixedModel::shared("Z");
    let router = PredictionRouter::with_normalizer(
        Arc::new(ModelRegistry::empty().with_general(general)),
        Box::new(Truncating),
    );
    let failure = router.respond(Some(&hand()), None).unwrap_err();
    assert_eq!(failure.kind, FailureKind::Internal);
    assert!(failure.detail.contains("63"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn model_feature_length_mismatch_is_internal() {
    struct Short;
    impl LandmarkNormalizer for Short {
        fn normalize(&self, hand: &HandLandmarks) -> Vec<f32> {
            WristScaleNormalizer.normalize(hand)[..10].to_vec()
        }

        fn feature_len(&self) -> usize {
            10
        }
    }

    let (general, calls) = FixedModel::shared("Z");
    let router = PredictionRouter::with_normalizer(
        Arc::new(ModelRegistry::empty().with_general(general)),
        Box::new(Short),
    );
    let failure = router.respond(Some(&hand()), None).unwrap_err();
    assert_eq!(failure.kind, FailureKind::Internal);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn overflowing_landmarks_are_invalid_input() {
    let mut points: Vec<Landmark> = (0..21)
        .map(|i| Landmark::new(0.01 * i as f32, 0.02 * i as f32, 0.0))
        .collect();
    points[9] = Landmark::new(3e38, 3e38, 0.0);
    let hand = HandLandmarks::new(points).unwrap();

    let (general, calls) = FixedModel::shared("A");
    let router = PredictionRouter::new(Arc::new(ModelRegistry::empty().with_general(general)));

    let err = router.predict_landmarks(Some(&hand), None).unwrap_err();
    assert!(matches!(err, AslError::InvalidLandmarks(_)));
    let failure = router.respond(Some(&hand), None).unwrap_err();
    assert_eq!(failure.kind, FailureKind::InvalidInput);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn detector_result_drives_the_hand_flag() {
    struct Scripted(Option<HandLandmarks>);
    impl HandDetector for Scripted {
        type Input = [u8];
        fn detect(&self, _: &[u8]) -> anyhow::Result<Option<HandLandmarks>> {
            Ok(self.0.clone())
        }
    }

    let (general, calls) = FixedModel::shared("Z");
    let router = PredictionRouter::new(Arc::new(ModelRegistry::empty().with_general(general)));

    let seen = router
        .predict_with_detector(&Scripted(Some(hand())), &[0u8; 4][..], None)
        .unwrap();
    assert!(seen.hand_detected);

    let empty = router
        .predict_with_detector(&Scripted(None), &[0u8; 4][..], Some("A_to_F"))
        .unwrap();
    assert!(!empty.hand_detected);
    assert_eq!(empty.model_used, "A_to_F");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn result_serialises_with_wire_names() {
    let (general, _) = FixedModel::shared("Z");
    let router = PredictionRouter::new(Arc::new(ModelRegistry::empty().with_general(general)));
    let result = router.predict_landmarks(Some(&hand()), None).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["sign"], "Z");
    assert_eq!(json["has_hand"], true);
    assert_eq!(json["model_used"], "general");
    assert_eq!(json["landmarks"].as_array().unwrap().len(), 21);
    assert_eq!(json["landmarks"][3]["index"], 3);
}
