//! Integration tests for CLI config parsing and util helpers.

use std::path::PathBuf;

use asl_cli::predict::input::read_landmarks;
use asl_cli::train::input::{TrainConfig, TrainTarget};
use asl_cli::train::run_training;
use asl_cli::util::{load_registry_config, validate_dataset_file};
use asl_classifiers::config::RegistryConfig;
use asl_classifiers::letter_range::LetterRange;

// ---------------------------------------------------------------------------
// validate_dataset_file
// ---------------------------------------------------------------------------

#[test]
fn validate_known_extensions() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["data.csv", "data.tsv", "data.JSON"] {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap();
        assert!(validate_dataset_file(path.to_str().unwrap()).is_ok(), "{}", name);
    }
}

#[test]
fn validate_wrong_extension_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::File::create(&path).unwrap();
    assert!(validate_dataset_file(path.to_str().unwrap()).is_err());
}

#[test]
fn validate_nonexistent_file_errors() {
    assert!(validate_dataset_file("/nonexistent/path/data.csv").is_err());
}

// ---------------------------------------------------------------------------
// RegistryConfig loading
// ---------------------------------------------------------------------------

#[test]
fn registry_config_defaults_without_file() {
    let cfg = load_registry_config(None::<PathBuf>).unwrap();
    assert_eq!(cfg, RegistryConfig::default());
    assert_eq!(cfg.letter_ranges.len(), 5);
}

#[test]
fn registry_config_loads_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, r#"{"specialized_dir": "models/ranges"}"#).unwrap();

    let cfg = load_registry_config(Some(&path)).unwrap();
    assert_eq!(cfg.specialized_dir, PathBuf::from("models/ranges"));
    assert_eq!(cfg.general_model_path, RegistryConfig::default().general_model_path);
}

#[test]
fn registry_config_rejects_bad_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, r#"{"letter_ranges": [["F", "A"]]}"#).unwrap();
    assert!(load_registry_config(Some(&path)).is_err());
}

// ---------------------------------------------------------------------------
// TrainConfig
// ---------------------------------------------------------------------------

#[test]
fn train_config_default_values() {
    let cfg = TrainConfig::default();
    assert!(cfg.dataset.is_empty());
    assert!(!cfg.all_ranges);
    assert!(!cfg.tune_hyperparams);
    assert_eq!(cfg.model.random_state, 42);
    assert_eq!(cfg.target().unwrap(), TrainTarget::General);
    assert_eq!(cfg.output_dir(TrainTarget::General), PathBuf::from("data"));
}

#[test]
fn train_config_serializes() {
    let json = serde_json::to_string(&TrainConfig::default()).unwrap();
    assert!(json.contains("dataset"));
    assert!(json.contains("letter_ranges"));
    assert!(json.contains("RandomForest"));
}

#[test]
fn train_config_from_file_keeps_defaults_for_bad_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.json");
    std::fs::write(
        &path,
        r#"{"dataset": "landmarks.csv", "start_letter": "G", "end_letter": "K", "all_ranges": "yes"}"#,
    )
    .unwrap();

    let cfg = TrainConfig::from_file(&path).unwrap();
    assert_eq!(cfg.dataset, "landmarks.csv");
    assert!(!cfg.all_ranges);
    let range = LetterRange::new('G', 'K').unwrap();
    assert_eq!(cfg.target().unwrap(), TrainTarget::Range(range));
    assert_eq!(
        cfg.output_dir(TrainTarget::Range(range)),
        PathBuf::from("data").join("specialized")
    );
}

#[test]
fn training_requires_a_dataset() {
    let cfg = TrainConfig {
        start_letter: Some('A'),
        end_letter: Some('F'),
        ..TrainConfig::default()
    };
    let err = run_training(&cfg).unwrap_err();
    assert!(err.to_string().contains("dataset is required"));
}

#[test]
fn train_target_rejects_half_a_range() {
    let cfg = TrainConfig {
        start_letter: Some('A'),
        ..TrainConfig::default()
    };
    assert!(cfg.target().is_err());

    let cfg = TrainConfig {
        start_letter: Some('A'),
        end_letter: Some('F'),
        all_ranges: true,
        ..TrainConfig::default()
    };
    assert!(cfg.target().is_err());
}

// ---------------------------------------------------------------------------
// Landmark files
// ---------------------------------------------------------------------------

#[test]
fn landmark_file_null_means_no_hand() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand.json");
    std::fs::write(&path, "null").unwrap();
    assert!(read_landmarks(&path).unwrap().is_none());
}

#[test]
fn landmark_file_with_triples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand.json");
    std::fs::write(&path, "[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]").unwrap();
    let points = read_landmarks(&path).unwrap().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1], [0.4, 0.5, 0.6]);
}
