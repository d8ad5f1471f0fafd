//! Cross-validated grid search over random-forest hyper-parameters.
use rayon::prelude::*;

use crate::config::{ModelConfig, ModelType};
use crate::data_handling::{class_counts, stratified_folds, FeatureMatrix};
use crate::error::Result;
use crate::models::random_forest::RandomForest;
use crate::stats::accuracy;

#[derive(Debug, Clone)]
pub struct TuningOutcome {
    pub best: ModelType,
    /// Mean cross-validated accuracy of `best`.
    pub score: f32,
    pub n_folds: usize,
    pub evaluated: usize,
}

/// Evaluate every candidate of `config.tuning` with stratified k-fold CV and
/// return the best one. Ties go to the candidate listed first.
///
/// Returns `Ok(None)` when the data cannot support at least two folds per
/// class or the grid is empty; the caller then keeps its configured model.
pub fn grid_search(x: &FeatureMatrix, y: &[usize], config: &ModelConfig) -> Result<Option<TuningOutcome>> {
    let candidates = config.tuning.candidates(&config.model_type);
    if candidates.is_empty() {
        log::warn!("Hyperparameter grid is empty; skipping tuning");
        return Ok(None);
    }

    let smallest_class = class_counts(y).values().copied().min().unwrap_or(0);
    let n_folds = config.tuning.cv_folds.min(smallest_class);
    if n_folds < 2 {
        log::warn!(
            "Smallest class has {} samples; too few for cross-validation, skipping tuning",
            smallest_class
        );
        return Ok(None);
    }

    let folds = stratified_folds(y, n_folds, config.random_state);
    log::info!(
        "Tuning hyperparameters: {} candidates x {} folds",
        candidates.len(),
        n_folds
    );

    let scores: Vec<f32> = candidates
        .par_iter()
        .map(|candidate| cross_validate(x, y, &folds, candidate, config.random_state))
        .collect::<Result<Vec<f32>>>()?;

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        log::trace!("{:?}: mean accuracy {:.4}", candidates[i], score);
        if score > scores[best] {
            best = i;
        }
    }

    Ok(Some(TuningOutcome {
        best: candidates[best].clone(),
        score: scores[best],
        n_folds,
        evaluated: candidates.len(),
    }))
}

fn cross_validate(
    x: &FeatureMatrix,
    y: &[usize],
    folds: &[(Vec<usize>, Vec<usize>)],
    candidate: &ModelType,
    seed: u64,
) -> Result<f32> {
    let mut total = 0.0;
    for (train, test) in folds {
        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
        let forest = RandomForest::fit(&x.select_rows(train), &y_train, candidate, seed)?;

        let truth: Vec<usize> = test.iter().map(|&i| y[i]).collect();
        let predicted = forest.predict_matrix(&x.select_rows(test));
        total += accuracy(&truth, &predicted);
    }
    Ok(total / folds.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningGrid;

    fn data(per_class: usize) -> (FeatureMatrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for label in 0..3usize {
            for i in 0..per_class {
                rows.push(vec![label as f32 * 4.0 + i as f32 * 0.05, label as f32 * 10.0 - i as f32 * 0.05]);
                labels.push(label);
            }
        }
        (FeatureMatrix::from_rows(rows).unwrap(), labels)
    }

    fn small_grid() -> ModelConfig {
        ModelConfig {
            tuning: TuningGrid {
                n_estimators: vec![3, 5],
                max_depth: vec![None, Some(1)],
                min_samples_split: vec![2],
                cv_folds: 3,
            },
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_grid_search_picks_candidate() {
        let (x, y) = data(6);
        let outcome = grid_search(&x, &y, &small_grid()).unwrap().unwrap();
        assert_eq!(outcome.evaluated, 4);
        assert_eq!(outcome.n_folds, 3);
        assert!(outcome.score > 0.8);
    }

    #[test]
    fn test_grid_search_skips_tiny_classes() {
        let (x, y) = data(1);
        assert!(grid_search(&x, &y, &small_grid()).unwrap().is_none());
    }
}
