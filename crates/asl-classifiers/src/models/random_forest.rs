//! Bagged ensemble of `linfa_trees` decision trees.
//!
//! Each tree is fitted on a bootstrap sample restricted to a random subset
//! of the informative columns. Trees are grown in parallel; tree `t` draws
//! from an RNG seeded with `seed + t`, so a forest is reproducible
//! regardless of thread scheduling.
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::data_handling::FeatureMatrix;
use crate::error::{AslError, Result};

/// One ensemble member and the columns of the full feature vector it reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaggedTree {
    features: Vec<usize>,
    tree: DecisionTree<f32, usize>,
}

impl BaggedTree {
    fn records(&self, x: &FeatureMatrix) -> Array2<f32> {
        Array2::from_shape_fn((x.n_samples(), self.features.len()), |(r, c)| {
            x.row(r)[self.features[c]]
        })
    }

    fn predict_one(&self, features: &[f32]) -> Option<usize> {
        let row = Array2::from_shape_fn((1, self.features.len()), |(_, c)| features[self.features[c]]);
        let predicted: Array1<usize> = self.tree.predict(&row);
        predicted.get(0).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
}

fn grow_tree(
    x: &FeatureMatrix,
    y: &[usize],
    informative: &[usize],
    params: TreeParams,
    seed: u64,
) -> Result<(BaggedTree, Vec<f32>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features: Vec<usize> = informative
        .choose_multiple(&mut rng, params.max_features)
        .copied()
        .collect();
    features.sort_unstable();

    let n = x.n_samples();
    let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let records = Array2::from_shape_fn((n, features.len()), |(r, c)| x.row(bootstrap[r])[features[c]]);
    let targets = Array1::from_vec(bootstrap.iter().map(|&i| y[i]).collect());

    let tree = DecisionTree::<f32, usize>::params()
        .split_quality(SplitQuality::Gini)
        .max_depth(params.max_depth)
        .min_weight_split(params.min_samples_split as f32)
        .fit(&Dataset::new(records, targets))
        .map_err(|e| AslError::Training(format!("decision tree fit failed: {}", e)))?;

    // A tree that never split reports NaN importances.
    let importances = tree
        .feature_importance()
        .into_iter()
        .map(|v| if v.is_finite() { v } else { 0.0 })
        .collect();

    Ok((BaggedTree { features, tree }, importances))
}

/// An ensemble of decision trees; probabilities are vote fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    /// Sorted distinct label indices seen during fitting.
    classes: Vec<usize>,
    trees: Vec<BaggedTree>,
    feature_importances: Vec<f32>,
}

impl RandomForest {
    pub fn fit(x: &FeatureMatrix, y: &[usize], model_type: &ModelType, seed: u64) -> Result<Self> {
        let ModelType::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            max_features,
        } = model_type;

        if *n_estimators == 0 {
            return Err(AslError::Training("n_estimators must be at least 1".to_string()));
        }
        if x.n_samples() != y.len() {
            return Err(AslError::Training(format!(
                "{} feature rows but {} labels",
                x.n_samples(),
                y.len()
            )));
        }
        if x.n_samples() == 0 || x.n_features() == 0 {
            return Err(AslError::Training("empty training data".to_string()));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let n_features = x.n_features();
        // Constant columns never split, so trees only sample from the rest.
        let mut informative: Vec<usize> = (0..n_features)
            .filter(|&c| x.rows().any(|row| row[c] != x.row(0)[c]))
            .collect();
        if informative.is_empty() {
            informative = (0..n_features).collect();
        }

        let params = TreeParams {
            max_depth: *max_depth,
            min_samples_split: (*min_samples_split).max(2),
            max_features: max_features
                .unwrap_or_else(|| (informative.len() as f64).sqrt() as usize)
                .clamp(1, informative.len()),
        };

        let grown: Vec<(BaggedTree, Vec<f32>)> = (0..*n_estimators)
            .into_par_iter()
            .map(|t| grow_tree(x, y, &informative, params, seed.wrapping_add(t as u64)))
            .collect::<Result<_>>()?;

        let mut importances = vec![0.0f64; n_features];
        let mut trees = Vec::with_capacity(grown.len());
        for (tree, tree_importances) in grown {
            let total: f32 = tree_importances.iter().sum();
            if total > 0.0 {
                for (&column, v) in tree.features.iter().zip(&tree_importances) {
                    importances[column] += f64::from(v / total);
                }
            }
            trees.push(tree);
        }
        let total: f64 = importances.iter().sum();
        let feature_importances = importances
            .iter()
            .map(|v| if total > 0.0 { (v / total) as f32 } else { 0.0 })
            .collect();

        log::trace!(
            "Grew {} trees with {} of {} features each over {} samples",
            trees.len(),
            params.max_features,
            n_features,
            x.n_samples()
        );

        Ok(Self {
            n_features,
            classes,
            trees,
            feature_importances,
        })
    }

    /// Share of trees voting for each class, aligned with `classes()`.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let mut votes = vec![0.0f32; self.classes.len()];
        for member in &self.trees {
            if let Some(pos) = member
                .predict_one(features)
                .and_then(|label| self.classes.binary_search(&label).ok())
            {
                votes[pos] += 1.0;
            }
        }
        let n_trees = self.trees.len() as f32;
        votes.iter_mut().for_each(|v| *v /= n_trees);
        votes
    }

    /// Most voted label index and its vote share. Ties go to the lower
    /// label index.
    pub fn predict(&self, features: &[f32]) -> (usize, f32) {
        let proba = self.predict_proba(features);
        let best = argmax(&proba);
        (self.classes[best], proba[best])
    }

    /// Majority label for every row of `x`, one tree pass per member.
    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Vec<usize> {
        if x.n_samples() == 0 {
            return Vec::new();
        }
        let mut votes = vec![vec![0u32; self.classes.len()]; x.n_samples()];
        for member in &self.trees {
            let predicted: Array1<usize> = member.tree.predict(&member.records(x));
            for (row, label) in predicted.iter().enumerate() {
                if let Ok(pos) = self.classes.binary_search(label) {
                    votes[row][pos] += 1;
                }
            }
        }
        votes
            .iter()
            .map(|counts| self.classes[argmax(counts)])
            .collect()
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f32] {
        &self.feature_importances
    }

    /// Structural checks for a deserialised forest.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.classes.is_empty() {
            return Err("forest has no classes".to_string());
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err("forest classes are not strictly ascending".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} feature importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (t, member) in self.trees.iter().enumerate() {
            if member.features.is_empty() {
                return Err(format!("tree {} reads no features", t));
            }
            if member.features.windows(2).any(|w| w[0] >= w[1])
                || member.features.iter().any(|&c| c >= self.n_features)
            {
                return Err(format!("tree {} has invalid feature columns", t));
            }
        }
        Ok(())
    }
}

fn argmax<T: PartialOrd>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
