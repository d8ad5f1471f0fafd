//! Labelled landmark datasets and the letter-range partitioner.
//!
//! This module defines `FeatureMatrix`, `LabeledDataset` and
//! `PartitionedDataset`, plus the stratified splitting helpers used for
//! validation hold-out and cross-validation folds.
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{AslError, Result};
use crate::labels::LabelMapping;
use crate::letter_range::LetterRange;

/// Row-major `n_samples x n_features` matrix of f32 features.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    pub fn from_shape_vec(shape: (usize, usize), data: Vec<f32>) -> Result<Self> {
        let (rows, cols) = shape;
        if data.len() != rows * cols {
            return Err(AslError::Dataset(format!(
                "invalid shape ({}, {}) for buffer of length {}",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { data, rows, cols })
    }

    /// Build from per-sample rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(AslError::Dataset(format!(
                    "row {} has {} features, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_shape_vec((rows.len(), cols), data)
    }

    pub fn n_samples(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            data.extend_from_slice(self.row(row));
        }
        FeatureMatrix {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

/// Full labelled dataset: parallel features and label indices plus the
/// mapping that names each index.
#[derive(Clone, Debug)]
pub struct LabeledDataset {
    pub features: FeatureMatrix,
    pub labels: Vec<usize>,
    pub label_mapping: LabelMapping,
}

impl LabeledDataset {
    pub fn new(features: FeatureMatrix, labels: Vec<usize>, label_mapping: LabelMapping) -> Result<Self> {
        if features.n_samples() != labels.len() {
            return Err(AslError::Dataset(format!(
                "{} feature rows but {} labels",
                features.n_samples(),
                labels.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            label_mapping,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of samples per label index.
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        class_counts(&self.labels)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Dataset: {} samples, {} features, {} classes",
            self.len(),
            self.features.n_features(),
            self.label_mapping.len()
        );
        for (token, index) in self.label_mapping.iter() {
            log::debug!("  {} -> {}", token, index);
        }
    }
}

/// The samples of one letter range together with the restricted mapping.
#[derive(Clone, Debug)]
pub struct PartitionedDataset {
    pub range: LetterRange,
    pub features: FeatureMatrix,
    pub labels: Vec<usize>,
    pub label_mapping: LabelMapping,
}

impl PartitionedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Cut the samples whose label is a single letter inside `range`.
///
/// Label indices are kept as they are in the full dataset. Samples whose
/// index has no token, or whose token is not a single character, are
/// skipped. Fails with `EmptyPartition` when no class of the mapping falls
/// inside the range.
pub fn partition(dataset: &LabeledDataset, range: &LetterRange) -> Result<PartitionedDataset> {
    let label_mapping = dataset.label_mapping.restrict(|token| range.contains(token));
    if label_mapping.is_empty() {
        return Err(AslError::EmptyPartition {
            start: range.start(),
            end: range.end(),
        });
    }

    let selected: Vec<usize> = dataset
        .labels
        .iter()
        .enumerate()
        .filter(|(_, &index)| {
            dataset
                .label_mapping
                .letter_of(index)
                .map_or(false, |token| range.contains(token))
        })
        .map(|(i, _)| i)
        .collect();

    let features = dataset.features.select_rows(&selected);
    let labels: Vec<usize> = selected.iter().map(|&i| dataset.labels[i]).collect();

    log::info!(
        "Partition {}: {} of {} samples, classes {:?}",
        range,
        labels.len(),
        dataset.len(),
        label_mapping.letters()
    );

    Ok(PartitionedDataset {
        range: *range,
        features,
        labels,
        label_mapping,
    })
}

pub fn class_counts(labels: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Group sample positions by label, each group shuffled with `rng`.
fn shuffled_groups(labels: &[usize], rng: &mut StdRng) -> BTreeMap<usize, Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    for members in groups.values_mut() {
        members.shuffle(rng);
    }
    groups
}

/// Stratified hold-out split returning `(train, validation)` positions.
///
/// Each class contributes `floor(count * fraction)` samples to validation
/// but always keeps at least one sample for training.
pub fn stratified_split(labels: &[usize], fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();

    for members in shuffled_groups(labels, &mut rng).into_values() {
        let n_val = ((members.len() as f32 * fraction).floor() as usize).min(members.len() - 1);
        validation.extend_from_slice(&members[..n_val]);
        train.extend_from_slice(&members[n_val..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

/// Stratified k-fold assignment returning `(train, test)` positions per fold.
pub fn stratified_folds(labels: &[usize], n_folds: usize, seed: u64) -> Vec<(Vec<usize>, Vec<usize>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; labels.len()];

    // Round-robin per class keeps the class ratio in every fold.
    let mut next = 0;
    for members in shuffled_groups(labels, &mut rng).into_values() {
        for idx in members {
            fold_of[idx] = next % n_folds;
            next += 1;
        }
    }

    (0..n_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| fold_of[i] == fold);
            log::trace!(
                "Preparing fold {} with {} training samples and {} testing samples",
                fold,
                train.len(),
                test.len()
            );
            (train, test)
        })
        .collect()
}
