//! Classification metrics: accuracy, confusion matrix and a per-class
//! precision / recall / F1 report.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::labels::LabelMapping;

/// Fraction of positions where `predicted == truth`.
///
/// # Panics
///
/// Panics if the slices have different lengths.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f32 {
    assert_eq!(
        truth.len(),
        predicted.len(),
        "truth and predicted must have equal lengths"
    );
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f32 / truth.len() as f32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f32,
    /// Row and column order of `confusion_matrix`.
    pub labels: Vec<String>,
    /// `confusion_matrix[truth][predicted]`.
    pub confusion_matrix: Vec<Vec<usize>>,
    pub per_class: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Build a report over the union of label indices in `truth` and
    /// `predicted`, ordered by index. Indices missing from `mapping` are
    /// shown as their number.
    pub fn new(truth: &[usize], predicted: &[usize], mapping: &LabelMapping) -> Self {
        let accuracy = accuracy(truth, predicted);

        let mut indices: Vec<usize> = truth.iter().chain(predicted).copied().collect();
        indices.sort_unstable();
        indices.dedup();
        let position = |label: usize| indices.binary_search(&label).unwrap_or_default();

        let k = indices.len();
        let mut confusion_matrix = vec![vec![0usize; k]; k];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion_matrix[position(t)][position(p)] += 1;
        }

        let labels: Vec<String> = indices
            .iter()
            .map(|&i| {
                mapping
                    .letter_of(i)
                    .map(str::to_string)
                    .unwrap_or_else(|| i.to_string())
            })
            .collect();

        let per_class = (0..k)
            .map(|c| {
                let tp = confusion_matrix[c][c];
                let support: usize = confusion_matrix[c].iter().sum();
                let predicted_c: usize = confusion_matrix.iter().map(|row| row[c]).sum();
                let precision = ratio(tp, predicted_c);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: labels[c].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy,
            labels,
            confusion_matrix,
            per_class,
        }
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>9} {:>9} {:>9} {:>8}", "", "precision", "recall", "f1-score", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>8} {:>9.2} {:>9.2} {:>9.2} {:>8}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(f, "accuracy: {:.4}", self.accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 2, 3, 4], &[1, 2, 0, 4]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    #[should_panic(expected = "equal lengths")]
    fn test_accuracy_length_mismatch() {
        accuracy(&[1, 2], &[1]);
    }

    #[test]
    fn test_report() {
        let mapping = LabelMapping::new([("A", 0), ("B", 1)]).unwrap();
        let report = EvaluationReport::new(&[0, 0, 1, 1], &[0, 1, 1, 1], &mapping);
        assert_eq!(report.labels, vec!["A", "B"]);
        assert_eq!(report.confusion_matrix, vec![vec![1, 1], vec![0, 2]]);
        let b = &report.per_class[1];
        assert!((b.precision - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(b.recall, 1.0);
        assert_eq!(b.support, 2);
        assert!(report.to_string().contains("accuracy: 0.7500"));
    }
}
