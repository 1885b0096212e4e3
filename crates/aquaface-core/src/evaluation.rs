//! Offline comparison of baseline and quality-weighted scores over labelled pairs.

use crate::types::VerificationResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("{scores} scores but {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("at least one same-person pair is required")]
    NoPositives,
    #[error("at least one different-person pair is required")]
    NoNegatives,
    #[error("score at index {0} is not finite")]
    NonFiniteScore(usize),
}

/// Both scores of one verified pair plus its ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledOutcome {
    pub baseline: f32,
    pub adjusted: f32,
    pub same: bool,
}

impl LabeledOutcome {
    pub fn new(result: &VerificationResult, same: bool) -> Self {
        Self {
            baseline: result.baseline_similarity,
            adjusted: result.adjusted_similarity,
            same,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Pairs scoring at or above this value are predicted "same".
    pub threshold: f32,
    pub fpr: f64,
    pub tpr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// From (0, 0) to (1, 1), one point per distinct score.
    pub points: Vec<RocPoint>,
    /// Trapezoidal area under the curve.
    pub auc: f64,
}

impl RocCurve {
    pub fn compute(scores: &[f32], labels: &[bool]) -> Result<Self, EvaluationError> {
        if scores.len() != labels.len() {
            return Err(EvaluationError::LengthMismatch {
                scores: scores.len(),
                labels: labels.len(),
            });
        }
        if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
            return Err(EvaluationError::NonFiniteScore(i));
        }
        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        if positives == 0 {
            return Err(EvaluationError::NoPositives);
        }
        if negatives == 0 {
            return Err(EvaluationError::NoNegatives);
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&i, &j| scores[j].total_cmp(&scores[i]));

        let mut points = vec![RocPoint {
            threshold: f32::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];
        let (mut tp, mut fp) = (0usize, 0usize);
        let mut idx = 0;
        while idx < order.len() {
            // Tied scores move together: one cut-off cannot separate them.
            let cut = scores[order[idx]];
            while idx < order.len() && scores[order[idx]] == cut {
                if labels[order[idx]] {
                    tp += 1;
                } else {
                    fp += 1;
                }
                idx += 1;
            }
            points.push(RocPoint {
                threshold: cut,
                fpr: fp as f64 / negatives as f64,
                tpr: tp as f64 / positives as f64,
            });
        }

        let auc = points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum();

        Ok(Self { points, auc })
    }
}

/// Fraction of pairs where `score > threshold` agrees with the label.
pub fn accuracy_at(scores: &[f32], labels: &[bool], threshold: f32) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let correct = scores
        .iter()
        .zip(labels)
        .filter(|&(&s, &l)| (s > threshold) == l)
        .count();
    correct as f64 / scores.len() as f64
}

/// Baseline vs. quality-weighted score over the same labelled pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodComparison {
    pub pairs: usize,
    pub threshold: f32,
    pub baseline: RocCurve,
    pub adjusted: RocCurve,
    pub baseline_accuracy: f64,
    pub adjusted_accuracy: f64,
}

impl MethodComparison {
    pub fn compute(outcomes: &[LabeledOutcome], threshold: f32) -> Result<Self, EvaluationError> {
        let labels: Vec<bool> = outcomes.iter().map(|o| o.same).collect();
        let baseline: Vec<f32> = outcomes.iter().map(|o| o.baseline).collect();
        let adjusted: Vec<f32> = outcomes.iter().map(|o| o.adjusted).collect();

        let comparison = Self {
            pairs: outcomes.len(),
            threshold,
            baseline: RocCurve::compute(&baseline, &labels)?,
            adjusted: RocCurve::compute(&adjusted, &labels)?,
            baseline_accuracy: accuracy_at(&baseline, &labels, threshold),
            adjusted_accuracy: accuracy_at(&adjusted, &labels, threshold),
        };
        tracing::debug!(
            pairs = comparison.pairs,
            baseline_auc = comparison.baseline.auc,
            adjusted_auc = comparison.adjusted.auc,
            "compared scoring methods"
        );
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        let roc = RocCurve::compute(&[0.9, 0.8, 0.3, 0.1], &[true, true, false, false]).unwrap();
        assert_eq!(roc.auc, 1.0);
        assert_eq!(roc.points.first().map(|p| (p.fpr, p.tpr)), Some((0.0, 0.0)));
        assert_eq!(roc.points.last().map(|p| (p.fpr, p.tpr)), Some((1.0, 1.0)));
    }

    #[test]
    fn test_inverted_separation() {
        let roc = RocCurve::compute(&[0.1, 0.2, 0.8, 0.9], &[true, true, false, false]).unwrap();
        assert_eq!(roc.auc, 0.0);
    }

    #[test]
    fn test_all_tied_is_chance() {
        let roc = RocCurve::compute(&[0.5; 4], &[true, false, true, false]).unwrap();
        assert_eq!(roc.points.len(), 2);
        assert!((roc.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_partial_overlap() {
        // Ranking: P N P N -> AUC = 3/4.
        let roc = RocCurve::compute(&[0.9, 0.7, 0.6, 0.2], &[true, false, true, false]).unwrap();
        assert!((roc.auc - 0.75).abs() < 1e-12);
        assert_eq!(roc.points.len(), 5);
    }

    #[test]
    fn test_requires_both_classes() {
        assert_eq!(
            RocCurve::compute(&[0.1, 0.2], &[true, true]),
            Err(EvaluationError::NoNegatives)
        );
        assert_eq!(
            RocCurve::compute(&[0.1, 0.2], &[false, false]),
            Err(EvaluationError::NoPositives)
        );
        assert_eq!(RocCurve::compute(&[], &[]), Err(EvaluationError::NoPositives));
    }

    #[test]
    fn test_length_and_finiteness() {
        assert!(matches!(
            RocCurve::compute(&[0.1], &[true, false]),
            Err(EvaluationError::LengthMismatch { scores: 1, labels: 2 })
        ));
        assert_eq!(
            RocCurve::compute(&[0.1, f32::NAN], &[true, false]),
            Err(EvaluationError::NonFiniteScore(1))
        );
    }

    #[test]
    fn test_accuracy_at() {
        let scores = [0.9, 0.6, 0.4, 0.1];
        let labels = [true, false, true, false];
        assert_eq!(accuracy_at(&scores, &labels, 0.5), 0.5);
        assert_eq!(accuracy_at(&scores, &labels, 0.95), 0.5);
        assert_eq!(accuracy_at(&[], &[], 0.5), 0.0);
    }

    #[test]
    fn test_comparison_quality_weighting_helps() {
        // The blurry impostor pair scores high on baseline but is attenuated.
        let outcomes = [
            LabeledOutcome { baseline: 0.92, adjusted: 0.85, same: true },
            LabeledOutcome { baseline: 0.88, adjusted: 0.80, same: true },
            LabeledOutcome { baseline: 0.90, adjusted: 0.20, same: false },
            LabeledOutcome { baseline: 0.10, adjusted: 0.05, same: false },
        ];
        let cmp = MethodComparison::compute(&outcomes, 0.75).unwrap();
        assert_eq!(cmp.pairs, 4);
        assert!((cmp.baseline.auc - 0.75).abs() < 1e-12);
        assert_eq!(cmp.adjusted.auc, 1.0);
        assert_eq!(cmp.baseline_accuracy, 0.75);
        assert_eq!(cmp.adjusted_accuracy, 1.0);
    }

    #[test]
    fn test_labeled_outcome_from_result() {
        let result = VerificationResult {
            baseline_similarity: 0.6,
            adjusted_similarity: 0.3,
            verdict: false,
            confidence: 40.0,
        };
        let o = LabeledOutcome::new(&result, true);
        assert_eq!((o.baseline, o.adjusted, o.same), (0.6, 0.3, true));
    }
}
