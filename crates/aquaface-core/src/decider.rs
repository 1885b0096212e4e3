//! Quality-adaptive same/different decision.
//!
//! The baseline cosine similarity is multiplied by the *worse* of the two
//! image quality scores, so one degraded input is enough to hold the
//! adjusted score down. The multiplier lies in [0, 1] and is only applied
//! when it lowers the score; quality never raises a similarity.

use crate::similarity::{baseline_similarity, SimilarityError};
use crate::types::{
    EmbeddingOutcome, FaceEmbedding, ImageSide, QualityScore, VerificationRequest,
    VerificationResult,
};
use thiserror::Error;

/// Upper bound of `adjusted / threshold` before scaling to a percentage.
const CONFIDENCE_CAP: f32 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("no face detected in {side}")]
    MissingFace { side: ImageSide },
    #[error("threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f32),
    #[error("quality score for {side} must lie in [0, 1], got {overall}")]
    InvalidQuality { side: ImageSide, overall: f32 },
    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

/// Decide whether the two embeddings in `request` belong to the same person.
pub fn decide(request: &VerificationRequest) -> Result<VerificationResult, DecisionError> {
    let threshold = request.threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(DecisionError::InvalidThreshold(threshold));
    }

    let a = face(&request.embedding_a, ImageSide::A)?;
    let b = face(&request.embedding_b, ImageSide::B)?;
    check_quality(&request.quality_a, ImageSide::A)?;
    check_quality(&request.quality_b, ImageSide::B)?;

    let baseline = baseline_similarity(&a.values, &b.values)?;

    let adjusted = if request.use_quality_weighting {
        let q_min = request.quality_a.overall.min(request.quality_b.overall);
        attenuate(baseline, q_min)
    } else {
        baseline
    };

    let verdict = adjusted > threshold;
    let confidence = confidence(adjusted, threshold);

    tracing::debug!(
        baseline,
        adjusted,
        threshold,
        weighted = request.use_quality_weighting,
        verdict,
        confidence,
        "verification decided"
    );

    Ok(VerificationResult {
        baseline_similarity: baseline,
        adjusted_similarity: adjusted,
        verdict,
        confidence,
    })
}

fn face(outcome: &EmbeddingOutcome, side: ImageSide) -> Result<&FaceEmbedding, DecisionError> {
    outcome
        .embedding()
        .ok_or(DecisionError::MissingFace { side })
}

fn check_quality(quality: &QualityScore, side: ImageSide) -> Result<(), DecisionError> {
    if (0.0..=1.0).contains(&quality.overall) {
        Ok(())
    } else {
        Err(DecisionError::InvalidQuality {
            side,
            overall: quality.overall,
        })
    }
}

/// Scale `baseline` by `q` in [0, 1] without ever raising it.
///
/// For a negative baseline the product would move toward zero, i.e. up,
/// so the baseline is kept as is.
fn attenuate(baseline: f32, q: f32) -> f32 {
    (baseline * q).min(baseline)
}

/// Relative margin of `adjusted` against `threshold`, as a percentage in [0, 100].
///
/// With a zero threshold any positive score is full confidence.
fn confidence(adjusted: f32, threshold: f32) -> f32 {
    if threshold > 0.0 {
        (adjusted / threshold).clamp(0.0, CONFIDENCE_CAP) * 100.0
    } else if adjusted > 0.0 {
        100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(overall: f32) -> QualityScore {
        QualityScore {
            sharpness: 1.0,
            brightness: 0.5,
            exposure: 1.0,
            contrast: 0.2,
            overall,
        }
    }

    fn detected(values: Vec<f32>) -> EmbeddingOutcome {
        EmbeddingOutcome::Face(FaceEmbedding::new(values))
    }

    /// Two unit vectors with cosine similarity 0.6.
    fn request(qa: f32, qb: f32, threshold: f32, weighting: bool) -> VerificationRequest {
        VerificationRequest {
            embedding_a: detected(vec![1.0, 0.0]),
            embedding_b: detected(vec![0.6, 0.8]),
            quality_a: quality(qa),
            quality_b: quality(qb),
            threshold,
            use_quality_weighting: weighting,
        }
    }

    #[test]
    fn test_weighting_uses_worse_quality() {
        let result = decide(&request(0.9, 0.5, 0.75, true)).unwrap();
        assert!((result.baseline_similarity - 0.6).abs() < 1e-6);
        assert!((result.adjusted_similarity - 0.3).abs() < 1e-6);
        assert!(!result.verdict);
        assert!((result.confidence - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_weighting_off_keeps_baseline() {
        let result = decide(&request(0.9, 0.5, 0.5, false)).unwrap();
        assert_eq!(result.adjusted_similarity, result.baseline_similarity);
        assert!(result.verdict);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_toggle_flips_verdict() {
        let on = decide(&request(0.9, 0.5, 0.5, true)).unwrap();
        let off = decide(&request(0.9, 0.5, 0.5, false)).unwrap();
        assert!(!on.verdict);
        assert!(off.verdict);
    }

    #[test]
    fn test_identical_embeddings_adjusted_equals_quality() {
        let req = VerificationRequest {
            embedding_a: detected(vec![0.6, 0.8]),
            embedding_b: detected(vec![0.6, 0.8]),
            quality_a: quality(0.82),
            quality_b: quality(0.82),
            threshold: 0.75,
            use_quality_weighting: true,
        };
        let result = decide(&req).unwrap();
        assert!((result.baseline_similarity - 1.0).abs() < 1e-6);
        assert!((result.adjusted_similarity - 0.82).abs() < 1e-6);
        assert!(result.verdict);
    }

    #[test]
    fn test_zero_quality_zeroes_score() {
        let result = decide(&request(0.0, 0.95, 0.1, true)).unwrap();
        assert_eq!(result.adjusted_similarity, 0.0);
        assert!(!result.verdict);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_attenuation_only() {
        let pairs = [
            (vec![1.0, 0.0], vec![0.6, 0.8]),
            (vec![1.0, 0.0], vec![-0.6, 0.8]),
            (vec![1.0, 0.0], vec![-1.0, 0.0]),
            (vec![0.2, 0.9], vec![0.21, 0.88]),
        ];
        for (a, b) in pairs {
            for q in [0.0, 0.25, 0.5, 1.0] {
                let req = VerificationRequest {
                    embedding_a: detected(a.clone()),
                    embedding_b: detected(b.clone()),
                    quality_a: quality(q),
                    quality_b: quality(1.0),
                    threshold: 0.5,
                    use_quality_weighting: true,
                };
                let result = decide(&req).unwrap();
                assert!(
                    result.adjusted_similarity <= result.baseline_similarity,
                    "{result:?}"
                );
            }
        }
    }

    #[test]
    fn test_negative_baseline_not_raised() {
        let req = VerificationRequest {
            embedding_a: detected(vec![1.0, 0.0]),
            embedding_b: detected(vec![-0.6, 0.8]),
            quality_a: quality(0.5),
            quality_b: quality(0.5),
            threshold: 0.0,
            use_quality_weighting: true,
        };
        let result = decide(&req).unwrap();
        assert!((result.adjusted_similarity + 0.6).abs() < 1e-6);
        assert!(!result.verdict);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_zero_threshold_confidence() {
        let result = decide(&request(1.0, 1.0, 0.0, true)).unwrap();
        assert!(result.verdict);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_verdict_is_strictly_greater() {
        // Adjusted score equal to the threshold is not a match.
        let req = VerificationRequest {
            embedding_a: detected(vec![1.0, 0.0]),
            embedding_b: detected(vec![1.0, 0.0]),
            quality_a: quality(1.0),
            quality_b: quality(1.0),
            threshold: 1.0,
            use_quality_weighting: false,
        };
        let result = decide(&req).unwrap();
        assert_eq!(result.adjusted_similarity, 1.0);
        assert!(!result.verdict);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_deterministic() {
        let req = request(0.7, 0.4, 0.2, true);
        assert_eq!(decide(&req).unwrap(), decide(&req).unwrap());
    }

    #[test]
    fn test_invalid_threshold() {
        for t in [-0.1, 1.01, f32::NAN] {
            assert!(matches!(
                decide(&request(1.0, 1.0, t, true)),
                Err(DecisionError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_missing_face_is_reported_per_side() {
        let mut req = request(1.0, 1.0, 0.5, true);
        req.embedding_b = EmbeddingOutcome::NoFace;
        assert_eq!(
            decide(&req),
            Err(DecisionError::MissingFace { side: ImageSide::B })
        );
        req.embedding_a = EmbeddingOutcome::NoFace;
        assert_eq!(
            decide(&req),
            Err(DecisionError::MissingFace { side: ImageSide::A })
        );
    }

    #[test]
    fn test_invalid_quality() {
        assert!(matches!(
            decide(&request(1.2, 0.5, 0.5, true)),
            Err(DecisionError::InvalidQuality { side: ImageSide::A, .. })
        ));
        assert!(matches!(
            decide(&request(0.5, f32::NAN, 0.5, false)),
            Err(DecisionError::InvalidQuality { side: ImageSide::B, .. })
        ));
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let mut req = request(1.0, 1.0, 0.5, true);
        req.embedding_b = detected(vec![0.6, 0.8, 0.0]);
        assert_eq!(
            decide(&req),
            Err(DecisionError::Similarity(SimilarityError::DimensionMismatch {
                a: 2,
                b: 3
            }))
        );
    }
}
