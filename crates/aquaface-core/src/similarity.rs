//! Baseline cosine similarity between two face embeddings.

use crate::types::{FaceEmbedding, ImageSide};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("embedding dimensions differ: image A has {a}, image B has {b}")]
    DimensionMismatch { a: usize, b: usize },
    #[error("embedding for {side} has zero or non-finite norm")]
    DegenerateEmbedding { side: ImageSide },
}

/// Cosine similarity of `a` and `b`, in [-1, 1].
///
/// Does not rely on the inputs being L2-normalized: the dot product is
/// always divided by both norms. Symmetric in its arguments.
pub fn baseline_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            a: a.len(),
            b: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if !(norm_a.is_finite() && norm_a > 0.0) {
        return Err(SimilarityError::DegenerateEmbedding { side: ImageSide::A });
    }
    if !(norm_b.is_finite() && norm_b > 0.0) {
        return Err(SimilarityError::DegenerateEmbedding { side: ImageSide::B });
    }

    // Rounding can push |cos| a hair past 1 for near-identical vectors.
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32)
}

impl FaceEmbedding {
    /// Cosine similarity with another embedding. See [`baseline_similarity`].
    pub fn similarity(&self, other: &FaceEmbedding) -> Result<f32, SimilarityError> {
        baseline_similarity(&self.values, &other.values)
    }
}
