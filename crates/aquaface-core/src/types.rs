use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two images in a verification pair a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSide {
    A,
    B,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSide::A => f.write_str("image A"),
            ImageSide::B => f.write_str("image B"),
        }
    }
}

/// Face embedding vector (512-dimensional for ArcFace), L2-normalized by its producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmbedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl FaceEmbedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }
}

/// What the upstream face model reported for one image.
///
/// `NoFace` is a hard stop for verification. It is never treated as a zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingOutcome {
    Face(FaceEmbedding),
    NoFace,
}

impl EmbeddingOutcome {
    pub fn embedding(&self) -> Option<&FaceEmbedding> {
        match self {
            EmbeddingOutcome::Face(embedding) => Some(embedding),
            EmbeddingOutcome::NoFace => None,
        }
    }
}

impl From<Option<FaceEmbedding>> for EmbeddingOutcome {
    fn from(value: Option<FaceEmbedding>) -> Self {
        value.map_or(EmbeddingOutcome::NoFace, EmbeddingOutcome::Face)
    }
}

/// Per-image quality breakdown. Every field lies in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Laplacian variance normalized against the scorer's saturation constant.
    pub sharpness: f32,
    /// Mean grayscale intensity / 255.
    pub brightness: f32,
    /// Brightness quality: 1.0 at mid-gray, falling to 0.0 at black and at white.
    pub exposure: f32,
    /// Grayscale standard deviation / 255. Informational only.
    pub contrast: f32,
    /// `sharpness * exposure`.
    pub overall: f32,
}

/// Inputs for a single same/different decision.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub embedding_a: EmbeddingOutcome,
    pub embedding_b: EmbeddingOutcome,
    pub quality_a: QualityScore,
    pub quality_b: QualityScore,
    /// Decision threshold in [0, 1]; adjusted similarity strictly above it means "same".
    pub threshold: f32,
    pub use_quality_weighting: bool,
}

/// Outcome of a single same/different decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Cosine similarity in [-1, 1], unmodified by quality.
    pub baseline_similarity: f32,
    /// Similarity after quality weighting. Never above `baseline_similarity`.
    pub adjusted_similarity: f32,
    /// `true` when both images are judged to show the same person.
    pub verdict: bool,
    /// Margin of `adjusted_similarity` relative to the threshold, in [0, 100].
    ///
    /// A UI hint only. It is not a calibrated probability.
    pub confidence: f32,
}

/// Knobs a caller supplies per verification call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifySettings {
    pub threshold: f32,
    pub use_quality_weighting: bool,
}

/// Everything downstream consumers receive for one verified pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub result: VerificationResult,
    pub quality_a: QualityScore,
    pub quality_b: QualityScore,
}
