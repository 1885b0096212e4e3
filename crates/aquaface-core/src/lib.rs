//! aquaface-core — Quality-adaptive pairwise face verification.
//!
//! Scores each image for sharpness and exposure, computes the cosine
//! similarity of the two face embeddings, and attenuates that similarity
//! by the worse image quality before applying the decision threshold.
//! Face detection and embedding are supplied by the caller through
//! [`EmbeddingSource`].

pub mod decider;
pub mod evaluation;
pub mod frame;
pub mod pipeline;
pub mod quality;
pub mod similarity;
pub mod types;

pub use decider::{decide, DecisionError};
pub use pipeline::{
    assess_pair, decode_side, EmbeddingError, EmbeddingSource, PipelineError, Verifier,
};
pub use quality::{QualityError, QualityScorer, QualityTier};
pub use similarity::{baseline_similarity, SimilarityError};
pub use types::{
    EmbeddingOutcome, FaceEmbedding, ImageSide, QualityScore, VerificationReport,
    VerificationRequest, VerificationResult, VerifySettings,
};
