//! End-to-end verification of an image pair.
//!
//! The face model is injected as a shared, read-only [`EmbeddingSource`]
//! handle. The pipeline itself holds no per-request state, so one
//! [`Verifier`] can serve concurrent callers.

use crate::decider::{decide, DecisionError};
use crate::quality::{decode, QualityError, QualityScorer};
use crate::types::{
    EmbeddingOutcome, ImageSide, VerificationReport, VerificationRequest, VerifySettings,
};
use image::DynamicImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding model failed: {0}")]
    Model(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("quality scoring failed for {side}: {source}")]
    Quality {
        side: ImageSide,
        #[source]
        source: QualityError,
    },
    #[error("embedding failed for {side}: {source}")]
    Embedding {
        side: ImageSide,
        #[source]
        source: EmbeddingError,
    },
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

impl PipelineError {
    /// The image this failure concerns, when it concerns exactly one.
    pub fn side(&self) -> Option<ImageSide> {
        match self {
            PipelineError::Quality { side, .. } | PipelineError::Embedding { side, .. } => {
                Some(*side)
            }
            PipelineError::Decision(DecisionError::MissingFace { side })
            | PipelineError::Decision(DecisionError::InvalidQuality { side, .. }) => Some(*side),
            PipelineError::Decision(_) => None,
        }
    }

    /// `true` for the expected "no face in this image" outcome, as opposed to a fault.
    pub fn is_missing_face(&self) -> bool {
        matches!(
            self,
            PipelineError::Decision(DecisionError::MissingFace { .. })
        )
    }
}

/// A face detection + embedding model.
///
/// Implementations must be safe to share read-only across threads.
pub trait EmbeddingSource: Send + Sync {
    /// Embed the most prominent face in `image`, or report that there is none.
    fn embed(&self, image: &DynamicImage) -> Result<EmbeddingOutcome, EmbeddingError>;
}

/// Verifies image pairs against an injected embedding model.
#[derive(Clone)]
pub struct Verifier {
    source: Arc<dyn EmbeddingSource>,
    scorer: QualityScorer,
}

impl Verifier {
    pub fn new(source: Arc<dyn EmbeddingSource>, scorer: QualityScorer) -> Self {
        Self { source, scorer }
    }

    /// Decode, embed, score and decide for two encoded images.
    pub fn verify(
        &self,
        image_a: &[u8],
        image_b: &[u8],
        settings: VerifySettings,
    ) -> Result<VerificationReport, PipelineError> {
        let image_a = decode_side(image_a, ImageSide::A)?;
        let image_b = decode_side(image_b, ImageSide::B)?;

        let outcome_a = self.embed(&image_a, ImageSide::A)?;
        let outcome_b = self.embed(&image_b, ImageSide::B)?;

        assess_pair(
            &self.scorer,
            &image_a,
            outcome_a,
            &image_b,
            outcome_b,
            settings,
        )
    }

    fn embed(
        &self,
        image: &DynamicImage,
        side: ImageSide,
    ) -> Result<EmbeddingOutcome, PipelineError> {
        let outcome = self
            .source
            .embed(image)
            .map_err(|source| PipelineError::Embedding { side, source })?;
        if matches!(outcome, EmbeddingOutcome::NoFace) {
            tracing::debug!(%side, "embedding source found no face");
        }
        Ok(outcome)
    }
}

/// Decode one image of the pair, tagging a failure with its side.
pub fn decode_side(bytes: &[u8], side: ImageSide) -> Result<DynamicImage, PipelineError> {
    decode(bytes).map_err(|source| PipelineError::Quality { side, source })
}

/// Score both images and decide, given embedding outcomes produced upstream.
pub fn assess_pair(
    scorer: &QualityScorer,
    image_a: &DynamicImage,
    outcome_a: EmbeddingOutcome,
    image_b: &DynamicImage,
    outcome_b: EmbeddingOutcome,
    settings: VerifySettings,
) -> Result<VerificationReport, PipelineError> {
    let quality_a = scorer
        .score_image(image_a)
        .map_err(|source| PipelineError::Quality {
            side: ImageSide::A,
            source,
        })?;
    let quality_b = scorer
        .score_image(image_b)
        .map_err(|source| PipelineError::Quality {
            side: ImageSide::B,
            source,
        })?;

    let request = VerificationRequest {
        embedding_a: outcome_a,
        embedding_b: outcome_b,
        quality_a,
        quality_b,
        threshold: settings.threshold,
        use_quality_weighting: settings.use_quality_weighting,
    };
    let result = decide(&request)?;

    Ok(VerificationReport {
        result,
        quality_a,
        quality_b,
    })
}
