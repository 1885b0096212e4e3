//! Image quality scoring.
//!
//! Reduces one image to a sharpness value (Laplacian variance) and an
//! exposure value (distance of mean intensity from mid-gray), combined
//! multiplicatively so either defect alone drags the overall score to zero.

use crate::frame::{FrameError, GrayFrame, MAX_INTENSITY};
use crate::types::QualityScore;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Laplacian variance at which sharpness saturates to 1.0.
pub const DEFAULT_SHARPNESS_SATURATION: f64 = 1000.0;

const TIER_EXCELLENT: f32 = 0.8;
const TIER_GOOD: f32 = 0.6;
const TIER_FAIR: f32 = 0.4;

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("image could not be decoded: {0}")]
    InvalidImage(#[from] image::ImageError),
    /// Decoded, but zero-area or malformed pixel data. Still an invalid
    /// image; see [`QualityError::is_invalid_image`].
    #[error("image is empty: {0}")]
    EmptyImage(#[from] FrameError),
    #[error("sharpness saturation must be a positive finite number, got {0}")]
    InvalidSaturation(f64),
}

impl QualityError {
    /// True when the input image itself was unusable, as opposed to a
    /// misconfigured scorer.
    pub fn is_invalid_image(&self) -> bool {
        matches!(
            self,
            QualityError::InvalidImage(_) | QualityError::EmptyImage(_)
        )
    }
}

/// Computes [`QualityScore`]s. Holds no per-image state.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    sharpness_saturation: f64,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self {
            sharpness_saturation: DEFAULT_SHARPNESS_SATURATION,
        }
    }
}

impl QualityScorer {
    pub fn new(sharpness_saturation: f64) -> Result<Self, QualityError> {
        if !sharpness_saturation.is_finite() || sharpness_saturation <= 0.0 {
            return Err(QualityError::InvalidSaturation(sharpness_saturation));
        }
        Ok(Self {
            sharpness_saturation,
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, ...) and score them.
    pub fn score(&self, bytes: &[u8]) -> Result<QualityScore, QualityError> {
        let image = decode(bytes)?;
        self.score_image(&image)
    }

    /// Score an already decoded image.
    pub fn score_image(&self, image: &DynamicImage) -> Result<QualityScore, QualityError> {
        let frame = GrayFrame::from_image(image)?;
        Ok(self.score_frame(&frame))
    }

    pub fn score_frame(&self, frame: &GrayFrame) -> QualityScore {
        let laplacian_var = frame.laplacian_variance();
        let sharpness = (laplacian_var / self.sharpness_saturation).min(1.0);
        let brightness = frame.avg_brightness() / MAX_INTENSITY;
        let exposure = exposure_quality(brightness);
        let contrast = frame.std_dev() / MAX_INTENSITY;
        let overall = sharpness * exposure;

        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            laplacian_var,
            sharpness,
            brightness,
            exposure,
            overall,
            "scored image quality"
        );

        QualityScore {
            sharpness: sharpness as f32,
            brightness: brightness as f32,
            exposure: exposure as f32,
            contrast: contrast as f32,
            overall: overall as f32,
        }
    }
}

/// Decode image bytes, surfacing failures as [`QualityError::InvalidImage`].
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, QualityError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Map normalized mean intensity to a brightness quality in [0, 1].
///
/// Triangular falloff centred on mid-gray: 0.5 maps to 1.0, and both 0.0
/// (under-exposed) and 1.0 (over-exposed) map to 0.0.
pub fn exposure_quality(brightness: f64) -> f64 {
    (1.0 - (2.0 * brightness - 1.0).abs()).clamp(0.0, 1.0)
}

/// Coarse rating of a pair of images, from the mean of their overall scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    pub fn for_pair(a: &QualityScore, b: &QualityScore) -> Self {
        Self::from_overall((a.overall + b.overall) / 2.0)
    }

    pub fn from_overall(overall: f32) -> Self {
        if overall >= TIER_EXCELLENT {
            QualityTier::Excellent
        } else if overall >= TIER_GOOD {
            QualityTier::Good
        } else if overall >= TIER_FAIR {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "Excellent quality images. Verification highly reliable.",
            QualityTier::Good => "Good quality images. Verification reliable.",
            QualityTier::Fair => "Fair quality images. Results may be less reliable.",
            QualityTier::Poor => "Poor quality images. Consider re-uploading clearer images.",
        }
    }
}
