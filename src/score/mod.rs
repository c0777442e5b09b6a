//! Fitness scoring of predicted frames against ground truth.

use crate::plane::RasterImage;
use crate::util::RaincastResult;

pub mod ssim;

pub use ssim::SsimScorer;

/// Per-channel similarity of a prediction, bounded in [-1, 1] per component.
///
/// Self-similarity scores 1 on every channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitnessScore {
    /// Similarity on the red plane.
    pub r: f32,
    /// Similarity on the green plane.
    pub g: f32,
    /// Similarity on the blue plane.
    pub b: f32,
}

impl FitnessScore {
    /// Mean of the three channel similarities.
    pub fn mean(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }
}

/// Scores a composite prediction against the known follow-on frame.
///
/// Implementations must be deterministic and require identical geometry
/// between the two arguments.
pub trait FitnessScorer {
    /// One similarity scalar per colour channel.
    fn score(&self, composite: &RasterImage, truth: &RasterImage) -> RaincastResult<FitnessScore>;
}
