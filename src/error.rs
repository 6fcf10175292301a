// src/error.rs
//
// Per-frame error taxonomy. Every variant is non-fatal: it is carried
// inside the ClassificationResult for the offending frame and the next
// frame starts from a clean slate.

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Frame is absent or unreadable.
    #[error("No input frame")]
    InputMissing,

    /// Preprocessing produced no usable output.
    #[error("Preprocessing failed")]
    PreprocessingFailed,

    /// Mask construction failed structurally (not the same as "no coin").
    #[error("Segmentation failed")]
    SegmentationFailed,

    /// Valid but empty mask. A normal outcome, not a system fault.
    #[error("No coin detected")]
    NoCoinDetected,

    /// Assembled vector length disagrees with the scaler's expectation.
    /// Indicates schema/model version skew; a configuration error.
    #[error("Feature shape mismatch. Expected {expected}, got {actual}")]
    FeatureShapeMismatch { expected: usize, actual: usize },

    /// A classifier or scaler call failed; wrapped with the original cause.
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
}

impl Serialize for PipelineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(PipelineError::NoCoinDetected.to_string(), "No coin detected");
        assert_eq!(
            PipelineError::FeatureShapeMismatch {
                expected: 67,
                actual: 10
            }
            .to_string(),
            "Feature shape mismatch. Expected 67, got 10"
        );
        assert_eq!(
            PipelineError::PredictionFailed("bad tree".to_string()).to_string(),
            "Prediction failed: bad tree"
        );
    }
}
