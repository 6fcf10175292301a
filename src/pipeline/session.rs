// src/pipeline/session.rs

use crate::error::PipelineError;
use crate::model::PredictionAssets;
use crate::pipeline::frame_slot::FrameSlot;
use crate::pipeline::run::run_recognition_pipeline;
use crate::types::ClassificationResult;
use image::RgbImage;
use std::sync::Arc;
use tracing::warn;

/// A recognition session: one frame slot plus the frozen prediction assets.
///
/// Frames go in through [`submit_frame`](Self::submit_frame);
/// [`process_latest`](Self::process_latest) runs the pipeline on whatever
/// frame is current at that moment. Cloning the session shares both the
/// slot and the assets.
#[derive(Clone)]
pub struct RecognitionSession {
    slot: Arc<FrameSlot>,
    assets: Arc<PredictionAssets>,
}

impl RecognitionSession {
    pub fn new(assets: Arc<PredictionAssets>) -> Self {
        Self {
            slot: Arc::new(FrameSlot::new()),
            assets,
        }
    }

    pub fn submit_frame(&self, frame: RgbImage) {
        self.slot.publish(frame);
    }

    /// Run recognition on the most recent frame. With no frame published
    /// yet, the result reports a missing input and no display frame comes
    /// back.
    pub fn process_latest(&self) -> (ClassificationResult, Option<RgbImage>) {
        match self.slot.snapshot() {
            Some(frame) => {
                let (result, visualized) = run_recognition_pipeline(&frame, &self.assets);
                (result, Some(visualized))
            }
            None => {
                warn!("no frame available for recognition");
                (
                    ClassificationResult::failure(PipelineError::InputMissing),
                    None,
                )
            }
        }
    }
}
