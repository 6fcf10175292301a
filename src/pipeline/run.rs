// src/pipeline/run.rs
//
// The synchronous frame-to-result pipeline: preprocess, segment, extract,
// assemble, classify. A usable display frame comes back in every case,
// annotated with the detected circle when there is one.

use crate::classification::classify;
use crate::error::PipelineError;
use crate::features::{assemble, extract_all};
use crate::model::PredictionAssets;
use crate::pipeline::annotate;
use crate::preprocessing::{preprocess, resize_area_rgb, WORKING_SIZE};
use crate::segmentation::segment;
use crate::types::ClassificationResult;
use image::RgbImage;
use tracing::debug;

/// Run the full recognition pipeline on one frame.
///
/// Always returns a frame the caller can display: the working-size copy of
/// the input, annotated with the retained circle candidate when detection
/// succeeded. Every failure mode lands in the result's `error` field; this
/// function does not panic on bad frames.
pub fn run_recognition_pipeline(
    frame: &RgbImage,
    assets: &PredictionAssets,
) -> (ClassificationResult, RgbImage) {
    if frame.width() == 0 || frame.height() == 0 {
        return (
            ClassificationResult::failure(PipelineError::InputMissing),
            frame.clone(),
        );
    }

    let frame = resize_area_rgb(frame, WORKING_SIZE, WORKING_SIZE);
    let mut visualized = frame.clone();

    let gray = match preprocess(&frame) {
        Ok(gray) => gray,
        Err(err) => return (ClassificationResult::failure(err), visualized),
    };

    let segmentation = match segment(&gray) {
        Ok(seg) => seg,
        Err(err) => return (ClassificationResult::failure(err), visualized),
    };

    if let Some(circle) = &segmentation.candidate {
        debug!(
            cx = circle.cx,
            cy = circle.cy,
            radius = circle.radius,
            votes = circle.votes,
            "circle candidate retained"
        );
        annotate::draw_candidate(&mut visualized, circle);
    }

    if segmentation.mask.is_empty() {
        return (
            ClassificationResult::failure(PipelineError::NoCoinDetected),
            visualized,
        );
    }

    let features = extract_all(&segmentation.segmented, &segmentation.mask, &frame);
    let vector = assemble(&assets.schema, &features);

    let result = classify(
        &vector,
        assets.scaler.as_ref(),
        assets.type_model.as_ref(),
        assets.side_model.as_ref(),
    );
    (result, visualized)
}
