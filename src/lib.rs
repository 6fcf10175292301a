// src/lib.rs
//
// Coin recognition from a single camera frame: preprocessing, circular
// segmentation, feature extraction and classification against externally
// trained models.

pub mod classification;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod segmentation;
pub mod types;

pub use error::PipelineError;
pub use pipeline::{run_recognition_pipeline, FrameSlot, RecognitionSession};
pub use types::{ClassificationResult, Config};
