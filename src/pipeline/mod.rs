// src/pipeline/mod.rs

pub mod annotate;
pub mod frame_slot;
pub mod run;
pub mod session;

pub use frame_slot::FrameSlot;
pub use run::run_recognition_pipeline;
pub use session::RecognitionSession;
