// src/pipeline/frame_slot.rs
//
// Single-slot frame hand-off between a producer and the recognition loop.
// The slot only ever holds the most recent frame; publishing overwrites
// whatever was there before.

use image::RgbImage;
use std::sync::Mutex;

#[derive(Default)]
pub struct FrameSlot {
    latest: Mutex<Option<RgbImage>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame. Last writer wins.
    pub fn publish(&self, frame: RgbImage) {
        let mut slot = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(frame);
    }

    /// Clone of the most recent frame, if any has been published.
    pub fn snapshot(&self) -> Option<RgbImage> {
        let slot = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }
}
