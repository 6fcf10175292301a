// src/types.rs

use crate::error::PipelineError;
use image::GrayImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Candidate directories probed in order; the first one that exists wins.
    pub search_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub save_annotated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["models".to_string(), "assets/models".to_string()],
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
            save_annotated: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A circle candidate from the segmenter: center, radius and the detector's
/// accumulator response. At most one candidate survives per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleCandidate {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    /// Accumulator votes backing this center; used only for ranking.
    pub votes: u32,
}

/// Binary region-of-interest mask aligned to a 2D frame. Coin pixels are 255.
///
/// An all-zero mask is the canonical "no region detected" signal and
/// short-circuits every feature extractor to its all-zero default.
#[derive(Debug, Clone)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Solid disc mask, matching the candidate rounded to pixel coordinates.
    pub fn from_disc(width: u32, height: u32, circle: &CircleCandidate) -> Self {
        let mut image = GrayImage::new(width, height);
        let cx = circle.cx.round() as i64;
        let cy = circle.cy.round() as i64;
        let r = circle.radius.round() as i64;
        let r2 = r * r;
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r2 {
                    image.put_pixel(x as u32, y as u32, image::Luma([255]));
                }
            }
        }
        Self { image }
    }

    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] > 0
    }

    /// True when no pixel is set: the "no region detected" state.
    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == 0)
    }

    /// Number of set pixels.
    pub fn coverage(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v > 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Final per-frame output. Constructed once per pipeline invocation,
/// immutable, consumed by the caller and discarded.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub coin_type: String,
    pub coin_side: String,
    pub type_confidence: f64,
    pub side_confidence: f64,
    pub error: Option<PipelineError>,
}

impl ClassificationResult {
    pub fn success(
        coin_type: String,
        coin_side: String,
        type_confidence: f64,
        side_confidence: f64,
    ) -> Self {
        Self {
            coin_type,
            coin_side,
            type_confidence,
            side_confidence,
            error: None,
        }
    }

    pub fn failure(error: PipelineError) -> Self {
        Self {
            coin_type: "N/A".to_string(),
            coin_side: "N/A".to_string(),
            type_confidence: 0.0,
            side_confidence: 0.0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mask_is_empty() {
        let mask = Mask::empty(300, 300);
        assert!(mask.is_empty());
        assert_eq!(mask.coverage(), 0);
    }

    #[test]
    fn test_disc_mask_coverage() {
        let circle = CircleCandidate {
            cx: 150.0,
            cy: 150.0,
            radius: 80.0,
            votes: 100,
        };
        let mask = Mask::from_disc(300, 300, &circle);
        assert!(!mask.is_empty());
        // Disc area within ~2% of pi * r^2.
        let expected = std::f64::consts::PI * 80.0 * 80.0;
        let actual = mask.coverage() as f64;
        assert!((actual - expected).abs() / expected < 0.02);
        assert!(mask.contains(150, 150));
        assert!(!mask.contains(0, 0));
    }

    #[test]
    fn test_disc_mask_clipped_at_border() {
        let circle = CircleCandidate {
            cx: 0.0,
            cy: 0.0,
            radius: 60.0,
            votes: 50,
        };
        let mask = Mask::from_disc(300, 300, &circle);
        assert!(mask.contains(0, 0));
        assert!(!mask.contains(100, 100));
    }

    #[test]
    fn test_failure_result_defaults() {
        let result = ClassificationResult::failure(PipelineError::NoCoinDetected);
        assert_eq!(result.coin_type, "N/A");
        assert_eq!(result.coin_side, "N/A");
        assert_eq!(result.type_confidence, 0.0);
        assert_eq!(result.side_confidence, 0.0);
        assert!(!result.is_ok());
    }
}
