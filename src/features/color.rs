// src/features/color.rs
//
// Per-channel color statistics over the masked region of the original
// color frame: a 5-bin density histogram over [0, 256), mean, population
// standard deviation and skewness. Channel keys follow the b/g/r naming
// the schema was trained with.

use crate::features::FeatureMap;
use crate::types::Mask;
use image::RgbImage;

pub const NUM_HIST_BINS: usize = 5;
const HIST_RANGE: f64 = 256.0;

/// (key suffix, RGB pixel index) in the order the keys were trained.
const CHANNELS: [(&str, usize); 3] = [("b", 2), ("g", 1), ("r", 0)];

pub fn extract(frame: &RgbImage, mask: &Mask) -> FeatureMap {
    if mask.is_empty()
        || frame.width() != mask.width()
        || frame.height() != mask.height()
    {
        return default_features();
    }

    let mut features = FeatureMap::new();
    for (name, channel) in CHANNELS {
        let values: Vec<f64> = frame
            .enumerate_pixels()
            .filter(|(x, y, _)| mask.contains(*x, *y))
            .map(|(_, _, px)| px.0[channel] as f64)
            .collect();
        channel_features(&mut features, name, &values);
    }
    features
}

fn channel_features(features: &mut FeatureMap, name: &str, values: &[f64]) {
    if values.is_empty() {
        for i in 0..NUM_HIST_BINS {
            features.insert(format!("hist_{name}_{}", i + 1), 0.0);
        }
        features.insert(format!("mean_{name}"), 0.0);
        features.insert(format!("std_{name}"), 0.0);
        features.insert(format!("skewness_{name}"), 0.0);
        return;
    }

    let n = values.len() as f64;
    let bin_width = HIST_RANGE / NUM_HIST_BINS as f64;
    let mut counts = [0u32; NUM_HIST_BINS];
    for &v in values {
        let bin = ((v / bin_width) as usize).min(NUM_HIST_BINS - 1);
        counts[bin] += 1;
    }
    // Density convention: counts normalized so the histogram integrates
    // to 1 over the value range (divide by n * bin_width).
    for (i, &count) in counts.iter().enumerate() {
        features.insert(
            format!("hist_{name}_{}", i + 1),
            count as f64 / (n * bin_width),
        );
    }

    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = variance.sqrt();
    let skewness = if std > 0.0 {
        values
            .iter()
            .map(|v| {
                let z = (v - mean) / std;
                z * z * z
            })
            .sum::<f64>()
            / n
    } else {
        0.0
    };

    features.insert(format!("mean_{name}"), mean);
    features.insert(format!("std_{name}"), std);
    features.insert(format!("skewness_{name}"), skewness);
}

fn default_features() -> FeatureMap {
    let mut features = FeatureMap::new();
    for (name, _) in CHANNELS {
        for i in 0..NUM_HIST_BINS {
            features.insert(format!("hist_{name}_{}", i + 1), 0.0);
        }
        features.insert(format!("mean_{name}"), 0.0);
        features.insert(format!("std_{name}"), 0.0);
        features.insert(format!("skewness_{name}"), 0.0);
    }
    features
}

pub fn key_count() -> usize {
    CHANNELS.len() * (NUM_HIST_BINS + 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CircleCandidate;
    use image::Rgb;

    fn disc_mask() -> Mask {
        Mask::from_disc(
            300,
            300,
            &CircleCandidate {
                cx: 150.0,
                cy: 150.0,
                radius: 60.0,
                votes: 1,
            },
        )
    }

    #[test]
    fn test_empty_mask_defaults() {
        let frame = RgbImage::new(300, 300);
        let features = extract(&frame, &Mask::empty(300, 300));
        assert_eq!(features.len(), key_count());
        for (name, _) in CHANNELS {
            assert_eq!(features.get(&format!("mean_{name}")), Some(0.0));
            assert_eq!(features.get(&format!("skewness_{name}")), Some(0.0));
            for i in 1..=NUM_HIST_BINS {
                assert_eq!(features.get(&format!("hist_{name}_{i}")), Some(0.0));
            }
        }
    }

    #[test]
    fn test_flat_channel_skewness_is_zero() {
        // Constant color: std is 0, skewness must fall back to 0.0.
        let frame = RgbImage::from_pixel(300, 300, Rgb([120, 80, 40]));
        let features = extract(&frame, &disc_mask());
        assert_eq!(features.get("mean_r"), Some(120.0));
        assert_eq!(features.get("mean_g"), Some(80.0));
        assert_eq!(features.get("mean_b"), Some(40.0));
        for (name, _) in CHANNELS {
            assert_eq!(features.get(&format!("std_{name}")), Some(0.0));
            assert_eq!(features.get(&format!("skewness_{name}")), Some(0.0));
        }
    }

    #[test]
    fn test_flat_channel_histogram_density() {
        let frame = RgbImage::from_pixel(300, 300, Rgb([120, 80, 40]));
        let features = extract(&frame, &disc_mask());
        // All red values (120) land in bin 3 of [0,256) split in five;
        // density of a full bin is 1 / 51.2.
        let expected = 1.0 / 51.2;
        assert!((features.get("hist_r_3").unwrap() - expected).abs() < 1e-12);
        assert_eq!(features.get("hist_r_1"), Some(0.0));
        // Blue (40) lands in bin 1.
        assert!((features.get("hist_b_1").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_mask_dims_default() {
        let frame = RgbImage::new(100, 100);
        let mut mask_img = image::GrayImage::new(50, 50);
        mask_img.put_pixel(10, 10, image::Luma([255]));
        let features = extract(&frame, &Mask::from_image(mask_img));
        assert_eq!(features.get("mean_r"), Some(0.0));
        assert_eq!(features.len(), key_count());
    }

    #[test]
    fn test_two_level_channel_statistics() {
        let mut frame = RgbImage::new(300, 300);
        let mask = disc_mask();
        // Half the masked pixels at 100, half at 200 (split by x parity).
        for (x, y, px) in frame.enumerate_pixels_mut() {
            if mask.contains(x, y) {
                let v = if x % 2 == 0 { 100 } else { 200 };
                *px = Rgb([v, v, v]);
            }
        }
        let features = extract(&frame, &mask);
        let mean = features.get("mean_r").unwrap();
        assert!((mean - 150.0).abs() < 2.0, "mean = {mean}");
        let std = features.get("std_r").unwrap();
        assert!((std - 50.0).abs() < 2.0, "std = {std}");
        let skew = features.get("skewness_r").unwrap();
        assert!(skew.abs() < 0.2, "skewness = {skew}");
    }
}
