// src/features/lbp.rs
//
// Uniform local-binary-pattern texture codes (radius 3, 24 sampling
// points) over the masked intensity region, reduced to a fixed 10-bin
// density histogram. When fewer than 10 code bins are observed the rest
// are zero-padded; when more, only the first 10 are kept without
// renormalization. Both policies match the trained models.

use crate::features::FeatureMap;
use crate::types::Mask;
use image::GrayImage;

pub const NUM_BINS: usize = 10;
const RADIUS: f64 = 3.0;
const NUM_POINTS: usize = 24;

pub fn extract(gray: &GrayImage, mask: &Mask) -> FeatureMap {
    if mask.is_empty() {
        return default_features();
    }

    let codes = lbp_codes_in_mask(gray, mask);
    if codes.is_empty() {
        return default_features();
    }

    let max_code = codes.iter().copied().max().unwrap_or(0) as usize;
    let n_bins = max_code + 1;
    let mut hist = vec![0u32; n_bins];
    for &code in &codes {
        hist[code as usize] += 1;
    }
    let total = codes.len() as f64;

    let mut features = FeatureMap::new();
    for i in 0..NUM_BINS.min(n_bins) {
        features.insert(format!("lbp_bin_{}", i + 1), hist[i] as f64 / total);
    }
    for i in n_bins..NUM_BINS {
        features.insert(format!("lbp_bin_{}", i + 1), 0.0);
    }
    features
}

fn default_features() -> FeatureMap {
    let mut features = FeatureMap::new();
    for i in 0..NUM_BINS {
        features.insert(format!("lbp_bin_{}", i + 1), 0.0);
    }
    features
}

/// Uniform LBP codes of every mask-covered pixel, computed over the
/// mask-zeroed image (pixels outside the mask read as 0).
fn lbp_codes_in_mask(gray: &GrayImage, mask: &Mask) -> Vec<u8> {
    let w = gray.width();
    let h = gray.height();
    let masked = crate::segmentation::apply_mask(gray, mask);

    let sample = |x: f64, y: f64| -> f64 {
        bilinear(&masked, x, y)
    };

    let mut codes = Vec::with_capacity(mask.coverage());
    for y in 0..h {
        for x in 0..w {
            if !mask.contains(x, y) {
                continue;
            }
            codes.push(uniform_code(&masked, x, y, &sample));
        }
    }
    codes
}

/// Rotation-invariant uniform code: the number of set bits when the
/// circular bit pattern has at most two 0/1 transitions, `P + 1` otherwise.
fn uniform_code(img: &GrayImage, x: u32, y: u32, sample: &dyn Fn(f64, f64) -> f64) -> u8 {
    let center = img.get_pixel(x, y)[0] as f64;
    let mut bits = [false; NUM_POINTS];
    for (i, bit) in bits.iter_mut().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * i as f64 / NUM_POINTS as f64;
        let sy = y as f64 - RADIUS * angle.sin();
        let sx = x as f64 + RADIUS * angle.cos();
        *bit = sample(sx, sy) >= center;
    }

    let mut transitions = 0;
    for i in 0..NUM_POINTS {
        if bits[i] != bits[(i + 1) % NUM_POINTS] {
            transitions += 1;
        }
    }
    if transitions <= 2 {
        bits.iter().filter(|&&b| b).count() as u8
    } else {
        (NUM_POINTS + 1) as u8
    }
}

/// Bilinear sample; coordinates outside the image read as 0.
fn bilinear(img: &GrayImage, x: f64, y: f64) -> f64 {
    let w = img.width() as i64;
    let h = img.height() as i64;
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let at = |px: i64, py: i64| -> f64 {
        if px < 0 || py < 0 || px >= w || py >= h {
            0.0
        } else {
            img.get_pixel(px as u32, py as u32)[0] as f64
        }
    };

    at(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + at(x0 + 1, y0) * fx * (1.0 - fy)
        + at(x0, y0 + 1) * (1.0 - fx) * fy
        + at(x0 + 1, y0 + 1) * fx * fy
}
