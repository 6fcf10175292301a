// src/features/hog.rs
//
// Block-normalized histogram of oriented gradients over the masked region,
// resized to 64x64: 9 orientation bins, 8x8 pixel cells, 2x2 cell blocks,
// L2-Hys normalization. The 1764-value descriptor is then subsampled down
// to exactly 20 values by fixed-stride selection. The stride formula is a
// deliberate lossy compression the classifiers were trained against; it
// must not be replaced by anything smarter.

use crate::features::FeatureMap;
use crate::types::Mask;
use image::GrayImage;
use ndarray::{Array2, Array3};

pub const NUM_FEATURES: usize = 20;
const HOG_SIZE: usize = 64;
const ORIENTATIONS: usize = 9;
const CELL_SIDE: usize = 8;
const BLOCK_SIDE: usize = 2;
const L2_HYS_EPS: f64 = 1e-5;
const L2_HYS_CLIP: f64 = 0.2;

pub fn extract(gray: &GrayImage, mask: &Mask) -> FeatureMap {
    if mask.is_empty() {
        return default_features();
    }

    let masked = crate::segmentation::apply_mask(gray, mask);
    let resized = resize_bilinear_gray(&masked, HOG_SIZE as u32, HOG_SIZE as u32);
    let descriptor = hog_descriptor(&resized);
    let selected = subsample(&descriptor, NUM_FEATURES);

    let mut features = FeatureMap::new();
    for (i, &value) in selected.iter().enumerate() {
        features.insert(format!("hog_{}", i + 1), value);
    }
    for i in selected.len()..NUM_FEATURES {
        features.insert(format!("hog_{}", i + 1), 0.0);
    }
    features
}

fn default_features() -> FeatureMap {
    let mut features = FeatureMap::new();
    for i in 0..NUM_FEATURES {
        features.insert(format!("hog_{}", i + 1), 0.0);
    }
    features
}

/// Fixed-stride descriptor compression: `stride = max(1, len / count)`,
/// then truncate to `count`.
pub fn subsample(descriptor: &[f64], count: usize) -> Vec<f64> {
    if descriptor.is_empty() {
        return Vec::new();
    }
    let stride = (descriptor.len() / count).max(1);
    descriptor
        .iter()
        .step_by(stride)
        .take(count)
        .copied()
        .collect()
}

/// Bilinear grayscale resize.
pub fn resize_bilinear_gray(src: &GrayImage, dst_w: u32, dst_h: u32) -> GrayImage {
    let src_w = src.width() as usize;
    let src_h = src.height() as usize;
    let raw = src.as_raw();
    let mut dst = GrayImage::new(dst_w, dst_h);

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h as usize {
        for dx in 0..dst_w as usize {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;

            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);

            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            let p00 = raw[sy0 * src_w + sx0] as f32;
            let p10 = raw[sy0 * src_w + sx1] as f32;
            let p01 = raw[sy1 * src_w + sx0] as f32;
            let p11 = raw[sy1 * src_w + sx1] as f32;

            let val = p00 * (1.0 - fx) * (1.0 - fy)
                + p10 * fx * (1.0 - fy)
                + p01 * (1.0 - fx) * fy
                + p11 * fx * fy;

            dst.put_pixel(dx as u32, dy as u32, image::Luma([val.round() as u8]));
        }
    }
    dst
}

/// Full HOG descriptor of a 64x64 image: 7x7 overlapping blocks of 2x2
/// cells with 9 orientation bins each, flattened row-major (1764 values).
pub fn hog_descriptor(img: &GrayImage) -> Vec<f64> {
    let n = HOG_SIZE;
    let raw = img.as_raw();
    let at = |x: usize, y: usize| raw[y * n + x] as f64;

    // Central-difference gradients; borders stay zero.
    let mut g_col = Array2::<f64>::zeros((n, n));
    let mut g_row = Array2::<f64>::zeros((n, n));
    for y in 0..n {
        for x in 1..n - 1 {
            g_col[(y, x)] = at(x + 1, y) - at(x - 1, y);
        }
    }
    for y in 1..n - 1 {
        for x in 0..n {
            g_row[(y, x)] = at(x, y + 1) - at(x, y - 1);
        }
    }

    // Per-cell orientation histograms over unsigned angles [0, 180).
    let cells = n / CELL_SIDE;
    let mut hist = Array3::<f64>::zeros((cells, cells, ORIENTATIONS));
    let bin_width = 180.0 / ORIENTATIONS as f64;
    for y in 0..n {
        for x in 0..n {
            let gr = g_row[(y, x)];
            let gc = g_col[(y, x)];
            let magnitude = (gr * gr + gc * gc).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let mut angle = gr.atan2(gc).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            if angle >= 180.0 {
                angle -= 180.0;
            }
            let bin = ((angle / bin_width) as usize).min(ORIENTATIONS - 1);
            hist[(y / CELL_SIDE, x / CELL_SIDE, bin)] += magnitude;
        }
    }

    // Overlapping 2x2 blocks with L2-Hys normalization.
    let blocks = cells - BLOCK_SIDE + 1;
    let mut descriptor = Vec::with_capacity(blocks * blocks * BLOCK_SIDE * BLOCK_SIDE * ORIENTATIONS);
    let mut block = vec![0.0f64; BLOCK_SIDE * BLOCK_SIDE * ORIENTATIONS];
    for by in 0..blocks {
        for bx in 0..blocks {
            let mut idx = 0;
            for cy in 0..BLOCK_SIDE {
                for cx in 0..BLOCK_SIDE {
                    for o in 0..ORIENTATIONS {
                        block[idx] = hist[(by + cy, bx + cx, o)];
                        idx += 1;
                    }
                }
            }
            l2_hys(&mut block);
            descriptor.extend_from_slice(&block);
        }
    }
    descriptor
}

fn l2_hys(block: &mut [f64]) {
    let norm = |v: &[f64]| -> f64 {
        (v.iter().map(|x| x * x).sum::<f64>() + L2_HYS_EPS * L2_HYS_EPS).sqrt()
    };
    let n1 = norm(block);
    for v in block.iter_mut() {
        *v = (*v / n1).min(L2_HYS_CLIP);
    }
    let n2 = norm(block);
    for v in block.iter_mut() {
        *v /= n2;
    }
}
