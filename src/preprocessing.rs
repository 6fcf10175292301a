// src/preprocessing.rs
//
// Preprocessor stage: grayscale conversion, fixed 300x300 area resize,
// non-local-means denoising and min-max intensity normalization.

use crate::error::PipelineError;
use image::{GrayImage, RgbImage};
use ndarray::Array2;

/// Working resolution of the whole pipeline. The segmenter's Hough tuning
/// assumes this size.
pub const WORKING_SIZE: u32 = 300;

const NLM_STRENGTH: f32 = 10.0;
const NLM_SEARCH_WINDOW: usize = 21;
const NLM_TEMPLATE_WINDOW: usize = 7;

/// Preprocess a color frame into the normalized grayscale working image.
pub fn preprocess(frame: &RgbImage) -> Result<GrayImage, PipelineError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(PipelineError::PreprocessingFailed);
    }
    let gray = to_grayscale(frame);
    let resized = resize_area_gray(&gray, WORKING_SIZE, WORKING_SIZE);
    let denoised = nl_means_denoise(
        &resized,
        NLM_STRENGTH,
        NLM_SEARCH_WINDOW,
        NLM_TEMPLATE_WINDOW,
    );
    Ok(normalize_minmax(&denoised))
}

/// Luminance conversion with the standard BT.601 weights.
pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(frame.width(), frame.height());
    for (x, y, px) in frame.enumerate_pixels() {
        let [r, g, b] = px.0;
        let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        out.put_pixel(x, y, image::Luma([v.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Area-averaging resize for single-channel images. Each destination pixel
/// averages the source box it covers, with fractional edge coverage, which
/// keeps sensor noise down compared to nearest/bilinear sampling.
pub fn resize_area_gray(src: &GrayImage, dst_w: u32, dst_h: u32) -> GrayImage {
    let data = resize_area(src.as_raw(), src.width() as usize, src.height() as usize, 1, dst_w as usize, dst_h as usize);
    GrayImage::from_raw(dst_w, dst_h, data).expect("resize buffer size")
}

/// Area-averaging resize for RGB images.
pub fn resize_area_rgb(src: &RgbImage, dst_w: u32, dst_h: u32) -> RgbImage {
    let data = resize_area(src.as_raw(), src.width() as usize, src.height() as usize, 3, dst_w as usize, dst_h as usize);
    RgbImage::from_raw(dst_w, dst_h, data).expect("resize buffer size")
}

fn resize_area(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    if src_w == dst_w && src_h == dst_h {
        return src.to_vec();
    }
    let mut dst = vec![0u8; dst_w * dst_h * channels];
    let x_ratio = src_w as f64 / dst_w as f64;
    let y_ratio = src_h as f64 / dst_h as f64;

    for dy in 0..dst_h {
        let sy0 = dy as f64 * y_ratio;
        let sy1 = (dy as f64 + 1.0) * y_ratio;
        for dx in 0..dst_w {
            let sx0 = dx as f64 * x_ratio;
            let sx1 = (dx as f64 + 1.0) * x_ratio;

            let mut acc = [0.0f64; 3];
            let mut weight_sum = 0.0f64;

            let y_start = sy0.floor() as usize;
            let y_end = (sy1.ceil() as usize).min(src_h);
            let x_start = sx0.floor() as usize;
            let x_end = (sx1.ceil() as usize).min(src_w);

            for sy in y_start..y_end {
                let wy = overlap(sy as f64, sy as f64 + 1.0, sy0, sy1);
                if wy <= 0.0 {
                    continue;
                }
                for sx in x_start..x_end {
                    let wx = overlap(sx as f64, sx as f64 + 1.0, sx0, sx1);
                    if wx <= 0.0 {
                        continue;
                    }
                    let w = wx * wy;
                    let base = (sy * src_w + sx) * channels;
                    for c in 0..channels {
                        acc[c] += w * src[base + c] as f64;
                    }
                    weight_sum += w;
                }
            }

            let base = (dy * dst_w + dx) * channels;
            for c in 0..channels {
                dst[base + c] = (acc[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    dst
}

#[inline]
fn overlap(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

/// Non-local-means denoising: every pixel is replaced by a weighted average
/// of pixels with similar patch neighborhoods inside a search window.
///
/// Computed per shift offset with an integral image over squared patch
/// differences, so the cost is O(pixels * search_area) rather than
/// O(pixels * search_area * patch_area).
pub fn nl_means_denoise(
    src: &GrayImage,
    strength: f32,
    search_window: usize,
    template_window: usize,
) -> GrayImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let search_r = (search_window / 2) as i64;
    let patch_r = (template_window / 2) as i64;
    let patch_area = (template_window * template_window) as f64;
    let h2 = (strength as f64) * (strength as f64);

    let img: Vec<f64> = src.as_raw().iter().map(|&v| v as f64).collect();
    let at = |x: i64, y: i64| -> f64 {
        let xc = x.clamp(0, w as i64 - 1) as usize;
        let yc = y.clamp(0, h as i64 - 1) as usize;
        img[yc * w + xc]
    };

    let mut num = vec![0.0f64; w * h];
    let mut den = vec![0.0f64; w * h];
    let mut diff2 = Array2::<f64>::zeros((h, w));
    let mut integral = Array2::<f64>::zeros((h + 1, w + 1));

    for oy in -search_r..=search_r {
        for ox in -search_r..=search_r {
            for y in 0..h {
                for x in 0..w {
                    let d = img[y * w + x] - at(x as i64 + ox, y as i64 + oy);
                    diff2[(y, x)] = d * d;
                }
            }
            // Summed-area table of the squared differences.
            for y in 0..h {
                let mut row = 0.0;
                for x in 0..w {
                    row += diff2[(y, x)];
                    integral[(y + 1, x + 1)] = integral[(y, x + 1)] + row;
                }
            }
            let box_sum = |x: i64, y: i64| -> f64 {
                let x0 = (x - patch_r).clamp(0, w as i64) as usize;
                let y0 = (y - patch_r).clamp(0, h as i64) as usize;
                let x1 = (x + patch_r + 1).clamp(0, w as i64) as usize;
                let y1 = (y + patch_r + 1).clamp(0, h as i64) as usize;
                integral[(y1, x1)] - integral[(y0, x1)] - integral[(y1, x0)]
                    + integral[(y0, x0)]
            };

            for y in 0..h {
                for x in 0..w {
                    let ssd = box_sum(x as i64, y as i64) / patch_area;
                    let weight = (-ssd / h2).exp();
                    num[y * w + x] += weight * at(x as i64 + ox, y as i64 + oy);
                    den[y * w + x] += weight;
                }
            }
        }
    }

    let mut out = GrayImage::new(src.width(), src.height());
    for y in 0..h {
        for x in 0..w {
            let v = (num[y * w + x] / den[y * w + x]).round().clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, image::Luma([v as u8]));
        }
    }
    out
}

/// Min-max stretch to the full [0,255] span. A flat image maps to all zeros.
pub fn normalize_minmax(src: &GrayImage) -> GrayImage {
    let raw = src.as_raw();
    let min = raw.iter().copied().min().unwrap_or(0);
    let max = raw.iter().copied().max().unwrap_or(0);
    if max == min {
        return GrayImage::new(src.width(), src.height());
    }
    let range = (max - min) as f32;
    let data: Vec<u8> = raw
        .iter()
        .map(|&v| (((v - min) as f32 / range) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(src.width(), src.height(), data).expect("normalize buffer size")
}
