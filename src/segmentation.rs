// src/segmentation.rs
//
// Segmenter stage: Gaussian smoothing, gradient-based Hough circle
// detection and solid-disc mask construction. Tuning constants assume the
// fixed 300x300 working resolution.

use crate::error::PipelineError;
use crate::types::{CircleCandidate, Mask};
use image::GrayImage;
use ndarray::Array2;

const BLUR_KERNEL: usize = 9;
const BLUR_SIGMA: f32 = 2.0;

/// Accumulator resolution divisor (accumulator is coarser than the image).
const HOUGH_DP: f32 = 1.2;
/// Minimum separation between retained candidate centers, in pixels.
const HOUGH_MIN_DIST: f32 = 100.0;
/// Upper Canny edge threshold; the lower threshold is half of it.
const HOUGH_EDGE_THRESHOLD: f32 = 50.0;
/// Minimum accumulator votes for a center, and minimum radius support.
const HOUGH_ACC_THRESHOLD: u32 = 30;
const MIN_RADIUS: u32 = 50;
const MAX_RADIUS: u32 = 150;

/// Output of the segmenter: grayscale frame masked to the detected disc,
/// the binary mask, and the retained circle candidate (if any).
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub segmented: GrayImage,
    pub mask: Mask,
    pub candidate: Option<CircleCandidate>,
}

/// Segment the coin region of a preprocessed grayscale frame.
///
/// No detected circle is a valid outcome, signalled by an empty mask and
/// `candidate == None`, never by an error.
pub fn segment(gray: &GrayImage) -> Result<Segmentation, PipelineError> {
    if gray.width() == 0 || gray.height() == 0 {
        return Err(PipelineError::SegmentationFailed);
    }

    let blurred = gaussian_blur(gray, BLUR_KERNEL, BLUR_SIGMA);
    let mut candidates = hough_circles(&blurred);

    // Detector ranking: strongest accumulator response first. Only the
    // top candidate is kept; one coin per frame is assumed.
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
    let candidate = candidates.first().copied();

    let mask = match &candidate {
        Some(circle) => Mask::from_disc(gray.width(), gray.height(), circle),
        None => Mask::empty(gray.width(), gray.height()),
    };

    let segmented = apply_mask(gray, &mask);
    Ok(Segmentation {
        segmented,
        mask,
        candidate,
    })
}

/// Grayscale frame with every non-mask pixel forced to 0.
pub fn apply_mask(gray: &GrayImage, mask: &Mask) -> GrayImage {
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, px) in gray.enumerate_pixels() {
        if mask.contains(x, y) {
            out.put_pixel(x, y, *px);
        }
    }
    out
}

/// Separable Gaussian blur with reflect-101 border handling.
pub fn gaussian_blur(src: &GrayImage, ksize: usize, sigma: f32) -> GrayImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let r = (ksize / 2) as i64;

    let mut kernel = vec![0.0f64; ksize];
    let s2 = 2.0 * (sigma as f64) * (sigma as f64);
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f64 - r as f64;
        *k = (-d * d / s2).exp();
    }
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }

    let reflect = |i: i64, n: i64| -> usize {
        let mut i = i;
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
        i.clamp(0, n - 1) as usize
    };

    let raw = src.as_raw();
    let mut horizontal = vec![0.0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sx = reflect(x as i64 + i as i64 - r, w as i64);
                acc += k * raw[y * w + sx] as f64;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = GrayImage::new(src.width(), src.height());
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sy = reflect(y as i64 + i as i64 - r, h as i64);
                acc += k * horizontal[sy * w + x];
            }
            out.put_pixel(x as u32, y as u32, image::Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// 3x3 Sobel gradients, (gx, gy) per pixel. Borders are zero.
fn sobel(src: &GrayImage) -> (Array2<f32>, Array2<f32>) {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let raw = src.as_raw();
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));
    let at = |x: usize, y: usize| raw[y * w + x] as f32;
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            gx[(y, x)] = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            gy[(y, x)] = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
        }
    }
    (gx, gy)
}

/// Canny edge map: non-maximum suppression along the gradient direction
/// plus hysteresis between `high` and `high / 2`.
fn canny_edges(gx: &Array2<f32>, gy: &Array2<f32>, high: f32) -> Array2<bool> {
    let (h, w) = gx.dim();
    let low = high / 2.0;

    let mut mag = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            mag[(y, x)] = gx[(y, x)].abs() + gy[(y, x)].abs();
        }
    }

    // 0 = strong, 1 = weak, 2 = suppressed
    let mut grade = Array2::<u8>::from_elem((h, w), 2);
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let m = mag[(y, x)];
            if m < low {
                continue;
            }
            let dx = gx[(y, x)];
            let dy = gy[(y, x)];
            // Quantize the gradient direction into four sectors and compare
            // against the two neighbors along it.
            let (n1, n2) = if dx.abs() > 2.414 * dy.abs() {
                (mag[(y, x - 1)], mag[(y, x + 1)])
            } else if dy.abs() > 2.414 * dx.abs() {
                (mag[(y - 1, x)], mag[(y + 1, x)])
            } else if dx * dy > 0.0 {
                (mag[(y - 1, x - 1)], mag[(y + 1, x + 1)])
            } else {
                (mag[(y - 1, x + 1)], mag[(y + 1, x - 1)])
            };
            if m >= n1 && m >= n2 {
                grade[(y, x)] = if m >= high { 0 } else { 1 };
            }
        }
    }

    // Hysteresis: weak edges survive only when connected to a strong one.
    let mut edges = Array2::<bool>::from_elem((h, w), false);
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if grade[(y, x)] == 0 && !edges[(y, x)] {
                edges[(y, x)] = true;
                stack.push((x, y));
                while let Some((cx, cy)) = stack.pop() {
                    for ny in cy.saturating_sub(1)..=(cy + 1).min(h - 1) {
                        for nx in cx.saturating_sub(1)..=(cx + 1).min(w - 1) {
                            if !edges[(ny, nx)] && grade[(ny, nx)] <= 1 {
                                edges[(ny, nx)] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                }
            }
        }
    }
    edges
}

/// Gradient Hough transform for circles.
///
/// Each edge pixel votes for potential centers along its gradient
/// direction, both inward and outward, across the whole radius range.
/// Center peaks are then confirmed by a radius histogram over supporting
/// edge pixels. Candidates come back ordered by accumulator response.
pub fn hough_circles(gray: &GrayImage) -> Vec<CircleCandidate> {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let (gx, gy) = sobel(gray);
    let edges = canny_edges(&gx, &gy, HOUGH_EDGE_THRESHOLD);

    let acc_w = (w as f32 / HOUGH_DP).ceil() as usize;
    let acc_h = (h as f32 / HOUGH_DP).ceil() as usize;
    let mut acc = Array2::<u32>::zeros((acc_h, acc_w));

    let mut edge_points: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if !edges[(y, x)] {
                continue;
            }
            let dx = gx[(y, x)];
            let dy = gy[(y, x)];
            let mag = (dx * dx + dy * dy).sqrt();
            if mag < 1e-3 {
                continue;
            }
            edge_points.push((x, y));
            let ux = dx / mag;
            let uy = dy / mag;
            for sign in [1.0f32, -1.0] {
                for r in MIN_RADIUS..=MAX_RADIUS {
                    let cx = x as f32 + sign * r as f32 * ux;
                    let cy = y as f32 + sign * r as f32 * uy;
                    if cx < 0.0 || cy < 0.0 {
                        continue;
                    }
                    let ax = (cx / HOUGH_DP) as usize;
                    let ay = (cy / HOUGH_DP) as usize;
                    if ax < acc_w && ay < acc_h {
                        acc[(ay, ax)] += 1;
                    }
                }
            }
        }
    }

    // Local maxima above threshold, strongest first.
    let mut peaks: Vec<(u32, usize, usize)> = Vec::new();
    for y in 1..acc_h.saturating_sub(1) {
        for x in 1..acc_w.saturating_sub(1) {
            let v = acc[(y, x)];
            if v < HOUGH_ACC_THRESHOLD {
                continue;
            }
            if v >= acc[(y, x - 1)]
                && v > acc[(y, x + 1)]
                && v >= acc[(y - 1, x)]
                && v > acc[(y + 1, x)]
            {
                peaks.push((v, x, y));
            }
        }
    }
    peaks.sort_by(|a, b| b.0.cmp(&a.0));

    let mut candidates: Vec<CircleCandidate> = Vec::new();
    for (votes, ax, ay) in peaks {
        let cx = (ax as f32 + 0.5) * HOUGH_DP;
        let cy = (ay as f32 + 0.5) * HOUGH_DP;
        if candidates.iter().any(|c| {
            let dx = c.cx - cx;
            let dy = c.cy - cy;
            (dx * dx + dy * dy).sqrt() < HOUGH_MIN_DIST
        }) {
            continue;
        }
        if let Some(radius) = estimate_radius(&edge_points, cx, cy) {
            candidates.push(CircleCandidate {
                cx,
                cy,
                radius,
                votes,
            });
        }
    }
    candidates
}

/// Most common edge-pixel distance from the center within the radius range.
/// Requires at least the accumulator threshold worth of support.
fn estimate_radius(edge_points: &[(usize, usize)], cx: f32, cy: f32) -> Option<f32> {
    let mut hist = vec![0u32; (MAX_RADIUS + 2) as usize];
    for &(x, y) in edge_points {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt().round() as u32;
        if (MIN_RADIUS..=MAX_RADIUS).contains(&d) {
            hist[d as usize] += 1;
        }
    }
    let (best_r, &best_count) = hist
        .iter()
        .enumerate()
        .max_by_key(|(_, &count)| count)?;
    if best_count >= HOUGH_ACC_THRESHOLD {
        Some(best_r as f32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disc_image(w: u32, h: u32, cx: f32, cy: f32, r: f32, value: u8) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if (dx * dx + dy * dy).sqrt() <= r {
                    img.put_pixel(x, y, Luma([value]));
                }
            }
        }
        img
    }

    #[test]
    fn test_blur_preserves_flat_image() {
        let img = GrayImage::from_pixel(50, 50, Luma([200]));
        let out = gaussian_blur(&img, 9, 2.0);
        assert!(out.as_raw().iter().all(|&v| v == 200));
    }

    #[test]
    fn test_segment_black_frame_yields_empty_mask() {
        let img = GrayImage::new(300, 300);
        let seg = segment(&img).unwrap();
        assert!(seg.mask.is_empty());
        assert!(seg.candidate.is_none());
        assert!(seg.segmented.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_segment_detects_centered_disc() {
        let img = disc_image(300, 300, 150.0, 150.0, 80.0, 255);
        let seg = segment(&img).unwrap();
        let candidate = seg.candidate.expect("disc should be detected");
        assert!((candidate.cx - 150.0).abs() <= 3.0, "cx = {}", candidate.cx);
        assert!((candidate.cy - 150.0).abs() <= 3.0, "cy = {}", candidate.cy);
        assert!(
            (MIN_RADIUS as f32..=MAX_RADIUS as f32).contains(&candidate.radius),
            "radius = {}",
            candidate.radius
        );
        assert!((candidate.radius - 80.0).abs() <= 5.0);
        assert!(!seg.mask.is_empty());
    }

    #[test]
    fn test_segment_retains_single_candidate_for_two_discs() {
        // Two discs far apart; only the top-ranked one is kept.
        let mut img = disc_image(300, 300, 80.0, 80.0, 60.0, 255);
        let second = disc_image(300, 300, 230.0, 230.0, 55.0, 255);
        for (x, y, px) in second.enumerate_pixels() {
            if px[0] > 0 {
                img.put_pixel(x, y, *px);
            }
        }
        let seg = segment(&img).unwrap();
        assert!(seg.candidate.is_some());
    }

    #[test]
    fn test_segmented_pixels_outside_mask_are_zero() {
        let img = disc_image(300, 300, 150.0, 150.0, 80.0, 200);
        let seg = segment(&img).unwrap();
        for (x, y, px) in seg.segmented.enumerate_pixels() {
            if !seg.mask.contains(x, y) {
                assert_eq!(px[0], 0);
            }
        }
    }

    #[test]
    fn test_segment_rejects_empty_input() {
        let img = GrayImage::new(0, 0);
        assert!(matches!(
            segment(&img),
            Err(PipelineError::SegmentationFailed)
        ));
    }

    #[test]
    fn test_small_circle_below_min_radius_ignored() {
        let img = disc_image(300, 300, 150.0, 150.0, 20.0, 255);
        let seg = segment(&img).unwrap();
        assert!(seg.candidate.is_none());
        assert!(seg.mask.is_empty());
    }
}
