// src/features/shape.rs
//
// Shape descriptors of the mask's outer contour: area, perimeter,
// circularity, bounding-box aspect ratio, extent and solidity. Every ratio
// with a zero denominator is defined as 0.0 rather than a division fault.

use crate::features::FeatureMap;
use crate::types::Mask;
use ndarray::Array2;

pub const KEYS: [&str; 6] = [
    "area",
    "perimeter",
    "circularity",
    "aspect_ratio",
    "extent",
    "solidity",
];

pub fn extract(mask: &Mask) -> FeatureMap {
    if mask.is_empty() {
        return default_features();
    }

    let contours = find_external_contours(mask);
    let largest = contours
        .into_iter()
        .max_by(|a, b| {
            polygon_area(a)
                .partial_cmp(&polygon_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    let Some(contour) = largest else {
        return default_features();
    };

    let area = polygon_area(&contour);
    // The raw 8-connected trace overshoots a smooth boundary's length with
    // its staircase steps; measure the perimeter over a simplified polygon.
    let perimeter = polygon_perimeter(&simplify_contour(&contour, PERIMETER_EPSILON));
    let circularity = if perimeter > 0.0 {
        4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
    } else {
        0.0
    };

    let (min_x, min_y, max_x, max_y) = bounding_box(&contour);
    let bb_w = (max_x - min_x + 1) as f64;
    let bb_h = (max_y - min_y + 1) as f64;
    let aspect_ratio = if bb_h > 0.0 { bb_w / bb_h } else { 0.0 };
    let bb_area = bb_w * bb_h;
    let extent = if bb_area > 0.0 { area / bb_area } else { 0.0 };

    let hull = convex_hull(&contour);
    let hull_area = polygon_area(&hull);
    let solidity = if hull_area > 0.0 { area / hull_area } else { 0.0 };

    let mut features = FeatureMap::new();
    features.insert("area", area);
    features.insert("perimeter", perimeter);
    features.insert("circularity", circularity);
    features.insert("aspect_ratio", aspect_ratio);
    features.insert("extent", extent);
    features.insert("solidity", solidity);
    features
}

fn default_features() -> FeatureMap {
    let mut features = FeatureMap::new();
    for key in KEYS {
        features.insert(key, 0.0);
    }
    features
}

/// Outer boundary of every 8-connected foreground component, as ordered
/// pixel-coordinate polygons (Moore-neighbor tracing).
pub fn find_external_contours(mask: &Mask) -> Vec<Vec<(i64, i64)>> {
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    let mut labeled = Array2::<bool>::from_elem((h, w), false);
    let mut contours = Vec::new();

    let fg = |x: i64, y: i64| -> bool {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && mask.contains(x as u32, y as u32)
    };

    for y in 0..h {
        for x in 0..w {
            if !mask.contains(x as u32, y as u32) || labeled[(y, x)] {
                continue;
            }
            let limit = 4 * (w + 2) * (h + 2);
            contours.push(trace_boundary((x as i64, y as i64), limit, &fg));
            // Flood the whole component so it is traced only once.
            let mut stack = vec![(x, y)];
            labeled[(y, x)] = true;
            while let Some((cx, cy)) = stack.pop() {
                for ny in cy.saturating_sub(1)..=(cy + 1).min(h - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(w - 1) {
                        if mask.contains(nx as u32, ny as u32) && !labeled[(ny, nx)] {
                            labeled[(ny, nx)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    contours
}

/// Moore-neighbor boundary trace starting from the component's first pixel
/// in scan order (topmost, then leftmost). Walks clockwise, keeping an
/// explicit backtrack pixel; terminates on Jacob's criterion (start revisited
/// with the original backtrack).
fn trace_boundary(
    start: (i64, i64),
    limit: usize,
    fg: &dyn Fn(i64, i64) -> bool,
) -> Vec<(i64, i64)> {
    // Clockwise neighborhood with y growing downwards: E, SE, S, SW, W, NW, N, NE.
    const DIRS: [(i64, i64); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];

    // Scan order guarantees the west neighbor of `start` is background.
    let backtrack_start = (start.0 - 1, start.1);
    let mut contour = vec![start];
    let mut current = start;
    let mut backtrack = backtrack_start;

    for _ in 0..limit {
        let rel = (backtrack.0 - current.0, backtrack.1 - current.1);
        let idx = DIRS.iter().position(|&d| d == rel).unwrap_or(4);
        let mut moved = false;
        let mut prev = backtrack;
        for i in 1..=8 {
            let d = DIRS[(idx + i) % 8];
            let next = (current.0 + d.0, current.1 + d.1);
            if fg(next.0, next.1) {
                backtrack = prev;
                current = next;
                moved = true;
                break;
            }
            prev = next;
        }
        if !moved {
            // Isolated single pixel.
            break;
        }
        if current == start && backtrack == backtrack_start {
            break;
        }
        contour.push(current);
    }
    contour
}

/// Deviation tolerance for perimeter measurement. One pixel covers the
/// rasterization jitter of a straight edge without eating real corners.
const PERIMETER_EPSILON: f64 = 1.0;

/// Closed-contour simplification (Ramer-Douglas-Peucker): collapses
/// collinear runs and staircase jags within `epsilon` into single segments.
pub fn simplify_contour(contour: &[(i64, i64)], epsilon: f64) -> Vec<(i64, i64)> {
    if contour.len() < 3 {
        return contour.to_vec();
    }
    // Split the ring at the vertex farthest from the start so both arcs
    // have distinct endpoints.
    let start = contour[0];
    let far = contour
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|(_, a), (_, b)| {
            dist2(start, **a)
                .partial_cmp(&dist2(start, **b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(contour.len() / 2);

    let mut out = vec![start];
    rdp(&contour[..=far], epsilon, &mut out);
    let mut back: Vec<(i64, i64)> = contour[far..].to_vec();
    back.push(start);
    rdp(&back, epsilon, &mut out);
    // The wrap-around duplicate of the start point.
    out.pop();
    out
}

fn rdp(points: &[(i64, i64)], epsilon: f64, out: &mut Vec<(i64, i64)>) {
    if points.len() < 3 {
        if let Some(&last) = points.last() {
            out.push(last);
        }
        return;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let mut max_d = 0.0;
    let mut idx = 0;
    for (i, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = point_segment_distance(p, first, last);
        if d > max_d {
            max_d = d;
            idx = i;
        }
    }
    if max_d > epsilon {
        rdp(&points[..=idx], epsilon, out);
        rdp(&points[idx..], epsilon, out);
    } else {
        out.push(last);
    }
}

fn dist2(a: (i64, i64), b: (i64, i64)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    dx * dx + dy * dy
}

fn point_segment_distance(p: (i64, i64), a: (i64, i64), b: (i64, i64)) -> f64 {
    let dx = (b.0 - a.0) as f64;
    let dy = (b.1 - a.1) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return dist2(p, a).sqrt();
    }
    let px = (p.0 - a.0) as f64;
    let py = (p.1 - a.1) as f64;
    (dx * py - dy * px).abs() / len
}

/// Shoelace area of a closed pixel-coordinate polygon.
pub fn polygon_area(polygon: &[(i64, i64)]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0i64;
    for i in 0..polygon.len() {
        let (x0, y0) = polygon[i];
        let (x1, y1) = polygon[(i + 1) % polygon.len()];
        sum += x0 * y1 - x1 * y0;
    }
    (sum.abs() as f64) / 2.0
}

/// Closed polyline length of the contour.
pub fn polygon_perimeter(polygon: &[(i64, i64)]) -> f64 {
    if polygon.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..polygon.len() {
        let (x0, y0) = polygon[i];
        let (x1, y1) = polygon[(i + 1) % polygon.len()];
        let dx = (x1 - x0) as f64;
        let dy = (y1 - y0) as f64;
        total += (dx * dx + dy * dy).sqrt();
    }
    total
}

fn bounding_box(polygon: &[(i64, i64)]) -> (i64, i64, i64, i64) {
    let mut min_x = i64::MAX;
    let mut min_y = i64::MAX;
    let mut max_x = i64::MIN;
    let mut max_y = i64::MIN;
    for &(x, y) in polygon {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

/// Convex hull via Andrew's monotone chain.
pub fn convex_hull(points: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut pts: Vec<(i64, i64)> = points.to_vec();
    pts.sort();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| -> i64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CircleCandidate;

    fn disc_mask(r: f32) -> Mask {
        Mask::from_disc(
            300,
            300,
            &CircleCandidate {
                cx: 150.0,
                cy: 150.0,
                radius: r,
                votes: 1,
            },
        )
    }

    #[test]
    fn test_empty_mask_defaults() {
        let features = extract(&Mask::empty(300, 300));
        assert_eq!(features.len(), KEYS.len());
        for key in KEYS {
            assert_eq!(features.get(key), Some(0.0), "{key}");
        }
    }

    #[test]
    fn test_disc_circularity_near_one() {
        let features = extract(&disc_mask(80.0));
        let circularity = features.get("circularity").unwrap();
        assert!(circularity >= 0.9, "circularity = {circularity}");
        assert!(circularity <= 1.1, "circularity = {circularity}");
    }

    #[test]
    fn test_disc_ratios() {
        let features = extract(&disc_mask(80.0));
        let aspect = features.get("aspect_ratio").unwrap();
        assert!((aspect - 1.0).abs() < 0.05, "aspect = {aspect}");
        // Extent of a disc in its bounding square is pi/4.
        let extent = features.get("extent").unwrap();
        assert!((extent - std::f64::consts::FRAC_PI_4).abs() < 0.05, "extent = {extent}");
        let solidity = features.get("solidity").unwrap();
        assert!(solidity >= 0.95, "solidity = {solidity}");
        assert!(solidity <= 1.01, "solidity = {solidity}");
    }

    #[test]
    fn test_disc_area_and_perimeter_scale() {
        let features = extract(&disc_mask(80.0));
        let area = features.get("area").unwrap();
        let perimeter = features.get("perimeter").unwrap();
        let expected_area = std::f64::consts::PI * 80.0 * 80.0;
        assert!((area - expected_area).abs() / expected_area < 0.05, "area = {area}");
        let expected_perimeter = 2.0 * std::f64::consts::PI * 80.0;
        assert!(perimeter >= expected_perimeter * 0.95, "perimeter = {perimeter}");
        assert!(perimeter <= expected_perimeter * 1.15, "perimeter = {perimeter}");
    }

    #[test]
    fn test_single_pixel_mask_guards() {
        let mut img = image::GrayImage::new(50, 50);
        img.put_pixel(25, 25, image::Luma([255]));
        let features = extract(&Mask::from_image(img));
        // Degenerate contour: all ratio features fall back to 0.0, never NaN.
        assert_eq!(features.get("area"), Some(0.0));
        assert_eq!(features.get("perimeter"), Some(0.0));
        assert_eq!(features.get("circularity"), Some(0.0));
        assert_eq!(features.get("aspect_ratio"), Some(1.0));
        assert_eq!(features.get("extent"), Some(0.0));
        assert_eq!(features.get("solidity"), Some(0.0));
        for key in KEYS {
            assert!(features.get(key).unwrap().is_finite());
        }
    }

    #[test]
    fn test_largest_of_two_components_wins() {
        let mut img = image::GrayImage::new(300, 300);
        // Big square 100x100 and a far-away small square 10x10.
        for y in 20..120 {
            for x in 20..120 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        for y in 250..260 {
            for x in 250..260 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        let features = extract(&Mask::from_image(img));
        let area = features.get("area").unwrap();
        assert!((area - 99.0 * 99.0).abs() < 1.0, "area = {area}");
        let aspect = features.get("aspect_ratio").unwrap();
        assert!((aspect - 1.0).abs() < 1e-9);
        let solidity = features.get("solidity").unwrap();
        assert!((solidity - 1.0).abs() < 1e-9, "solidity = {solidity}");
    }

    #[test]
    fn test_simplify_collapses_staircase_run() {
        // A pixel staircase along a shallow line; its per-step length
        // overshoots the chord, the simplified polygon must not.
        let mut contour = Vec::new();
        for i in 0..20i64 {
            contour.push((2 * i, i / 2 + (i % 2)));
        }
        contour.push((38, 30));
        contour.push((0, 30));
        let simplified = simplify_contour(&contour, 1.0);
        assert!(simplified.len() < contour.len());
        let chord = ((38.0f64 * 38.0) + (10.0 * 10.0)).sqrt();
        let run: f64 = simplified
            .windows(2)
            .take_while(|w| w[1].1 <= 11)
            .map(|w| dist2(w[0], w[1]).sqrt())
            .sum();
        assert!(run <= chord * 1.02, "run = {run}, chord = {chord}");
    }

    #[test]
    fn test_simplified_disc_perimeter_matches_circle() {
        let contours = find_external_contours(&disc_mask(80.0));
        let contour = &contours[0];
        let raw = polygon_perimeter(contour);
        let simplified = polygon_perimeter(&simplify_contour(contour, 1.0));
        let ideal = 2.0 * std::f64::consts::PI * 80.0;
        // The raw trace overshoots; the simplified polygon lands within 2%.
        assert!(raw > ideal, "raw = {raw}");
        assert!((simplified - ideal).abs() / ideal < 0.02, "simplified = {simplified}");
    }

    #[test]
    fn test_convex_hull_of_square() {
        let pts = vec![(0, 0), (4, 0), (4, 4), (0, 4), (2, 2), (1, 3)];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!((polygon_area(&hull) - 16.0).abs() < 1e-9);
    }
}
