// src/features/hu.rs
//
// Seven Hu moment invariants of the mask shape, log-transformed with sign
// preserved. Moments are intensity-weighted, so mask pixels count as 255,
// matching the trained models' feature distribution.

use crate::features::FeatureMap;
use crate::types::Mask;

pub const NUM_MOMENTS: usize = 7;

pub fn extract(mask: &Mask) -> FeatureMap {
    if mask.is_empty() {
        return default_features();
    }
    let hu = hu_moments(mask);
    let mut features = FeatureMap::new();
    for (i, &value) in hu.iter().enumerate() {
        features.insert(format!("hu_moment_{}", i + 1), log_transform(value));
    }
    features
}

fn default_features() -> FeatureMap {
    let mut features = FeatureMap::new();
    for i in 0..NUM_MOMENTS {
        features.insert(format!("hu_moment_{}", i + 1), 0.0);
    }
    features
}

/// `-sign(v) * log10(|v|)`, with an explicit 0.0 for a raw value of exactly
/// zero to avoid the log domain fault.
pub fn log_transform(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        -value.signum() * value.abs().log10()
    }
}

/// The seven rotation/scale/translation invariants from the mask's
/// normalized central moments.
pub fn hu_moments(mask: &Mask) -> [f64; NUM_MOMENTS] {
    let img = mask.as_image();

    // Raw moments, intensity weighted.
    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;
    for (x, y, px) in img.enumerate_pixels() {
        let v = px[0] as f64;
        if v == 0.0 {
            continue;
        }
        m00 += v;
        m10 += v * x as f64;
        m01 += v * y as f64;
    }
    if m00 == 0.0 {
        return [0.0; NUM_MOMENTS];
    }
    let cx = m10 / m00;
    let cy = m01 / m00;

    // Central moments up to third order.
    let mut mu20 = 0.0f64;
    let mut mu11 = 0.0f64;
    let mut mu02 = 0.0f64;
    let mut mu30 = 0.0f64;
    let mut mu21 = 0.0f64;
    let mut mu12 = 0.0f64;
    let mut mu03 = 0.0f64;
    for (x, y, px) in img.enumerate_pixels() {
        let v = px[0] as f64;
        if v == 0.0 {
            continue;
        }
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        mu20 += v * dx * dx;
        mu11 += v * dx * dy;
        mu02 += v * dy * dy;
        mu30 += v * dx * dx * dx;
        mu21 += v * dx * dx * dy;
        mu12 += v * dx * dy * dy;
        mu03 += v * dy * dy * dy;
    }

    // Scale-normalized moments.
    let n2 = m00.powf(2.0);
    let n3 = m00.powf(2.5);
    let eta20 = mu20 / n2;
    let eta11 = mu11 / n2;
    let eta02 = mu02 / n2;
    let eta30 = mu30 / n3;
    let eta21 = mu21 / n3;
    let eta12 = mu12 / n3;
    let eta03 = mu03 / n3;

    let h1 = eta20 + eta02;
    let h2 = (eta20 - eta02).powi(2) + 4.0 * eta11.powi(2);
    let h3 = (eta30 - 3.0 * eta12).powi(2) + (3.0 * eta21 - eta03).powi(2);
    let h4 = (eta30 + eta12).powi(2) + (eta21 + eta03).powi(2);
    let h5 = (eta30 - 3.0 * eta12)
        * (eta30 + eta12)
        * ((eta30 + eta12).powi(2) - 3.0 * (eta21 + eta03).powi(2))
        + (3.0 * eta21 - eta03)
            * (eta21 + eta03)
            * (3.0 * (eta30 + eta12).powi(2) - (eta21 + eta03).powi(2));
    let h6 = (eta20 - eta02) * ((eta30 + eta12).powi(2) - (eta21 + eta03).powi(2))
        + 4.0 * eta11 * (eta30 + eta12) * (eta21 + eta03);
    let h7 = (3.0 * eta21 - eta03)
        * (eta30 + eta12)
        * ((eta30 + eta12).powi(2) - 3.0 * (eta21 + eta03).powi(2))
        - (eta30 - 3.0 * eta12)
            * (eta21 + eta03)
            * (3.0 * (eta30 + eta12).powi(2) - (eta21 + eta03).powi(2));

    [h1, h2, h3, h4, h5, h6, h7]
}
