// src/features/mod.rs
//
// Feature extraction: five independent extractors, each a pure function of
// (image, mask) -> named scalar features, plus the schema-driven assembler.

pub mod color;
pub mod hog;
pub mod hu;
pub mod lbp;
pub mod shape;

use image::{GrayImage, RgbImage};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::types::Mask;

/// Named scalar features produced by one extractor.
///
/// Merging is first-writer-wins: a key collision across extractors is a
/// contract violation, logged and then ignored so the earlier extractor's
/// value stays authoritative.
#[derive(Debug, Clone, Default)]
pub struct FeatureMap {
    values: HashMap<String, f64>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Merge `other` into `self`, keeping existing entries on collision.
    pub fn merge(&mut self, other: FeatureMap) {
        for (name, value) in other.values {
            if let Some(existing) = self.values.get(&name) {
                warn!(
                    feature = %name,
                    kept = existing,
                    dropped = value,
                    "feature key collision across extractors"
                );
            } else {
                self.values.insert(name, value);
            }
        }
    }
}

/// Externally supplied ordered feature-name contract. The core loads it,
/// never computes it; output vectors follow it exactly.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Run all five extractors and merge their outputs in a fixed order.
/// The invocation order is an efficiency detail only; assembly is entirely
/// schema-driven.
pub fn extract_all(segmented_gray: &GrayImage, mask: &Mask, color_frame: &RgbImage) -> FeatureMap {
    let mut merged = FeatureMap::new();
    merged.merge(shape::extract(mask));
    merged.merge(hu::extract(mask));
    merged.merge(lbp::extract(segmented_gray, mask));
    merged.merge(hog::extract(segmented_gray, mask));
    merged.merge(color::extract(color_frame, mask));
    merged
}

/// Build the ordered vector for the classifier. Length always equals the
/// schema length; names unknown to every extractor default to 0.0.
pub fn assemble(schema: &FeatureSchema, features: &FeatureMap) -> Vec<f64> {
    schema
        .names()
        .iter()
        .map(|name| features.get(name).unwrap_or(0.0))
        .collect()
}
