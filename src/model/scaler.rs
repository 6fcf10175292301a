// src/model/scaler.rs

use crate::model::{ModelError, Scaler};
use serde::Deserialize;

/// Per-feature standardization: `(x - mean) / scale`.
///
/// A zero scale entry (a feature that was constant at training time) is
/// treated as 1.0 so the feature passes through centered instead of
/// dividing by zero.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        if mean.len() != scale.len() {
            return Err(ModelError::new(format!(
                "scaler mean/scale length mismatch: {} vs {}",
                mean.len(),
                scale.len()
            )));
        }
        Ok(Self { mean, scale })
    }
}

impl Scaler for StandardScaler {
    fn expected_input_width(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, vector: &[f64]) -> Result<Vec<f64>, ModelError> {
        if vector.len() != self.mean.len() {
            return Err(ModelError::new(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                vector.len()
            )));
        }
        Ok(vector
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&m, &s))| {
                let s = if s == 0.0 { 1.0 } else { s };
                (x - m) / s
            })
            .collect())
    }
}
