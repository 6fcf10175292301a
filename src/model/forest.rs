// src/model/forest.rs
//
// Random-forest classifier in the flat array-of-nodes encoding its
// training exporter writes: per tree, parallel arrays of split feature,
// threshold, child indices and leaf class counts. A node with left == -1
// is a leaf.

use crate::model::{Classifier, ModelError};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    feature: Vec<i32>,
    threshold: Vec<f64>,
    left: Vec<i32>,
    right: Vec<i32>,
    /// Per-node class counts; only meaningful at leaves.
    value: Vec<Vec<f64>>,
}

impl DecisionTree {
    /// Walk to a leaf and return its class-count row. The parallel arrays
    /// come from an external artifact, so every per-node access is checked;
    /// skewed lengths are a model error, never a panic.
    fn leaf_counts(&self, vector: &[f64]) -> Result<&[f64], ModelError> {
        let mut node = 0usize;
        for _ in 0..self.left.len() + 1 {
            let left = *self
                .left
                .get(node)
                .ok_or_else(|| ModelError::new(format!("tree node {node} out of bounds")))?;
            if left < 0 {
                return self
                    .value
                    .get(node)
                    .map(|row| row.as_slice())
                    .ok_or_else(|| ModelError::new(format!("missing value row for node {node}")));
            }
            let feature = *self
                .feature
                .get(node)
                .ok_or_else(|| ModelError::new(format!("missing split feature for node {node}")))?
                as usize;
            let threshold = *self
                .threshold
                .get(node)
                .ok_or_else(|| ModelError::new(format!("missing threshold for node {node}")))?;
            let right = *self
                .right
                .get(node)
                .ok_or_else(|| ModelError::new(format!("missing right child for node {node}")))?;
            let x = *vector.get(feature).ok_or_else(|| {
                ModelError::new(format!("split feature {feature} out of bounds"))
            })?;
            node = if x <= threshold {
                left as usize
            } else {
                right as usize
            };
        }
        Err(ModelError::new("tree walk did not reach a leaf"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    classes: Vec<String>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn check(&self) -> Result<(), ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::new("forest has no classes"));
        }
        if self.trees.is_empty() {
            return Err(ModelError::new("forest has no trees"));
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict(&self, vector: &[f64]) -> Result<String, ModelError> {
        let proba = self.predict_proba(vector)?;
        let best = proba
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .ok_or_else(|| ModelError::new("empty probability distribution"))?;
        Ok(self.classes[best].clone())
    }

    fn predict_proba(&self, vector: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check()?;
        let mut averaged = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            let counts = tree.leaf_counts(vector)?;
            if counts.len() != self.classes.len() {
                return Err(ModelError::new(format!(
                    "leaf width {} does not match {} classes",
                    counts.len(),
                    self.classes.len()
                )));
            }
            let total: f64 = counts.iter().sum();
            if total > 0.0 {
                for (avg, &count) in averaged.iter_mut().zip(counts) {
                    *avg += count / total;
                }
            }
        }
        let n = self.trees.len() as f64;
        for p in averaged.iter_mut() {
            *p /= n;
        }
        Ok(averaged)
    }
}
