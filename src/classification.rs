// src/classification.rs
//
// Classification adapter: width precondition, scaler transform, then both
// classifiers. The one place where collaborator failures are converted
// into a reported error instead of crossing the pipeline boundary.

use crate::error::PipelineError;
use crate::model::{Classifier, Scaler};
use crate::types::ClassificationResult;

/// Scale the assembled vector and run the type and side classifiers.
///
/// The vector length is checked against the scaler's expected width before
/// anything is invoked; a mismatch means schema/model version skew and
/// comes back as `FeatureShapeMismatch` without touching the classifiers.
pub fn classify(
    vector: &[f64],
    scaler: &dyn Scaler,
    type_model: &dyn Classifier,
    side_model: &dyn Classifier,
) -> ClassificationResult {
    let expected = scaler.expected_input_width();
    if vector.len() != expected {
        return ClassificationResult::failure(PipelineError::FeatureShapeMismatch {
            expected,
            actual: vector.len(),
        });
    }

    match run_models(vector, scaler, type_model, side_model) {
        Ok(result) => result,
        Err(cause) => {
            ClassificationResult::failure(PipelineError::PredictionFailed(cause.to_string()))
        }
    }
}

fn run_models(
    vector: &[f64],
    scaler: &dyn Scaler,
    type_model: &dyn Classifier,
    side_model: &dyn Classifier,
) -> Result<ClassificationResult, crate::model::ModelError> {
    let scaled = scaler.transform(vector)?;
    let coin_type = type_model.predict(&scaled)?;
    let type_confidence = max_probability(&type_model.predict_proba(&scaled)?) * 100.0;
    let coin_side = side_model.predict(&scaled)?;
    let side_confidence = max_probability(&side_model.predict_proba(&scaled)?) * 100.0;
    Ok(ClassificationResult::success(
        coin_type,
        coin_side,
        type_confidence,
        side_confidence,
    ))
}

fn max_probability(distribution: &[f64]) -> f64 {
    distribution.iter().copied().fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, Scaler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PassthroughScaler {
        width: usize,
    }

    impl Scaler for PassthroughScaler {
        fn expected_input_width(&self) -> usize {
            self.width
        }

        fn transform(&self, vector: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(vector.to_vec())
        }
    }

    struct FixedClassifier {
        label: &'static str,
        proba: Vec<f64>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(label: &'static str, proba: Vec<f64>) -> Self {
            Self {
                label,
                proba,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn predict(&self, _vector: &[f64]) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.label.to_string())
        }

        fn predict_proba(&self, _vector: &[f64]) -> Result<Vec<f64>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.proba.clone())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _vector: &[f64]) -> Result<String, ModelError> {
            Err(ModelError::new("tree walk out of bounds"))
        }

        fn predict_proba(&self, _vector: &[f64]) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::new("tree walk out of bounds"))
        }
    }

    #[test]
    fn test_width_mismatch_skips_classifiers() {
        let scaler = PassthroughScaler { width: 67 };
        let type_model = FixedClassifier::new("R5", vec![0.9, 0.1]);
        let side_model = FixedClassifier::new("heads", vec![0.6, 0.4]);
        let result = classify(&[1.0; 10], &scaler, &type_model, &side_model);
        assert_eq!(
            result.error,
            Some(PipelineError::FeatureShapeMismatch {
                expected: 67,
                actual: 10
            })
        );
        assert_eq!(type_model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(side_model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_confidence_is_max_probability_percentage() {
        let scaler = PassthroughScaler { width: 3 };
        let type_model = FixedClassifier::new("R2", vec![0.15, 0.7, 0.15]);
        let side_model = FixedClassifier::new("tails", vec![0.45, 0.55]);
        let result = classify(&[0.0, 1.0, 2.0], &scaler, &type_model, &side_model);
        assert!(result.is_ok());
        assert_eq!(result.coin_type, "R2");
        assert_eq!(result.coin_side, "tails");
        assert!((result.type_confidence - 70.0).abs() < 1e-9);
        assert!((result.side_confidence - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_classifier_failure_is_wrapped() {
        let scaler = PassthroughScaler { width: 2 };
        let side_model = FixedClassifier::new("heads", vec![1.0]);
        let result = classify(&[1.0, 2.0], &scaler, &FailingClassifier, &side_model);
        assert_eq!(
            result.error,
            Some(PipelineError::PredictionFailed(
                "tree walk out of bounds".to_string()
            ))
        );
        assert_eq!(result.coin_type, "N/A");
        assert_eq!(result.type_confidence, 0.0);
    }
}
