// src/model/mod.rs
//
// Frozen, read-only prediction collaborators. The pipeline only depends on
// this capability surface; how the artifacts are persisted is the asset
// provider's business. Everything here is immutable after load and safe to
// share across concurrent pipeline invocations.

pub mod assets;
pub mod forest;
pub mod scaler;

pub use assets::{resolve_asset_dir, AssetProvider, DirAssetProvider, PredictionAssets};
pub use forest::RandomForest;
pub use scaler::StandardScaler;

use thiserror::Error;

/// Failure inside a scaler or classifier call. Carried back to the
/// classification adapter, never panicked across.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModelError(String);

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Feature scaling collaborator.
pub trait Scaler: Send + Sync {
    /// Vector width this scaler (and the models behind it) was trained on.
    fn expected_input_width(&self) -> usize;

    fn transform(&self, vector: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Trained classifier collaborator.
pub trait Classifier: Send + Sync {
    fn predict(&self, vector: &[f64]) -> Result<String, ModelError>;

    /// Class probability distribution, in the model's class order.
    fn predict_proba(&self, vector: &[f64]) -> Result<Vec<f64>, ModelError>;
}
