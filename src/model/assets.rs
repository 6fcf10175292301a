// src/model/assets.rs
//
// Asset loading boundary. The pipeline receives already-loaded, frozen
// collaborators through `PredictionAssets`; where they come from is the
// provider's concern. Filesystem fallback search lives in the binary's
// config, not here.

use crate::features::FeatureSchema;
use crate::model::{Classifier, RandomForest, Scaler, StandardScaler};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCALER_FILENAME: &str = "scaler.json";
pub const FEATURE_NAMES_FILENAME: &str = "feature_names.json";
pub const TYPE_MODEL_FILENAME: &str = "type_model.json";
pub const SIDE_MODEL_FILENAME: &str = "side_model.json";

/// Source of the four prediction artifacts.
pub trait AssetProvider {
    fn load_scaler(&self) -> Result<Box<dyn Scaler>>;
    fn load_feature_schema(&self) -> Result<FeatureSchema>;
    fn load_type_model(&self) -> Result<Box<dyn Classifier>>;
    fn load_side_model(&self) -> Result<Box<dyn Classifier>>;
}

/// JSON artifacts in a single directory.
pub struct DirAssetProvider {
    dir: PathBuf,
}

impl DirAssetProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, filename: &str) -> Result<String> {
        let path = self.dir.join(filename);
        fs::read_to_string(&path).with_context(|| format!("reading asset {}", path.display()))
    }
}

impl AssetProvider for DirAssetProvider {
    fn load_scaler(&self) -> Result<Box<dyn Scaler>> {
        let scaler: StandardScaler = serde_json::from_str(&self.read(SCALER_FILENAME)?)
            .context("parsing scaler")?;
        info!(width = scaler.expected_input_width(), "scaler loaded");
        Ok(Box::new(scaler))
    }

    fn load_feature_schema(&self) -> Result<FeatureSchema> {
        let schema: FeatureSchema = serde_json::from_str(&self.read(FEATURE_NAMES_FILENAME)?)
            .context("parsing feature names")?;
        info!(features = schema.len(), "feature schema loaded");
        Ok(schema)
    }

    fn load_type_model(&self) -> Result<Box<dyn Classifier>> {
        let forest: RandomForest = serde_json::from_str(&self.read(TYPE_MODEL_FILENAME)?)
            .context("parsing type model")?;
        info!(classes = ?forest.classes(), "type classifier loaded");
        Ok(Box::new(forest))
    }

    fn load_side_model(&self) -> Result<Box<dyn Classifier>> {
        let forest: RandomForest = serde_json::from_str(&self.read(SIDE_MODEL_FILENAME)?)
            .context("parsing side model")?;
        info!(classes = ?forest.classes(), "side classifier loaded");
        Ok(Box::new(forest))
    }
}

/// The four frozen collaborators one pipeline invocation needs.
pub struct PredictionAssets {
    pub scaler: Box<dyn Scaler>,
    pub schema: FeatureSchema,
    pub type_model: Box<dyn Classifier>,
    pub side_model: Box<dyn Classifier>,
}

impl PredictionAssets {
    pub fn load(provider: &dyn AssetProvider) -> Result<Self> {
        let scaler = provider.load_scaler().context("loading scaler")?;
        let schema = provider
            .load_feature_schema()
            .context("loading feature schema")?;
        let type_model = provider.load_type_model().context("loading type model")?;
        let side_model = provider.load_side_model().context("loading side model")?;
        info!("all prediction assets loaded");
        Ok(Self {
            scaler,
            schema,
            type_model,
            side_model,
        })
    }
}

/// First existing directory among the configured candidates.
pub fn resolve_asset_dir(search_paths: &[String]) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(Path::new)
        .find(|p| p.is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_assets(dir: &Path) {
        fs::write(
            dir.join(SCALER_FILENAME),
            r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#,
        )
        .unwrap();
        fs::write(dir.join(FEATURE_NAMES_FILENAME), r#"["area", "perimeter"]"#).unwrap();
        let forest = r#"{
            "classes": ["R1", "R5"],
            "trees": [{
                "feature": [-2], "threshold": [0.0],
                "left": [-1], "right": [-1], "value": [[3, 1]]
            }]
        }"#;
        fs::write(dir.join(TYPE_MODEL_FILENAME), forest).unwrap();
        fs::write(dir.join(SIDE_MODEL_FILENAME), forest).unwrap();
    }

    #[test]
    fn test_load_assets_from_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write_assets(tmp.path());
        let provider = DirAssetProvider::new(tmp.path());
        let assets = PredictionAssets::load(&provider).unwrap();
        assert_eq!(assets.scaler.expected_input_width(), 2);
        assert_eq!(assets.schema.len(), 2);
        assert_eq!(assets.type_model.predict(&[0.0, 0.0]).unwrap(), "R1");
    }

    #[test]
    fn test_missing_asset_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = DirAssetProvider::new(tmp.path());
        assert!(PredictionAssets::load(&provider).is_err());
    }

    #[test]
    fn test_resolve_asset_dir_picks_first_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = vec![
            "definitely-not-there".to_string(),
            tmp.path().to_string_lossy().to_string(),
        ];
        let resolved = resolve_asset_dir(&paths).unwrap();
        assert_eq!(resolved, tmp.path());
        assert!(resolve_asset_dir(&["nope".to_string()]).is_none());
    }
}
