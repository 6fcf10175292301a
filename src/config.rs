use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load_or_default("definitely-not-there.yaml").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.assets.search_paths.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
assets:
  search_paths: ["models_final"]
io:
  input_dir: captures
  output_dir: annotated
  save_annotated: false
logging:
  level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.assets.search_paths, vec!["models_final"]);
        assert_eq!(config.io.input_dir, "captures");
        assert!(!config.io.save_annotated);
        assert_eq!(config.logging.level, "debug");
    }
}
