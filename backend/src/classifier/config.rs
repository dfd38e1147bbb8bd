use serde::{Deserialize, Serialize};
use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Hard ceiling on rows in a classification, whatever the config says.
pub const MAX_ROWS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read classifier config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse classifier config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid classifier config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub version: f32,
    pub confidence: ConfidenceConfig,
    pub rows: RowsConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub default: f32,
    pub sentinel: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RowsConfig {
    pub max: usize,
}

/// Runtime defaults the rule engine and assembler fall back on.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub default_confidence: f32,
    pub sentinel_confidence: f32,
    pub max_rows: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            default_confidence: 30.0,
            sentinel_confidence: 50.0,
            max_rows: MAX_ROWS,
        }
    }
}

impl ClassifierConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ClassifierConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("confidence.default", self.confidence.default),
            ("confidence.sentinel", self.confidence.sentinel),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if self.rows.max == 0 || self.rows.max > MAX_ROWS {
            return Err(ConfigError::Invalid(format!(
                "rows.max must be between 1 and {}, got {}",
                MAX_ROWS, self.rows.max
            )));
        }
        Ok(())
    }

    pub fn to_policy(&self) -> Policy {
        Policy {
            default_confidence: self.confidence.default,
            sentinel_confidence: self.confidence.sentinel,
            max_rows: self.rows.max,
        }
    }
}

/// `CLASSIFIER_CONFIG` wins; otherwise the workspace `config/classifier.yaml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("CLASSIFIER_CONFIG") {
        return PathBuf::from(path);
    }
    match env::var("CARGO_MANIFEST_DIR") {
        Ok(manifest_dir) => PathBuf::from(format!("{}/../config/classifier.yaml", manifest_dir)),
        Err(_) => PathBuf::from("config/classifier.yaml"),
    }
}

/// A missing file falls back to the built-in policy; a broken one is an error.
pub fn load_policy(path: &Path) -> Result<Policy, ConfigError> {
    match ClassifierConfig::load(path) {
        Ok(config) => Ok(config.to_policy()),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            log::warn!(
                "Classifier config {} not found, using built-in defaults",
                path.display()
            );
            Ok(Policy::default())
        }
        Err(e) => Err(e),
    }
}
