use std::path::PathBuf;

use serde::Deserialize;

/// Pipeline configuration, loaded from a `toml` file the way the rest of
/// the ambient stack is configured. Every field has a production-sane
/// default so a deployment can start from an empty file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub policies_root: PathBuf,
    pub model_timeout_secs: u64,
    pub validation_quality_floor: f64,
    pub good_quality_threshold: f64,
    pub needs_review_quality_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policies_root: PathBuf::from("data/policies"),
            model_timeout_secs: 120,
            validation_quality_floor: 0.0,
            good_quality_threshold: 0.8,
            needs_review_quality_threshold: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
