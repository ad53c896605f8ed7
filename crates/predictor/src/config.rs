//! Predictor configuration

use anyhow::Result;
use predictor_lib::predictor::{PredictionConfig, DEFAULT_MODEL_PATH};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Predictor configuration, read from `PREDICTOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Path to the exported ONNX classifier
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Expected SHA-256 of the model artifact, hex encoded
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// API server port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Load the model at startup instead of on the first request
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,

    /// Per-request bound on model load plus inference
    #[serde(default)]
    pub inference_timeout_ms: Option<u64>,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_api_port() -> u16 {
    8080
}

fn default_warm_up() -> bool {
    true
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            model_sha256: None,
            api_port: default_api_port(),
            warm_up: default_warm_up(),
            inference_timeout_ms: None,
        }
    }
}

impl PredictorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PREDICTOR").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn prediction_config(&self) -> PredictionConfig {
        PredictionConfig {
            inference_timeout: self.inference_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PredictorConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/diabetes_svm_model.onnx"));
        assert_eq!(config.api_port, 8080);
        assert!(config.warm_up);
        assert!(config.prediction_config().inference_timeout.is_none());
    }

    #[test]
    fn test_timeout_conversion() {
        let config = PredictorConfig {
            inference_timeout_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(
            config.prediction_config().inference_timeout,
            Some(Duration::from_millis(250))
        );
    }
}
