//! Error types for the prediction pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Why a single form field was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("is required")]
    Required,
    #[error("must be a valid number")]
    NotANumber,
    #[error("must be a whole number")]
    NotWholeNumber,
    #[error("must be at least {min}")]
    BelowMinimum { min: f64 },
    #[error("must be at most {max}")]
    AboveMaximum { max: f64 },
}

/// Errors raised by a session backend while loading or running the model
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("model artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("malformed model: {0}")]
    Malformed(String),

    /// The graph uses an operator the runtime cannot execute
    #[error("unsupported operator {op_type} (domain {domain}); export the classifier with standard ONNX operators")]
    UnsupportedOperator { op_type: String, domain: String },

    #[error("model input mismatch: {0}")]
    InputMismatch(String),

    #[error("model produced no output")]
    EmptyOutput,

    #[error("model output is not a finite number: {0}")]
    NonFiniteOutput(f32),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Category of an inference failure, stable across releases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ModelLoadFailed,
    InferenceFailed,
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ModelLoadFailed => "model_load_failed",
            FailureReason::InferenceFailed => "inference_failed",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure returned to callers of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}: {detail}")]
pub struct InferenceFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl InferenceFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn model_load(err: &SessionError) -> Self {
        Self::new(FailureReason::ModelLoadFailed, err.to_string())
    }

    pub fn inference(err: &SessionError) -> Self {
        Self::new(FailureReason::InferenceFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_messages() {
        assert_eq!(FieldError::Required.to_string(), "is required");
        assert_eq!(
            FieldError::BelowMinimum { min: 0.08 }.to_string(),
            "must be at least 0.08"
        );
        assert_eq!(
            FieldError::AboveMaximum { max: 17.0 }.to_string(),
            "must be at most 17"
        );
    }

    #[test]
    fn test_inference_failure_display() {
        let err = SessionError::ArtifactMissing(PathBuf::from("/models/missing.onnx"));
        let failure = InferenceFailure::model_load(&err);
        assert_eq!(failure.reason, FailureReason::ModelLoadFailed);
        assert_eq!(
            failure.to_string(),
            "model_load_failed: model artifact not found: /models/missing.onnx"
        );
    }
}
