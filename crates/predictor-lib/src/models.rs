//! Core data models for the prediction pipeline

use crate::error::{FailureReason, InferenceFailure};
use crate::schema::{FeatureSchema, NUM_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validated feature values in schema order
///
/// Only produced by the validator, so every value is within its spec's
/// bounds and integer-only features have no fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub(crate) fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.values
    }

    /// Value of the feature with the given model input name
    pub fn get(&self, name: &str) -> Option<f64> {
        FeatureSchema::specs()
            .iter()
            .position(|spec| spec.name == name)
            .map(|idx| self.values[idx])
    }
}

/// Binary class produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// Class 0
    NoDiabetes,
    /// Class 1
    Diabetes,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::NoDiabetes => 0,
            Label::Diabetes => 1,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Label::NoDiabetes => "No Diabetes",
            Label::Diabetes => "Diabetes",
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::NoDiabetes),
            1 => Ok(Label::Diabetes),
            other => Err(format!("label must be 0 or 1, got {}", other)),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u8())
    }
}

/// Result of a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Success {
        label: Label,
    },
    ValidationFailure {
        field_errors: BTreeMap<String, String>,
    },
    InferenceFailure {
        reason: FailureReason,
        detail: String,
    },
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success { .. })
    }

    pub fn label(&self) -> Option<Label> {
        match self {
            PredictionOutcome::Success { label } => Some(*label),
            _ => None,
        }
    }

    /// The failure carried by an `InferenceFailure` outcome
    pub fn failure(&self) -> Option<InferenceFailure> {
        match self {
            PredictionOutcome::InferenceFailure { reason, detail } => {
                Some(InferenceFailure::new(*reason, detail.clone()))
            }
            _ => None,
        }
    }
}

impl From<InferenceFailure> for PredictionOutcome {
    fn from(failure: InferenceFailure) -> Self {
        PredictionOutcome::InferenceFailure {
            reason: failure.reason,
            detail: failure.detail,
        }
    }
}
