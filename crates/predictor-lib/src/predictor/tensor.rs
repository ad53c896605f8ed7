//! Tensor marshalling around the classifier invocation
//!
//! Builds the named `[1, 1]` float inputs the exported model expects and
//! maps its raw output back onto a binary [`Label`].

use crate::error::SessionError;
use crate::models::{FeatureVector, Label};
use crate::schema::{FeatureSchema, NUM_FEATURES};
use serde::Serialize;
use tracing::warn;

/// Shape of every model input: one sample, one value
pub const INPUT_SHAPE: [usize; 2] = [1, 1];

/// A named, shaped f32 tensor handed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTensor {
    pub name: &'static str,
    pub shape: [usize; 2],
    pub data: Vec<f32>,
}

/// The full set of model inputs, in schema order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInputs {
    tensors: Vec<NamedTensor>,
}

impl ModelInputs {
    pub fn get(&self, name: &str) -> Option<&NamedTensor> {
        self.tensors.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedTensor> {
        self.tensors.iter()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Tensors reordered to match the model's declared input order
    pub fn ordered_by<'a, S: AsRef<str>>(
        &'a self,
        input_names: &[S],
    ) -> Result<Vec<&'a NamedTensor>, SessionError> {
        if input_names.len() != self.tensors.len() {
            return Err(SessionError::InputMismatch(format!(
                "model declares {} inputs, expected {}",
                input_names.len(),
                self.tensors.len()
            )));
        }
        input_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).ok_or_else(|| {
                    SessionError::InputMismatch(format!("unexpected model input '{}'", name))
                })
            })
            .collect()
    }
}

/// Decoded model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedOutput {
    pub label: Label,
    /// First element of the raw output tensor
    pub raw: f32,
    /// True if `raw` was not exactly 0 or 1 and had to be rounded
    pub anomalous: bool,
}

/// Converts feature vectors to model inputs and model outputs to labels
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorMarshaller;

impl TensorMarshaller {
    pub fn new() -> Self {
        Self
    }

    /// Build one `[1, 1]` tensor per feature, keyed by model input name
    pub fn to_tensors(&self, vector: &FeatureVector) -> ModelInputs {
        let tensors = FeatureSchema::specs()
            .iter()
            .zip(vector.values().iter())
            .map(|(spec, value)| NamedTensor {
                name: spec.name,
                shape: INPUT_SHAPE,
                data: vec![*value as f32],
            })
            .collect::<Vec<_>>();
        debug_assert_eq!(tensors.len(), NUM_FEATURES);
        ModelInputs { tensors }
    }

    /// Map raw model output onto a label
    pub fn decode(&self, raw_output: &[f32]) -> Result<Label, SessionError> {
        self.decode_output(raw_output).map(|d| d.label)
    }

    /// Map raw model output onto a label, keeping the raw value
    ///
    /// Values other than exactly 0 or 1 are rounded to the nearest class
    /// and clamped to `{0, 1}`, with a warning. Only an empty or non-finite
    /// output is an error.
    pub fn decode_output(&self, raw_output: &[f32]) -> Result<DecodedOutput, SessionError> {
        let raw = *raw_output.first().ok_or(SessionError::EmptyOutput)?;
        if !raw.is_finite() {
            return Err(SessionError::NonFiniteOutput(raw));
        }

        let anomalous = raw != 0.0 && raw != 1.0;
        if anomalous {
            warn!(
                event = "model_output_anomaly",
                raw_output = raw,
                "Unexpected model output, rounding to nearest class"
            );
        }

        let label = if raw.round().clamp(0.0, 1.0) >= 1.0 {
            Label::Diabetes
        } else {
            Label::NoDiabetes
        };

        Ok(DecodedOutput {
            label,
            raw,
            anomalous,
        })
    }
}
