//! ONNX inference using tract
//!
//! Loads the exported classifier from disk, pins every input to a `[1, 1]`
//! f32 fact, and runs it on tokio's blocking pool so the async caller only
//! suspends while the graph executes.

use super::session::{InferenceSession, SessionLoader};
use super::tensor::{ModelInputs, INPUT_SHAPE};
use crate::error::SessionError;
use crate::schema::{FeatureSchema, NUM_FEATURES};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::pb;
use tract_onnx::prelude::*;
use tract_onnx::Onnx;
use tracing::{debug, warn};

/// Default location of the exported classifier
pub const DEFAULT_MODEL_PATH: &str = "models/diabetes_svm_model.onnx";

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Loads an [`OnnxSession`] from a file on disk
#[derive(Debug, Clone)]
pub struct OnnxSessionLoader {
    path: PathBuf,
    expected_sha256: Option<String>,
}

impl OnnxSessionLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            expected_sha256: None,
        }
    }

    /// Refuse to load an artifact whose SHA-256 does not match
    pub fn with_checksum(mut self, sha256_hex: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256_hex.into().to_ascii_lowercase());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_artifact(&self) -> Result<Vec<u8>, SessionError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SessionError::ArtifactMissing(self.path.clone()))
            }
            Err(source) => Err(SessionError::ArtifactRead {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl SessionLoader for OnnxSessionLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceSession>, SessionError> {
        let bytes = self.read_artifact().await?;

        if let Some(expected) = &self.expected_sha256 {
            let actual = compute_checksum(&bytes);
            if &actual != expected {
                return Err(SessionError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!(checksum = %actual, "Model checksum validated");
        }

        let session = tokio::task::spawn_blocking(move || OnnxSession::from_bytes(&bytes))
            .await
            .map_err(|e| SessionError::Runtime(format!("model load task failed: {}", e)))??;

        Ok(Arc::new(session))
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

/// A runnable tract plan for the diabetes classifier
pub struct OnnxSession {
    plan: Arc<TractModel>,
    input_names: Vec<String>,
}

impl OnnxSession {
    /// Parse, type and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, SessionError> {
        let proto = tract_onnx::onnx()
            .proto_model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| SessionError::Malformed(format!("failed to parse ONNX model: {:#}", e)))?;
        Self::from_proto(&proto)
    }

    /// Build a session from an already decoded ONNX model
    pub fn from_proto(proto: &pb::ModelProto) -> Result<Self, SessionError> {
        let onnx = tract_onnx::onnx();
        check_operators(&onnx, proto)?;

        let mut model = onnx
            .model_for_proto_model(proto)
            .map_err(|e| SessionError::Malformed(format!("failed to load ONNX graph: {:#}", e)))?;

        if model.inputs.len() != NUM_FEATURES {
            return Err(SessionError::InputMismatch(format!(
                "model declares {} inputs, expected {}",
                model.inputs.len(),
                NUM_FEATURES
            )));
        }

        for ix in 0..NUM_FEATURES {
            model = model
                .with_input_fact(ix, f32::fact(INPUT_SHAPE).into())
                .map_err(|e| SessionError::Malformed(format!("failed to set input shape: {:#}", e)))?;
        }

        let typed = model
            .into_optimized()
            .map_err(|e| SessionError::Malformed(format!("failed to optimize model: {:#}", e)))?;

        let input_names: Vec<String> = typed
            .inputs
            .iter()
            .map(|outlet| typed.node(outlet.node).name.clone())
            .collect();
        if let Some(unknown) = input_names
            .iter()
            .find(|name| FeatureSchema::by_name(name).is_none())
        {
            return Err(SessionError::InputMismatch(format!(
                "model input '{}' is not a known feature",
                unknown
            )));
        }

        let plan = typed
            .into_runnable()
            .map_err(|e| SessionError::Malformed(format!("failed to create runnable model: {:#}", e)))?;

        Ok(Self {
            plan: Arc::new(plan),
            input_names,
        })
    }
}

/// Fail on the first top-level node tract has no operator for
///
/// tract keys operators by name only, so `ai.onnx.ml` exports such as
/// `SVMClassifier` would otherwise surface as an opaque optimizer error.
fn check_operators(onnx: &Onnx, proto: &pb::ModelProto) -> Result<(), SessionError> {
    let graph = proto
        .graph
        .as_ref()
        .ok_or_else(|| SessionError::Malformed("model has no graph".to_string()))?;

    match graph
        .node
        .iter()
        .find(|node| !onnx.op_register.0.contains_key(&node.op_type))
    {
        Some(node) => Err(SessionError::UnsupportedOperator {
            op_type: node.op_type.clone(),
            domain: if node.domain.is_empty() {
                "ai.onnx".to_string()
            } else {
                node.domain.clone()
            },
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl InferenceSession for OnnxSession {
    async fn run(&self, inputs: &ModelInputs) -> Result<Vec<f32>, SessionError> {
        let tensors = inputs
            .ordered_by(self.input_names.as_slice())?
            .into_iter()
            .map(|t| {
                Tensor::from_shape(&t.shape, t.data.as_slice())
                    .map_err(|e| SessionError::InputMismatch(format!("{}: {:#}", t.name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start = Instant::now();
        let plan = Arc::clone(&self.plan);
        // TValue is not Send, so values are built and read back on the worker
        let output = tokio::task::spawn_blocking(move || -> Result<Vec<f32>, SessionError> {
            let values: TVec<TValue> = tensors.into_iter().map(TValue::from).collect();
            let result = plan
                .run(values)
                .map_err(|e| SessionError::Runtime(format!("{:#}", e)))?;
            let first = result.first().ok_or(SessionError::EmptyOutput)?;
            let as_f32 = first
                .cast_to::<f32>()
                .map_err(|e| SessionError::Runtime(format!("unsupported output type: {:#}", e)))?;
            let values = as_f32
                .as_slice::<f32>()
                .map_err(|e| SessionError::Runtime(format!("{:#}", e)))?;
            Ok(values.to_vec())
        })
        .await
        .map_err(|e| SessionError::Runtime(format!("inference task failed: {}", e)))??;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(output)
    }

    fn input_names(&self) -> Vec<String> {
        self.input_names.clone()
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
