//! Core library for diabetes risk prediction
//!
//! This crate provides:
//! - The feature schema for the eight Pima clinical measurements
//! - Input validation with per-field error messages
//! - ONNX model session management (lazy, single-flight loading)
//! - Tensor marshalling and output decoding
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use error::{FailureReason, FieldError, InferenceFailure, SessionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use schema::{FeatureSchema, FeatureSpec, NUM_FEATURES};
