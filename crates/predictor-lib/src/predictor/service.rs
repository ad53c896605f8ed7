//! Prediction orchestration
//!
//! [`PredictionService`] is the single entry point a front end calls. It
//! runs validation, makes sure the model session is loaded, marshals the
//! inputs, invokes the classifier and decodes the label. Every failure comes
//! back as a typed [`PredictionOutcome`]; nothing here panics on bad input.

use super::session::{ModelSessionManager, SessionStatus};
use super::tensor::{DecodedOutput, TensorMarshaller};
use super::validator::{FieldErrors, RawFields, Validator};
use crate::error::{FailureReason, InferenceFailure};
use crate::models::{FeatureVector, Label, PredictionOutcome};
use crate::observability::{PredictorMetrics, StructuredLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the prediction service
#[derive(Debug, Clone, Default)]
pub struct PredictionConfig {
    /// Upper bound on load plus inference; `None` waits indefinitely
    pub inference_timeout: Option<Duration>,
}

/// Counters for pipeline stages, used in status reporting and tests
#[derive(Debug, Default)]
struct Counters {
    predictions: AtomicU64,
    validation_failures: AtomicU64,
    inference_failures: AtomicU64,
    tensors_built: AtomicU64,
    output_anomalies: AtomicU64,
}

/// Snapshot of the service counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PredictionStats {
    pub predictions: u64,
    pub validation_failures: u64,
    pub inference_failures: u64,
    /// Number of times inputs were marshalled into tensors
    pub tensors_built: u64,
    pub output_anomalies: u64,
}

/// Orchestrates validator, session manager and marshaller
pub struct PredictionService {
    sessions: Arc<ModelSessionManager>,
    validator: Validator,
    marshaller: TensorMarshaller,
    config: PredictionConfig,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
    counters: Counters,
}

impl PredictionService {
    pub fn new(sessions: Arc<ModelSessionManager>, config: PredictionConfig) -> Self {
        Self {
            sessions,
            validator: Validator::new(),
            marshaller: TensorMarshaller::new(),
            config,
            metrics: PredictorMetrics::new(),
            logger: StructuredLogger::new("predictor"),
            counters: Counters::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Optional warm-up: load the model before the first request
    pub async fn initialize(&self) -> Result<(), InferenceFailure> {
        self.sessions.ensure_loaded().await
    }

    /// Explicitly retry a failed model load
    pub async fn retry(&self) -> Result<(), InferenceFailure> {
        self.sessions.retry().await
    }

    pub fn validate(&self, raw: &RawFields) -> Result<FeatureVector, FieldErrors> {
        self.validator.validate(raw)
    }

    /// Validate raw form input and, if valid, predict
    pub async fn predict(&self, raw: &RawFields) -> PredictionOutcome {
        let vector = match self.validate(raw) {
            Ok(vector) => vector,
            Err(errors) => {
                self.counters
                    .validation_failures
                    .fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_validation_failures();
                let fields: Vec<&str> = errors.iter().map(|(key, _)| key).collect();
                self.logger.log_validation_failure(&fields);
                return PredictionOutcome::ValidationFailure {
                    field_errors: errors.messages(),
                };
            }
        };

        match self.predict_vector(&vector).await {
            Ok(label) => PredictionOutcome::Success { label },
            Err(failure) => failure.into(),
        }
    }

    /// Predict from an already validated feature vector
    pub async fn predict_vector(&self, vector: &FeatureVector) -> Result<Label, InferenceFailure> {
        let start = Instant::now();

        let result = match self.config.inference_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_pipeline(vector)).await {
                Ok(result) => result,
                Err(_) => Err(InferenceFailure::new(
                    FailureReason::Timeout,
                    format!("no result within {}ms", limit.as_millis()),
                )),
            },
            None => self.run_pipeline(vector).await,
        };

        let elapsed = start.elapsed();
        match result {
            Ok(decoded) => {
                self.counters.predictions.fetch_add(1, Ordering::Relaxed);
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(decoded.label.as_u8());
                if decoded.anomalous {
                    self.counters.output_anomalies.fetch_add(1, Ordering::Relaxed);
                    self.metrics.inc_output_anomalies();
                }
                self.logger.log_prediction(
                    decoded.label.as_u8(),
                    decoded.raw,
                    elapsed.as_micros() as u64,
                );
                Ok(decoded.label)
            }
            Err(failure) => {
                self.counters
                    .inference_failures
                    .fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_inference_failures(failure.reason.as_str());
                self.logger
                    .log_inference_failure(failure.reason.as_str(), &failure.detail);
                Err(failure)
            }
        }
    }

    async fn run_pipeline(&self, vector: &FeatureVector) -> Result<DecodedOutput, InferenceFailure> {
        self.sessions.ensure_loaded().await?;
        let session = self.sessions.session().await.ok_or_else(|| {
            InferenceFailure::new(FailureReason::ModelLoadFailed, "model session not available")
        })?;

        self.logger.log_model_input(vector.values());
        let inputs = self.marshaller.to_tensors(vector);
        self.counters.tensors_built.fetch_add(1, Ordering::Relaxed);

        let raw = session
            .run(&inputs)
            .await
            .map_err(|e| InferenceFailure::inference(&e))?;

        self.marshaller
            .decode_output(&raw)
            .map_err(|e| InferenceFailure::inference(&e))
    }

    pub async fn session_status(&self) -> SessionStatus {
        self.sessions.status().await
    }

    pub fn sessions(&self) -> &Arc<ModelSessionManager> {
        &self.sessions
    }

    pub fn stats(&self) -> PredictionStats {
        PredictionStats {
            predictions: self.counters.predictions.load(Ordering::Relaxed),
            validation_failures: self.counters.validation_failures.load(Ordering::Relaxed),
            inference_failures: self.counters.inference_failures.load(Ordering::Relaxed),
            tensors_built: self.counters.tensors_built.load(Ordering::Relaxed),
            output_anomalies: self.counters.output_anomalies.load(Ordering::Relaxed),
        }
    }
}
