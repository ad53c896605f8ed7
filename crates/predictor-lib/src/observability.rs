//! Observability infrastructure for the predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, model load latency, outcome counters, session state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Default histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Buckets for model load latency (in seconds)
const LOAD_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    model_load_latency_seconds: Histogram,
    predictions: IntCounterVec,
    validation_failures: IntCounter,
    inference_failures: IntCounterVec,
    output_anomalies: IntCounter,
    model_load_attempts: IntCounter,
    session_state: IntGauge,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "diabetes_predictor_prediction_latency_seconds",
                "Time spent on a prediction, from validated input to decoded label",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            model_load_latency_seconds: register_histogram!(
                "diabetes_predictor_model_load_latency_seconds",
                "Time spent loading the ONNX model",
                LOAD_BUCKETS.to_vec()
            )
            .expect("Failed to register model_load_latency_seconds"),

            predictions: register_int_counter_vec!(
                "diabetes_predictor_predictions_total",
                "Total number of successful predictions by label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            validation_failures: register_int_counter!(
                "diabetes_predictor_validation_failures_total",
                "Total number of requests rejected by input validation"
            )
            .expect("Failed to register validation_failures_total"),

            inference_failures: register_int_counter_vec!(
                "diabetes_predictor_inference_failures_total",
                "Total number of failed predictions by reason",
                &["reason"]
            )
            .expect("Failed to register inference_failures_total"),

            output_anomalies: register_int_counter!(
                "diabetes_predictor_output_anomalies_total",
                "Model outputs that were not exactly 0 or 1 and had to be rounded"
            )
            .expect("Failed to register output_anomalies_total"),

            model_load_attempts: register_int_counter!(
                "diabetes_predictor_model_load_attempts_total",
                "Total number of model load attempts"
            )
            .expect("Failed to register model_load_attempts_total"),

            session_state: register_int_gauge!(
                "diabetes_predictor_session_state",
                "Model session state (0=unloaded, 1=loading, 2=ready, 3=failed)"
            )
            .expect("Failed to register session_state"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_load_latency(&self, duration_secs: f64) {
        self.inner().model_load_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: u8) {
        let label = label.to_string();
        self.inner()
            .predictions
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn inc_validation_failures(&self) {
        self.inner().validation_failures.inc();
    }

    pub fn inc_inference_failures(&self, reason: &str) {
        self.inner()
            .inference_failures
            .with_label_values(&[reason])
            .inc();
    }

    pub fn inc_output_anomalies(&self) {
        self.inner().output_anomalies.inc();
    }

    pub fn inc_load_attempts(&self) {
        self.inner().model_load_attempts.inc();
    }

    pub fn set_session_state(&self, code: i64) {
        self.inner().session_state.set(code);
    }
}

/// Structured logger for predictor events
///
/// Every record carries an `event` field so log pipelines can filter on it.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Log a successful prediction
    pub fn log_prediction(&self, label: u8, raw_output: f32, duration_us: u64) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            label = label,
            raw_output = raw_output,
            duration_us = duration_us,
            "Generated diabetes prediction"
        );
    }

    /// Log rejected input; field values are never logged
    pub fn log_validation_failure(&self, fields: &[&str]) {
        info!(
            event = "validation_failed",
            service = %self.service,
            invalid_fields = ?fields,
            "Prediction request failed validation"
        );
    }

    pub fn log_inference_failure(&self, reason: &str, detail: &str) {
        warn!(
            event = "inference_failed",
            service = %self.service,
            reason = %reason,
            detail = %detail,
            "Prediction failed"
        );
    }

    pub fn log_model_loaded(&self, source: &str, attempt: u64, elapsed_ms: u128, inputs: &[String]) {
        info!(
            event = "model_loaded",
            service = %self.service,
            source = %source,
            attempt = attempt,
            elapsed_ms = elapsed_ms,
            inputs = ?inputs,
            "ONNX model loaded successfully"
        );
    }

    pub fn log_model_load_failed(&self, source: &str, attempt: u64, detail: &str) {
        error!(
            event = "model_load_failed",
            service = %self.service,
            source = %source,
            attempt = attempt,
            detail = %detail,
            "Failed to load the ONNX model"
        );
    }

    /// Feature values are only logged at debug level
    pub fn log_model_input(&self, values: &[f64]) {
        debug!(
            event = "model_input",
            service = %self.service,
            values = ?values,
            "Model input data"
        );
    }

    pub fn log_startup(&self, version: &str, model_source: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_source = %model_source,
            "Diabetes predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Diabetes predictor shutting down"
        );
    }
}
