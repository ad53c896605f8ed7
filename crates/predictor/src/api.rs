//! HTTP API for predictions, health checks and Prometheus metrics

use predictor_lib::{
    health::{ComponentStatus, HealthRegistry},
    predictor::{PredictionService, RawFields, SessionStatus},
    FailureReason, FeatureSchema, FeatureSpec, PredictionOutcome,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, service: Arc<PredictionService>) -> Self {
        Self {
            health_registry,
            service,
        }
    }

    async fn refresh_session_health(&self) -> SessionStatus {
        let status = self.service.session_status().await;
        self.health_registry.record_session_status(&status).await;
        status
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.refresh_session_health().await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Model loads on demand
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.refresh_session_health().await;
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

#[derive(Serialize)]
struct SchemaResponse {
    features: &'static [FeatureSpec],
}

async fn schema() -> impl IntoResponse {
    Json(SchemaResponse {
        features: FeatureSchema::specs(),
    })
}

/// Convert a JSON form body into raw field strings
///
/// Numbers are accepted as-is so clients need not quote them; `null` counts
/// as an empty field.
fn raw_fields(body: Map<String, Value>) -> RawFields {
    body.into_iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, raw)
        })
        .collect()
}

fn failure_status(reason: FailureReason) -> StatusCode {
    match reason {
        FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FailureReason::ModelLoadFailed | FailureReason::InferenceFailed => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Rejects bodies that are not a JSON object with 400
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected prediction request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let outcome = state.service.predict(&raw_fields(body)).await;

    let status_code = match &outcome {
        PredictionOutcome::Success { .. } => StatusCode::OK,
        PredictionOutcome::ValidationFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionOutcome::InferenceFailure { reason, .. } => failure_status(*reason),
    };

    (status_code, Json(outcome)).into_response()
}

#[derive(Serialize)]
struct ModelResponse {
    source: String,
    load_attempts: u64,
    #[serde(flatten)]
    status: SessionStatus,
}

async fn model_response(state: &AppState) -> ModelResponse {
    let sessions = state.service.sessions();
    ModelResponse {
        source: sessions.source(),
        load_attempts: sessions.load_attempts(),
        status: state.refresh_session_health().await,
    }
}

async fn model_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(model_response(&state).await)
}

async fn model_reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Model reload requested");
    match state.service.retry().await {
        Ok(()) => (StatusCode::OK, Json(json!(model_response(&state).await))),
        Err(failure) => {
            let model = model_response(&state).await;
            (
                failure_status(failure.reason),
                Json(json!({ "model": model, "error": failure })),
            )
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/schema", get(schema))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/model", get(model_status))
        .route("/api/v1/model/reload", post(model_reload))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_fields_accepts_numbers_and_strings() {
        let body: Map<String, Value> = serde_json::from_str(
            r#"{"glucose": 148, "bmi": "33.6", "insulin": null, "age": 50.0}"#,
        )
        .unwrap();
        let raw = raw_fields(body);
        assert_eq!(raw["glucose"], "148");
        assert_eq!(raw["bmi"], "33.6");
        assert_eq!(raw["insulin"], "");
        assert_eq!(raw["age"], "50.0");
    }

    #[test]
    fn test_failure_status_codes() {
        assert_eq!(
            failure_status(FailureReason::Timeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            failure_status(FailureReason::ModelLoadFailed),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            failure_status(FailureReason::InferenceFailed),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
