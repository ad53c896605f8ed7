//! Diabetes Predictor - ONNX inference service
//!
//! Serves predictions for the eight Pima clinical measurements, plus
//! health, readiness and Prometheus metrics endpoints.

use anyhow::Result;
use diabetes_predictor::{api, config::PredictorConfig};
use predictor_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    predictor::{ModelSessionManager, OnnxSessionLoader, PredictionService},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PREDICTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = PredictorConfig::load()?;
    info!(
        model_path = %config.model_path.display(),
        api_port = config.api_port,
        warm_up = config.warm_up,
        "Predictor configured"
    );

    let mut loader = OnnxSessionLoader::new(&config.model_path);
    if let Some(sha256) = &config.model_sha256 {
        loader = loader.with_checksum(sha256);
    }

    let logger = StructuredLogger::new("diabetes-predictor");
    logger.log_startup(PREDICTOR_VERSION, &config.model_path.display().to_string());

    let sessions = Arc::new(ModelSessionManager::new(loader).with_logger(logger.clone()));
    let service = Arc::new(
        PredictionService::new(sessions, config.prediction_config()).with_logger(logger.clone()),
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::API).await;
    health_registry
        .record_session_status(&service.session_status().await)
        .await;

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), service.clone()));

    // With warm-up, readiness waits for the first load attempt
    if config.warm_up {
        let service = service.clone();
        let health_registry = health_registry.clone();
        tokio::spawn(async move {
            if let Err(failure) = service.initialize().await {
                warn!(error = %failure, "Model warm-up failed, predictions will fail until reload");
            }
            health_registry
                .record_session_status(&service.session_status().await)
                .await;
            health_registry.set_ready(true).await;
        });
    } else {
        health_registry.set_ready(true).await;
    }

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => {
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
