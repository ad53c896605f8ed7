//! API client for communicating with the predictor service

use anyhow::{Context, Result};
use predictor_lib::{predictor::RawFields, InferenceFailure, PredictionOutcome};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the predictor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response, &[]).await
    }

    /// Make a POST request with JSON body
    async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")
    }

    /// Parse a JSON body if the status is a success or one of `accepted`
    async fn parse<T: DeserializeOwned>(response: Response, accepted: &[StatusCode]) -> Result<T> {
        let status = response.status();
        if !status.is_success() && !accepted.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Submit raw form fields for a prediction
    ///
    /// Validation and inference failures come back as outcomes, not errors.
    pub async fn predict(&self, fields: &RawFields) -> Result<PredictionOutcome> {
        let response = self.post_raw("api/v1/predict", fields).await?;
        Self::parse(
            response,
            &[
                StatusCode::UNPROCESSABLE_ENTITY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        )
        .await
    }

    pub async fn schema(&self) -> Result<SchemaResponse> {
        self.get("api/v1/schema").await
    }

    pub async fn model_status(&self) -> Result<ModelStatus> {
        self.get("api/v1/model").await
    }

    /// Ask the service to retry loading the model
    pub async fn reload_model(&self) -> Result<ReloadResult> {
        let response = self
            .post_raw("api/v1/model/reload", &serde_json::json!({}))
            .await?;

        if response.status().is_success() {
            return Ok(ReloadResult::Reloaded(Self::parse(response, &[]).await?));
        }

        let failure: ReloadFailure = Self::parse(
            response,
            &[StatusCode::SERVICE_UNAVAILABLE, StatusCode::GATEWAY_TIMEOUT],
        )
        .await?;
        Ok(ReloadResult::Failed(failure))
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    pub key: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub integer_only: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub features: Vec<FeatureInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub source: String,
    pub load_attempts: u64,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadFailure {
    pub model: ModelStatus,
    pub error: InferenceFailure,
}

#[derive(Debug, Clone)]
pub enum ReloadResult {
    Reloaded(ModelStatus),
    Failed(ReloadFailure),
}
