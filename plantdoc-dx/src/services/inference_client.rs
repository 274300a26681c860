//! Hosted image-classification client
//!
//! POSTs `{"inputs": "<base64 image>"}` to `{base_url}/{model_id}` with a
//! bearer token and returns the ranked label/score list.
//!
//! A 503 (model warming up) is retried per [`RetryPolicy`]; any other
//! non-success status is surfaced immediately.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use plantdoc_common::config::InferenceConfig;

use crate::models::Prediction;
use crate::services::image_loader::ImagePayload;
use crate::utils::{retry_transient, RetryPolicy, Transient};

const USER_AGENT: &str = concat!("plantdoc-dx/", env!("CARGO_PKG_VERSION"));

/// Inference client errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference service temporarily unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Inference service still unavailable after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("Inference API rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Inference API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl InferenceError {
    /// Whether the caller may reasonably try again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::Unavailable { .. } | InferenceError::RetriesExhausted { .. }
        )
    }
}

impl Transient for InferenceError {
    fn is_transient(&self) -> bool {
        matches!(self, InferenceError::Unavailable { .. })
    }
}

/// Anything that can classify an image with a named model
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify `image` with `model_id`, returning predictions ordered by score (highest first)
    async fn classify(
        &self,
        image: &ImagePayload,
        model_id: &str,
    ) -> Result<Vec<Prediction>, InferenceError>;
}

/// Response bodies the inference API is known to return
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Predictions(Vec<Prediction>),
    Batched(Vec<Vec<Prediction>>),
    Error {
        error: String,
        #[serde(default)]
        estimated_time: Option<f64>,
    },
}

/// HTTP client for the hosted inference API
pub struct InferenceClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
    retry_policy: RetryPolicy,
}

impl InferenceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        retry_policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            retry_policy,
        })
    }

    pub fn from_config(config: &InferenceConfig, api_token: String) -> Result<Self, InferenceError> {
        Self::new(
            config.api_base_url.clone(),
            api_token,
            RetryPolicy::from_millis(config.max_retries, config.retry_delay_ms),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id.trim_start_matches('/'))
    }

    /// One request, no retry
    async fn classify_once(
        &self,
        image: &ImagePayload,
        model_id: &str,
    ) -> Result<Vec<Prediction>, InferenceError> {
        let url = self.endpoint(model_id);

        tracing::debug!(model = %model_id, url = %url, "Querying inference API");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": image.base64 }))
            .send()
            .await
            .map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Unavailable {
                status: status.as_u16(),
                message,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(InferenceError::Unauthorized(status.as_u16()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::ApiError(status.as_u16(), error_text));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::ParseError(e.to_string()))?;

        let mut predictions = match body {
            InferenceResponse::Predictions(p) => p,
            InferenceResponse::Batched(mut batches) => {
                if batches.is_empty() {
                    Vec::new()
                } else {
                    batches.swap_remove(0)
                }
            }
            InferenceResponse::Error {
                error,
                estimated_time,
            } => {
                if error.to_lowercase().contains("loading") {
                    return Err(InferenceError::Unavailable {
                        status: status.as_u16(),
                        message: match estimated_time {
                            Some(secs) => format!("{} (estimated {:.0}s)", error, secs),
                            None => error,
                        },
                    });
                }
                return Err(InferenceError::ApiError(status.as_u16(), error));
            }
        };

        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));

        if let Some(top) = predictions.first() {
            tracing::info!(
                model = %model_id,
                label = %top.label,
                score = top.score,
                count = predictions.len(),
                "Classification successful"
            );
        }

        Ok(predictions)
    }
}

#[async_trait]
impl ImageClassifier for InferenceClient {
    async fn classify(
        &self,
        image: &ImagePayload,
        model_id: &str,
    ) -> Result<Vec<Prediction>, InferenceError> {
        let operation = format!("classify {}", model_id);

        retry_transient(&operation, &self.retry_policy, || {
            self.classify_once(image, model_id)
        })
        .await
        .map_err(|e| match e {
            InferenceError::Unavailable { message, .. } => InferenceError::RetriesExhausted {
                attempts: self.retry_policy.max_attempts(),
                message,
            },
            other => other,
        })
    }
}
