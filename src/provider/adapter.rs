//! Single-call adapter: one prompt in, one [`ProviderResult`] out.

use axum::http::header;
use reqwest::Client;
use std::time::Duration;

use super::vendor::Vendor;
use crate::config::{ApiKey, ProviderConfig};

/// A provider ready to be called.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
    pub url: String,
    pub api_key: Option<ApiKey>,
    pub vendor: Vendor,
}

impl From<&ProviderConfig> for ProviderSpec {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            name: config.name.clone(),
            model: config.model.clone(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            vendor: config.vendor,
        }
    }
}

/// Outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub provider: String,
    pub model: String,
    /// Answer text on success, failure description otherwise.
    pub content: String,
    pub error: bool,
}

impl ProviderResult {
    pub fn success(spec: &ProviderSpec, content: String) -> Self {
        Self {
            provider: spec.name.clone(),
            model: spec.model.clone(),
            content,
            error: false,
        }
    }

    pub fn failure(spec: &ProviderSpec, description: String) -> Self {
        Self {
            provider: spec.name.clone(),
            model: spec.model.clone(),
            content: description,
            error: true,
        }
    }
}

/// Why a single provider call failed.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response body: {0}")]
    Malformed(String),
}

impl CallError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CallError::Timeout(timeout)
        } else if err.is_decode() {
            CallError::Malformed(err.to_string())
        } else {
            CallError::Transport(err)
        }
    }
}

impl ProviderSpec {
    /// Call the provider once. Never fails: errors are logged and folded
    /// into a failed [`ProviderResult`].
    pub async fn call(&self, client: &Client, prompt: &str, timeout: Duration) -> ProviderResult {
        match self.send(client, prompt, timeout).await {
            Ok(content) => {
                tracing::debug!(provider = %self.name, model = %self.model, "Provider answered");
                ProviderResult::success(self, content)
            }
            Err(e) => {
                tracing::error!(
                    provider = %self.name,
                    model = %self.model,
                    error = %e,
                    "Provider call failed"
                );
                ProviderResult::failure(self, e.to_string())
            }
        }
    }

    async fn send(
        &self,
        client: &Client,
        prompt: &str,
        timeout: Duration,
    ) -> std::result::Result<String, CallError> {
        let api_key = self.api_key.as_ref().ok_or(CallError::MissingCredential)?;

        let response = client
            .post(&self.url)
            .timeout(timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&self.vendor.request_body(&self.model, prompt))
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status { status, body });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CallError::from_reqwest(e, timeout))?;

        self.vendor.extract_text(&body).ok_or_else(|| {
            CallError::Malformed(format!("no answer text in {} reply", self.vendor))
        })
    }
}
