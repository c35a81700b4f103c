//! JSON-over-HTTP model backend speaking the engine's own request shape.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use tracing::debug;

use super::{ModelProvider, ModelRequest, ModelResponse};
use crate::config::HttpProviderConfig;
use crate::error::BatonError;

/// Posts [`ModelRequest`]s to `{base_url}/responses` and decodes
/// [`ModelResponse`]s.
#[derive(Debug, Clone)]
pub struct HttpModelProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpModelProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, BatonError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    /// Build from `BATON_MODEL_BASE_URL` / `BATON_MODEL_API_KEY`.
    pub fn from_env() -> Result<Self, BatonError> {
        Self::new(HttpProviderConfig::from_env()?)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(AUTHORIZATION, val);
            }
        }
        headers
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    fn provider_name(&self) -> &str {
        "http"
    }

    async fn respond(&self, request: &ModelRequest) -> Result<ModelResponse, BatonError> {
        let url = format!("{}/responses", self.base_url);
        debug!(model = request.model.as_str(), url = url.as_str(), "http respond");

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let retry_after_ms = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|secs| (secs * 1000.0) as u64);
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body, retry_after_ms));
        }

        let body = resp.text().await?;
        let response: ModelResponse = serde_json::from_str(&body)?;
        Ok(response)
    }
}

/// Map a non-success HTTP status to an engine error.
pub fn status_to_error(status: u16, body: &str, retry_after_ms: Option<u64>) -> BatonError {
    match status {
        401 | 403 => BatonError::Authentication(body.to_string()),
        429 => BatonError::RateLimited {
            retry_after_ms: retry_after_ms.or_else(|| extract_retry_after(body)),
        },
        _ => BatonError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
