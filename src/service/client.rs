use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{COMPARE_PATH, CompareRequest, CompareResponse, HEALTH_PATH, HealthStatus};
use crate::config::OverlaySettings;

const UNREACHABLE_HINT: &str =
    "could not reach the comparison service; check that it is running";

#[derive(Debug, thiserror::Error)]
pub enum ComparisonClientError {
    #[error("comparison request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("comparison service returned HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("comparison service rejected the request: {message}")]
    Rejected { message: String },

    #[error("response format error: {0}")]
    ResponseFormat(String),
}

impl ComparisonClientError {
    /// Text shown to the user. Transport problems and non-success statuses get
    /// the same treatment as an explicit rejection.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message } => format!("Comparison failed: {message}"),
            Self::HttpStatus { status, body } => match service_error_text(body) {
                Some(message) => format!("Comparison failed: {message}"),
                None => format!("Comparison failed: service returned HTTP {status}"),
            },
            Self::Timeout { .. } | Self::Transport(_) => {
                format!("Comparison failed: {UNREACHABLE_HINT}")
            }
            Self::ResponseFormat(detail) => format!("Comparison failed: {detail}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_ms: Option<u64>,
}

impl ComparisonClient {
    pub fn new(settings: &OverlaySettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: settings.compare_base_url.trim_end_matches('/').to_owned(),
            timeout_ms: settings.compare_timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends both raw trees. A response with `success: false` becomes
    /// `Rejected` so callers never apply a partial result.
    pub async fn compare(
        &self,
        request: &CompareRequest,
    ) -> Result<CompareResponse, ComparisonClientError> {
        let url = format!("{}{COMPARE_PATH}", self.base_url);
        debug!(
            url = %url,
            design_bytes = request.design_json.len(),
            code_bytes = request.code_json.len(),
            "sending comparison request"
        );

        let payload: CompareResponse = self
            .with_timeout(async {
                let response = self.post_json(&url, request).await?;
                response
                    .json::<CompareResponse>()
                    .await
                    .map_err(|error| ComparisonClientError::ResponseFormat(error.to_string()))
            })
            .await?;

        if !payload.success {
            let message = payload
                .error
                .clone()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| "service reported failure without details".to_owned());
            return Err(ComparisonClientError::Rejected { message });
        }

        info!(
            report_id = payload.report_id().unwrap_or("-"),
            blueprints = payload.ai_blueprints.len(),
            "comparison completed"
        );
        Ok(payload)
    }

    pub async fn health(&self) -> Result<HealthStatus, ComparisonClientError> {
        let url = format!("{}{HEALTH_PATH}", self.base_url);
        debug!(url = %url, "probing comparison service health");

        self.with_timeout(async {
            let response = self.http_client.get(&url).send().await?;
            let response = ensure_success(response).await?;
            response
                .json::<HealthStatus>()
                .await
                .map_err(|error| ComparisonClientError::ResponseFormat(error.to_string()))
        })
        .await
    }

    async fn with_timeout<T>(
        &self,
        request: impl Future<Output = Result<T, ComparisonClientError>>,
    ) -> Result<T, ComparisonClientError> {
        let Some(timeout_ms) = self.timeout_ms else {
            return request.await;
        };

        match timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(result) => result,
            Err(_) => Err(ComparisonClientError::Timeout { timeout_ms }),
        }
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, ComparisonClientError> {
        let response = self.http_client.post(url).json(body).send().await?;
        ensure_success(response).await
    }
}

async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ComparisonClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error response body>".to_owned());
    Err(ComparisonClientError::HttpStatus { status, body })
}

/// The service reports failures as `{"success": false, "error": "..."}` even
/// on non-2xx responses.
fn service_error_text(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}
