//! Client for the remote summarization engine.
//!
//! One call to [`SummarizationClient::summarize`] issues exactly one multipart `POST /summarize`
//! and folds the outcome into [`SummarizationClientError`]. The variant chosen here is the
//! single source of the permanent/transient classification used by the retry loop.

use crate::documents::{Language, OutputType};
use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a single summarization call.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// The engine refused the request as malformed. Permanent.
    #[error("Summarization request rejected: {0}")]
    Rejected(String),
    /// The engine signalled a rate or quota limit. Permanent.
    #[error("Summarization rate limited: {0}")]
    RateLimited(String),
    /// The engine could not be reached or timed out.
    #[error("Summarization service unavailable: {0}")]
    Unavailable(String),
    /// The engine answered but reported a failure.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// The engine response could not be decoded.
    #[error("Malformed summarization response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::RateLimited(_))
    }

    /// Whether the failure is an explicit rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Everything the engine needs for one document.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Document identifier, forwarded as `pdf_id`.
    pub pdf_id: Uuid,
    /// Uploader-supplied filename.
    pub original_filename: String,
    /// Size of `content` as recorded on the document.
    pub file_size: u64,
    /// Raw PDF bytes.
    pub content: Vec<u8>,
    /// Requested summary language.
    pub language: Language,
    /// Requested summary style.
    pub output_type: OutputType,
}

/// Normalized successful engine response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSummary {
    /// Trimmed summary text, never empty.
    pub summary_text: String,
    /// Processing time reported by the engine.
    pub processing_time_ms: u64,
}

/// Interface implemented by summarization engine adapters.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Perform one summarization call.
    ///
    /// Dropping the returned future aborts the in-flight request.
    async fn summarize(
        &self,
        request: &SummarizationRequest,
    ) -> Result<RemoteSummary, SummarizationClientError>;
}

/// HTTP adapter speaking the engine's multipart contract.
pub struct HttpSummarizationClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSummarizationClient {
    /// Build a client for the engine at `base_url`, bounding each call by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("pdfsum/summary")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/summarize", self.base_url.trim_end_matches('/'))
    }

    fn build_form(request: &SummarizationRequest) -> Result<Form, SummarizationClientError> {
        let file = Part::bytes(request.content.clone())
            .file_name(request.original_filename.clone())
            .mime_str("application/pdf")
            .map_err(|error| SummarizationClientError::Rejected(error.to_string()))?;

        Ok(Form::new()
            .part("file", file)
            .text("pdf_id", request.pdf_id.to_string())
            .text("original_filename", request.original_filename.clone())
            .text("file_size", request.file_size.to_string())
            .text("language", request.language.as_str())
            .text("output_type", request.output_type.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    summary_text: String,
    #[serde(default)]
    processing_time_ms: u64,
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SummarizationClient for HttpSummarizationClient {
    async fn summarize(
        &self,
        request: &SummarizationRequest,
    ) -> Result<RemoteSummary, SummarizationClientError> {
        let form = Self::build_form(request)?;

        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    SummarizationClientError::Unavailable(format!(
                        "request to {} timed out after {}s",
                        self.base_url,
                        self.timeout.as_secs()
                    ))
                } else {
                    SummarizationClientError::Unavailable(format!(
                        "failed to reach summarization engine at {}: {error}",
                        self.base_url
                    ))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            SummarizationClientError::Unavailable(format!(
                "failed to read engine response: {error}"
            ))
        })?;

        classify_response(status, &body)
    }
}

/// Fold a transport status and body into a summary or a classified error.
fn classify_response(
    status: StatusCode,
    body: &str,
) -> Result<RemoteSummary, SummarizationClientError> {
    let rejected_status = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
    );

    let decoded: EngineResponse = match serde_json::from_str(body) {
        Ok(decoded) => decoded,
        Err(error) => {
            let detail = format!("engine returned {status}: {}", snippet(body));
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                SummarizationClientError::RateLimited(detail)
            } else if rejected_status {
                SummarizationClientError::Rejected(detail)
            } else {
                SummarizationClientError::InvalidResponse(format!(
                    "failed to decode engine response ({status}): {error}"
                ))
            });
        }
    };

    let message = decoded
        .error
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string);

    let limit_signal = message
        .as_deref()
        .is_some_and(|message| message.to_lowercase().contains("limit"));
    if status == StatusCode::TOO_MANY_REQUESTS || (!decoded.success && limit_signal) {
        return Err(SummarizationClientError::RateLimited(
            message.unwrap_or_else(|| format!("engine returned {status}")),
        ));
    }

    if !decoded.success || !status.is_success() {
        let message = message.unwrap_or_else(|| format!("engine returned {status}"));
        return Err(if rejected_status {
            SummarizationClientError::Rejected(message)
        } else {
            SummarizationClientError::GenerationFailed(message)
        });
    }

    let summary_text = decoded.summary_text.trim();
    if summary_text.is_empty() {
        return Err(SummarizationClientError::GenerationFailed(
            "engine returned an empty summary".into(),
        ));
    }

    Ok(RemoteSummary {
        summary_text: summary_text.to_string(),
        processing_time_ms: decoded.processing_time_ms,
    })
}

fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_CHARS).collect();
    cut.push_str("...");
    cut
}
