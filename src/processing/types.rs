//! Request, response, and error types for the summarization pipeline.

use crate::documents::{
    BlobError, Language, OutputType, StoreError, UploadError,
};
use crate::summarization::SummarizationClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Coarse classification of a [`SummarizeError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizeErrorKind {
    /// Malformed request options.
    Validation,
    /// Unknown document or missing blob.
    NotFound,
    /// Another run for the same document is in flight.
    Conflict,
    /// The engine refused the request or rate limited it.
    PermanentRemote,
    /// The engine kept failing until the attempt budget ran out.
    TransientRemote,
    /// The caller cancelled the run.
    Cancelled,
    /// Persistence or runtime failure inside the service.
    Internal,
}

/// Errors returned by a summarize run.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Language or output style is not one of the accepted values.
    #[error("Invalid request data: {0}")]
    Validation(String),
    /// No document exists with the requested id.
    #[error("PDF not found")]
    DocumentNotFound(Uuid),
    /// The document record exists but its file could not be read.
    #[error("PDF file not found")]
    FileNotFound(Uuid),
    /// A summarize run for this document is already in progress.
    #[error("Summarization already in progress for PDF {0}")]
    Conflict(Uuid),
    /// The engine returned a non-retryable failure.
    #[error("{0}")]
    PermanentRemote(SummarizationClientError),
    /// Every attempt failed with a retryable error.
    #[error("Summarization failed after {attempts} attempts: {last_error}")]
    TransientRemote {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the final attempt.
        last_error: SummarizationClientError,
    },
    /// The run was cancelled before it finished.
    #[error("Summarization cancelled")]
    Cancelled,
    /// The document store failed.
    #[error("Document store failed: {0}")]
    Storage(StoreError),
    /// The run could not be driven to completion.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummarizeError {
    /// Classification of this error.
    pub fn kind(&self) -> SummarizeErrorKind {
        match self {
            Self::Validation(_) => SummarizeErrorKind::Validation,
            Self::DocumentNotFound(_) | Self::FileNotFound(_) => SummarizeErrorKind::NotFound,
            Self::Conflict(_) => SummarizeErrorKind::Conflict,
            Self::PermanentRemote(_) => SummarizeErrorKind::PermanentRemote,
            Self::TransientRemote { .. } => SummarizeErrorKind::TransientRemote,
            Self::Cancelled => SummarizeErrorKind::Cancelled,
            Self::Storage(_) | Self::Internal(_) => SummarizeErrorKind::Internal,
        }
    }
}

impl From<StoreError> for SummarizeError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::DocumentNotFound(id),
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by the PDF service surface.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upload was refused.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// No document exists with the requested id.
    #[error("PDF not found")]
    NotFound(Uuid),
    /// Blob storage failed.
    #[error("File storage failed: {0}")]
    Blob(#[from] BlobError),
    /// The document store failed.
    #[error("Document store failed: {0}")]
    Store(StoreError),
    /// A summarize run failed.
    #[error(transparent)]
    Summarize(#[from] SummarizeError),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Raw summarize options as received from a caller.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SummarizeRequest {
    /// One of `auto`, `id`, `en`, `ja`.
    #[serde(default)]
    pub language: String,
    /// One of `paragraph`, `bullet`, `pointer`.
    #[serde(default)]
    pub output_type: String,
}

impl SummarizeRequest {
    /// Convenience constructor.
    pub fn new(language: impl Into<String>, output_type: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            output_type: output_type.into(),
        }
    }

    /// Parse both selectors, rejecting unknown values.
    pub fn validate(&self) -> Result<SummarizeOptions, SummarizeError> {
        let language = self
            .language
            .parse::<Language>()
            .map_err(|error| SummarizeError::Validation(error.to_string()))?;
        let output_type = self
            .output_type
            .parse::<OutputType>()
            .map_err(|error| SummarizeError::Validation(error.to_string()))?;
        Ok(SummarizeOptions {
            language,
            output_type,
        })
    }
}

/// Validated summarize options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeOptions {
    /// Requested language.
    pub language: Language,
    /// Requested output style.
    pub output_type: OutputType,
}

/// Result of a completed summarize run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResponse {
    /// Summarized document.
    pub pdf_id: Uuid,
    /// Uploader-supplied filename.
    pub original_filename: String,
    /// Generated summary.
    pub summary_text: String,
    /// Language used.
    pub language: Language,
    /// Output style used.
    pub output_type: OutputType,
    /// Wall-clock time of the whole run, retries included.
    pub processing_time_ms: u64,
    /// Number of remote attempts the run needed.
    pub attempts: u32,
    /// Completion time.
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

/// Attempt budget and backoff for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait applied after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
    }

    #[test]
    fn validation_rejects_unknown_selectors() {
        let options = SummarizeRequest::new("en", "paragraph")
            .validate()
            .expect("valid");
        assert_eq!(options.language, Language::En);
        assert_eq!(options.output_type, OutputType::Paragraph);

        let error = SummarizeRequest::new("xx", "paragraph")
            .validate()
            .expect_err("bad language");
        assert_eq!(error.kind(), SummarizeErrorKind::Validation);

        let error = SummarizeRequest::default()
            .validate()
            .expect_err("missing fields");
        assert_eq!(error.kind(), SummarizeErrorKind::Validation);
    }

    #[test]
    fn store_not_found_maps_to_document_not_found() {
        let id = Uuid::new_v4();
        let error = SummarizeError::from(StoreError::NotFound(id));
        assert!(matches!(error, SummarizeError::DocumentNotFound(missing) if missing == id));
        assert_eq!(error.kind(), SummarizeErrorKind::NotFound);
    }
}
