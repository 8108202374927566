//! Summarization orchestrator: retry, cancellation, and status transitions for one document.
//!
//! A run writes `processing` before the first remote call and always ends with a terminal
//! write (`completed` or `failed`), whichever way it exits. Cancellation is observed both while
//! the remote call is in flight and during the backoff wait between attempts.

use crate::{
    documents::{BlobStore, Document, DocumentStore, SummaryLog, SummaryStatus, transitions},
    metrics::CodeMetrics,
    processing::types::{
        RetryPolicy, SummarizeError, SummarizeOptions, SummarizeRequest, SummaryResponse,
    },
    summarization::{RemoteSummary, SummarizationClient, SummarizationRequest},
};
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CANCELLED_MESSAGE: &str = "cancelled by user";
const FILE_NOT_FOUND_MESSAGE: &str = "file not found";

/// Owns the per-document summarization state machine.
pub struct SummarizationOrchestrator {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    client: Arc<dyn SummarizationClient>,
    metrics: Arc<CodeMetrics>,
    policy: RetryPolicy,
    in_flight: DashSet<Uuid>,
}

/// Releases the in-flight slot for a document when the run ends.
struct InFlightSlot<'a> {
    in_flight: &'a DashSet<Uuid>,
    id: Uuid,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

impl SummarizationOrchestrator {
    /// Assemble an orchestrator over the given collaborators.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        client: Arc<dyn SummarizationClient>,
        metrics: Arc<CodeMetrics>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            documents,
            blobs,
            client,
            metrics,
            policy,
            in_flight: DashSet::new(),
        }
    }

    /// Whether a run for `id` is currently in flight in this process.
    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.in_flight.contains(&id)
    }

    /// Summarize one document.
    ///
    /// Validation, unknown documents, and overlapping runs are rejected without touching the
    /// stored status. Every other outcome leaves the document `completed` or `failed`.
    pub async fn summarize(
        &self,
        id: Uuid,
        request: &SummarizeRequest,
        cancel: &CancellationToken,
    ) -> Result<SummaryResponse, SummarizeError> {
        let started = Instant::now();
        let options = request.validate()?;
        let document = self.documents.get(id).await?;
        let _slot = self.claim(id)?;

        if !transitions::can_transition(document.summary_status, SummaryStatus::Processing) {
            tracing::warn!(
                pdf_id = %id,
                status = %document.summary_status,
                "Document left in processing by an earlier run; restarting"
            );
        }
        self.documents
            .update(id, transitions::start_processing())
            .await?;

        let outcome = self.run(&document, options, cancel, started).await;
        if let Err(SummarizeError::Storage(error)) = &outcome {
            self.mark_failed(id, format!("failed to persist summarization state: {error}"))
                .await;
        }
        outcome
    }

    /// Reset a document to `pending`, clearing its error. An in-flight run is not interrupted.
    pub async fn cancel(&self, id: Uuid) -> Result<Document, SummarizeError> {
        let document = self.documents.update(id, transitions::reset()).await?;
        tracing::info!(pdf_id = %id, "Summarization status reset to pending");
        Ok(document)
    }

    fn claim(&self, id: Uuid) -> Result<InFlightSlot<'_>, SummarizeError> {
        if !self.in_flight.insert(id) {
            tracing::warn!(pdf_id = %id, "Rejected overlapping summarize request");
            return Err(SummarizeError::Conflict(id));
        }
        Ok(InFlightSlot {
            in_flight: &self.in_flight,
            id,
        })
    }

    async fn run(
        &self,
        document: &Document,
        options: SummarizeOptions,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<SummaryResponse, SummarizeError> {
        let id = document.id;
        self.documents
            .update(
                id,
                transitions::select_options(options.language, options.output_type),
            )
            .await?;

        let content = match self.blobs.read(&document.file_path).await {
            Ok(content) => content,
            Err(error) => {
                tracing::error!(pdf_id = %id, error = %error, "Failed to read PDF file");
                self.mark_failed(id, FILE_NOT_FOUND_MESSAGE).await;
                return Err(SummarizeError::FileNotFound(id));
            }
        };

        let request = SummarizationRequest {
            pdf_id: id,
            original_filename: document.original_filename.clone(),
            file_size: document.file_size,
            content,
            language: options.language,
            output_type: options.output_type,
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(id, attempt).await);
            }

            tracing::info!(pdf_id = %id, attempt, max_attempts, "Summarization attempt");
            self.metrics.record_attempt();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(id, attempt).await),
                result = self.client.summarize(&request) => result,
            };

            let error = match result {
                Ok(summary) => {
                    return self
                        .complete(document, options, summary, attempt, started)
                        .await;
                }
                Err(error) => error,
            };

            if error.is_permanent() {
                tracing::error!(pdf_id = %id, attempt, error = %error, "Permanent summarization error");
                self.mark_failed(id, error.to_string()).await;
                return Err(SummarizeError::PermanentRemote(error));
            }

            if attempt >= max_attempts {
                let message = format!("Failed after {max_attempts} attempts: {error}");
                tracing::error!(pdf_id = %id, attempts = max_attempts, error = %error, "Summarization retries exhausted");
                self.mark_failed(id, message).await;
                return Err(SummarizeError::TransientRemote {
                    attempts: max_attempts,
                    last_error: error,
                });
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                pdf_id = %id,
                attempt,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "Transient summarization error; retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(id, attempt).await),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn complete(
        &self,
        document: &Document,
        options: SummarizeOptions,
        summary: RemoteSummary,
        attempts: u32,
        started: Instant,
    ) -> Result<SummaryResponse, SummarizeError> {
        let id = document.id;
        self.documents
            .update(id, transitions::complete(summary.summary_text.clone()))
            .await?;

        let entry = SummaryLog::new(
            id,
            summary.summary_text.clone(),
            options.language,
            options.output_type,
        );
        if let Err(error) = self.documents.append_log(entry).await {
            tracing::warn!(pdf_id = %id, error = %error, "Failed to record summary history");
        }

        self.metrics.record_completed();
        let processing_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            pdf_id = %id,
            attempts,
            processing_time_ms,
            engine_time_ms = summary.processing_time_ms,
            "Summarization completed"
        );

        Ok(SummaryResponse {
            pdf_id: id,
            original_filename: document.original_filename.clone(),
            summary_text: summary.summary_text,
            language: options.language,
            output_type: options.output_type,
            processing_time_ms,
            attempts,
            generated_at: OffsetDateTime::now_utc(),
        })
    }

    async fn cancelled(&self, id: Uuid, attempt: u32) -> SummarizeError {
        tracing::info!(pdf_id = %id, attempt, "Summarization cancelled");
        self.mark_failed(id, CANCELLED_MESSAGE).await;
        SummarizeError::Cancelled
    }

    async fn mark_failed(&self, id: Uuid, message: impl Into<String>) {
        self.metrics.record_failed();
        if let Err(error) = self.documents.update(id, transitions::fail(message)).await {
            tracing::error!(pdf_id = %id, error = %error, "Failed to record summarization failure");
        }
    }
}
