//! PDF service coordinating uploads, document records, and summarization runs.

use crate::{
    config::Config,
    documents::{
        BlobError, BlobStore, Document, DocumentStore, FsBlobStore, InMemoryDocumentStore,
        SqliteDocumentStore, StoreError, SummaryLog, content_checksum, validate_upload,
    },
    metrics::{CodeMetrics, MetricsSnapshot},
    processing::{
        orchestrator::SummarizationOrchestrator,
        types::{RetryPolicy, ServiceError, SummarizeError, SummarizeRequest, SummaryResponse},
    },
    summarization::{HttpSummarizationClient, SummarizationClient},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Failures while assembling a [`PdfService`] from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// The document store could not be opened.
    #[error("Failed to open document store: {0}")]
    Store(#[from] StoreError),
    /// The summarization HTTP client could not be built.
    #[error("Failed to build summarization client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Abstraction over the PDF service used by the HTTP surface.
#[async_trait]
pub trait PdfApi: Send + Sync {
    /// Validate and store an uploaded PDF, creating a `pending` document.
    async fn upload(&self, filename: String, content: Vec<u8>) -> Result<Document, ServiceError>;

    /// All documents, most recently uploaded first.
    async fn list(&self) -> Result<Vec<Document>, ServiceError>;

    /// Fetch one document.
    async fn get(&self, id: Uuid) -> Result<Document, ServiceError>;

    /// Remove a document record along with its file and summary history.
    async fn delete(&self, id: Uuid) -> Result<Document, ServiceError>;

    /// Run a summarization for the document.
    async fn summarize(
        &self,
        id: Uuid,
        request: SummarizeRequest,
    ) -> Result<SummaryResponse, ServiceError>;

    /// Reset the document's summarization status to `pending`.
    async fn cancel(&self, id: Uuid) -> Result<Document, ServiceError>;

    /// Summaries previously generated for the document, newest first.
    async fn summary_logs(&self, id: Uuid) -> Result<Vec<SummaryLog>, ServiceError>;

    /// Current counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Largest upload the service accepts, in bytes.
    fn max_upload_bytes(&self) -> u64;
}

/// Concrete PDF service backed by a document store, a blob store, and a summarization client.
///
/// Construct once at process start and share through an `Arc`.
pub struct PdfService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    orchestrator: Arc<SummarizationOrchestrator>,
    metrics: Arc<CodeMetrics>,
    max_upload_bytes: u64,
}

impl PdfService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        client: Arc<dyn SummarizationClient>,
        policy: RetryPolicy,
        max_upload_bytes: u64,
    ) -> Self {
        let metrics = Arc::new(CodeMetrics::new());
        let orchestrator = Arc::new(SummarizationOrchestrator::new(
            documents.clone(),
            blobs.clone(),
            client,
            metrics.clone(),
            policy,
        ));
        Self {
            documents,
            blobs,
            orchestrator,
            metrics,
            max_upload_bytes,
        }
    }

    /// Build the service described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        let documents: Arc<dyn DocumentStore> = match &config.document_db_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using SQLite document store");
                Arc::new(SqliteDocumentStore::open(path)?)
            }
            None => {
                tracing::info!("Using in-memory document store");
                Arc::new(InMemoryDocumentStore::new())
            }
        };
        let blobs = Arc::new(FsBlobStore::new(&config.storage_dir));
        let client = Arc::new(HttpSummarizationClient::new(
            config.summary_service_url.clone(),
            config.summary_request_timeout(),
        )?);
        let policy = RetryPolicy {
            max_attempts: config.summary_max_attempts,
            base_delay: config.summary_retry_delay(),
        };
        tracing::debug!(
            storage_dir = %config.storage_dir.display(),
            max_attempts = policy.max_attempts,
            "PDF service initialized"
        );
        Ok(Self::new(
            documents,
            blobs,
            client,
            policy,
            config.max_upload_bytes,
        ))
    }

    /// Upload a PDF. See [`PdfApi::upload`].
    pub async fn upload(&self, filename: String, content: Vec<u8>) -> Result<Document, ServiceError> {
        let original_filename = Path::new(&filename)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        validate_upload(&original_filename, &content, self.max_upload_bytes)?;

        let id = Uuid::new_v4();
        let file_path = self.blobs.save(&Document::blob_name(id), &content).await?;
        let document = Document::new(
            id,
            original_filename,
            file_path.clone(),
            content.len() as u64,
            content_checksum(&content),
        );

        if let Err(error) = self.documents.insert(document.clone()).await {
            if let Err(cleanup) = self.blobs.delete(&file_path).await {
                tracing::warn!(pdf_id = %id, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(error.into());
        }

        self.metrics.record_upload();
        tracing::info!(
            pdf_id = %id,
            original_filename = %document.original_filename,
            file_size = document.file_size,
            "PDF uploaded"
        );
        Ok(document)
    }

    /// Delete a document. A blob that is already gone is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<Document, ServiceError> {
        let document = self.documents.get(id).await?;
        match self.blobs.delete(&document.file_path).await {
            Ok(()) => {}
            Err(BlobError::NotFound(path)) => {
                tracing::warn!(pdf_id = %id, path = %path.display(), "PDF file already removed");
            }
            Err(error) => return Err(error.into()),
        }
        let document = self.documents.delete(id).await?;
        tracing::info!(pdf_id = %id, "PDF deleted");
        Ok(document)
    }

    /// Run a summarization on a background task.
    ///
    /// Dropping the returned future cancels the run; the task still records the `failed` status.
    pub async fn summarize(
        &self,
        id: Uuid,
        request: SummarizeRequest,
    ) -> Result<SummaryResponse, ServiceError> {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        let orchestrator = self.orchestrator.clone();
        let handle =
            tokio::spawn(async move { orchestrator.summarize(id, &request, &token).await });

        let outcome = handle.await;
        guard.disarm();
        match outcome {
            Ok(result) => result.map_err(ServiceError::from),
            Err(error) => Err(SummarizeError::Internal(format!(
                "summarization task failed: {error}"
            ))
            .into()),
        }
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl PdfApi for PdfService {
    async fn upload(&self, filename: String, content: Vec<u8>) -> Result<Document, ServiceError> {
        PdfService::upload(self, filename, content).await
    }

    async fn list(&self) -> Result<Vec<Document>, ServiceError> {
        Ok(self.documents.list().await?)
    }

    async fn get(&self, id: Uuid) -> Result<Document, ServiceError> {
        Ok(self.documents.get(id).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Document, ServiceError> {
        PdfService::delete(self, id).await
    }

    async fn summarize(
        &self,
        id: Uuid,
        request: SummarizeRequest,
    ) -> Result<SummaryResponse, ServiceError> {
        PdfService::summarize(self, id, request).await
    }

    async fn cancel(&self, id: Uuid) -> Result<Document, ServiceError> {
        Ok(self.orchestrator.cancel(id).await?)
    }

    async fn summary_logs(&self, id: Uuid) -> Result<Vec<SummaryLog>, ServiceError> {
        self.documents.get(id).await?;
        Ok(self.documents.logs(id).await?)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PdfService::metrics_snapshot(self)
    }

    fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }
}
