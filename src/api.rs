//! HTTP surface for the PDF summarizer.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /pdfs` – Multipart upload (`file` field). Validates extension, signature, and size, then
//!   returns the new document id with status `201`.
//! - `GET /pdfs` – List documents, most recent upload first.
//! - `GET /pdfs/:id` – Fetch one document including its summarization status.
//! - `DELETE /pdfs/:id` – Remove the document, its stored file, and its summary history.
//! - `POST /pdfs/:id/summarize` – Run a summarization with `{ "language", "output_type" }`.
//! - `POST /pdfs/:id/cancel` – Reset the summarization status to `pending`.
//! - `GET /pdfs/:id/logs` – Summary history for a document.
//! - `GET /metrics` – Upload and summarization counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Errors are rendered as `{ "code", "status", "message" }`.

use crate::documents::{Document, Language, OutputType, SummaryLog, SummaryStatus};
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    PdfApi, ServiceError, SummarizeError, SummarizeErrorKind, SummarizeRequest, SummaryResponse,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Room left in the body limit for multipart framing around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the HTTP router exposing the PDF API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PdfApi + 'static,
{
    let body_limit = usize::try_from(service.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/pdfs", get(list_pdfs::<S>).post(upload_pdf::<S>))
        .route("/pdfs/:id", get(get_pdf::<S>).delete(delete_pdf::<S>))
        .route("/pdfs/:id/summarize", post(summarize_pdf::<S>))
        .route("/pdfs/:id/cancel", post(cancel_summary::<S>))
        .route("/pdfs/:id/logs", get(summary_logs::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Document representation returned by the API. The storage path stays internal.
#[derive(Serialize)]
struct DocumentResponse {
    id: Uuid,
    filename: String,
    original_filename: String,
    file_size: u64,
    checksum: String,
    language: Language,
    output_type: OutputType,
    summary: Option<String>,
    summary_status: SummaryStatus,
    summary_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    upload_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename,
            original_filename: document.original_filename,
            file_size: document.file_size,
            checksum: document.checksum,
            language: document.language,
            output_type: document.output_type,
            summary: document.summary,
            summary_status: document.summary_status,
            summary_error: document.summary_error,
            created_at: document.created_at,
            upload_date: document.upload_date,
            updated_at: document.updated_at,
        }
    }
}

/// Success response for `POST /pdfs`.
#[derive(Serialize)]
struct UploadResponse {
    id: Uuid,
    original_filename: String,
    file_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    upload_date: OffsetDateTime,
    message: &'static str,
}

/// Accept a multipart upload and store it as a new document.
async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError>
where
    S: PdfApi,
{
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(AppError::multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(AppError::multipart)?;
        file = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, content) = file.unwrap_or_default();
    let document = service.upload(filename, content).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: document.id,
            original_filename: document.original_filename,
            file_size: document.file_size,
            upload_date: document.upload_date,
            message: "PDF uploaded successfully",
        }),
    ))
}

/// Response body for `GET /pdfs`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentResponse>,
    total: usize,
}

async fn list_pdfs<S>(State(service): State<Arc<S>>) -> Result<Json<DocumentsResponse>, AppError>
where
    S: PdfApi,
{
    let documents: Vec<DocumentResponse> = service
        .list()
        .await?
        .into_iter()
        .map(DocumentResponse::from)
        .collect();
    Ok(Json(DocumentsResponse {
        total: documents.len(),
        documents,
    }))
}

async fn get_pdf<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError>
where
    S: PdfApi,
{
    let document = service.get(parse_id(&id)?).await?;
    Ok(Json(document.into()))
}

/// Response body for `DELETE /pdfs/:id`.
#[derive(Serialize)]
struct DeleteResponse {
    id: Uuid,
    message: &'static str,
}

async fn delete_pdf<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: PdfApi,
{
    let document = service.delete(parse_id(&id)?).await?;
    Ok(Json(DeleteResponse {
        id: document.id,
        message: "PDF deleted successfully",
    }))
}

/// Run a summarization and wait for its outcome.
///
/// A client disconnect drops this future, which cancels the run.
async fn summarize_pdf<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: PdfApi,
{
    let id = parse_id(&id)?;
    let Json(request) = payload.map_err(|rejection| {
        AppError::from(ServiceError::from(SummarizeError::Validation(
            rejection.body_text(),
        )))
    })?;
    let response = service.summarize(id, request).await?;
    Ok(Json(response))
}

async fn cancel_summary<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError>
where
    S: PdfApi,
{
    let document = service.cancel(parse_id(&id)?).await?;
    Ok(Json(document.into()))
}

/// Response body for `GET /pdfs/:id/logs`.
#[derive(Serialize)]
struct LogsResponse {
    pdf_id: Uuid,
    logs: Vec<SummaryLog>,
}

async fn summary_logs<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<LogsResponse>, AppError>
where
    S: PdfApi,
{
    let pdf_id = parse_id(&id)?;
    let logs = service.summary_logs(pdf_id).await?;
    Ok(Json(LogsResponse { pdf_id, logs }))
}

/// Return a metrics snapshot with upload and summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PdfApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/pdfs",
                description: "Upload a PDF as multipart form data in the `file` field. Response returns { \"id\": uuid, \"original_filename\": string, \"file_size\": number }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list",
                method: "GET",
                path: "/pdfs",
                description: "List uploaded PDFs with their summarization status, newest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "get",
                method: "GET",
                path: "/pdfs/:id",
                description: "Fetch one PDF record including its latest summary.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete",
                method: "DELETE",
                path: "/pdfs/:id",
                description: "Delete a PDF, its stored file, and its summary history.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/pdfs/:id/summarize",
                description: "Summarize a PDF with the remote engine, retrying transient failures.",
                request_example: Some(json!({
                    "language": "en",
                    "output_type": "bullet"
                })),
            },
            CommandDescriptor {
                name: "cancel",
                method: "POST",
                path: "/pdfs/:id/cancel",
                description: "Reset the summarization status of a PDF to pending.",
                request_example: None,
            },
            CommandDescriptor {
                name: "logs",
                method: "GET",
                path: "/pdfs/:id/logs",
                description: "List summaries previously generated for a PDF.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and summarization counters.",
                request_example: None,
            },
        ],
    })
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_id",
        message: "Invalid PDF ID".into(),
    })
}

/// Error rendered as a JSON body with a matching status code.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn multipart(error: axum::extract::multipart::MultipartError) -> Self {
        let status = error.status();
        Self {
            status,
            code: "invalid_upload",
            message: error.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), code = self.code, error = %self.message, "Request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), code = self.code, error = %self.message, "Request rejected");
        }
        let body = json!({
            "code": self.code,
            "status": self.status.as_u16(),
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        let (status, code) = match &error {
            ServiceError::Upload(_) => (StatusCode::BAD_REQUEST, "invalid_upload"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Blob(_) | ServiceError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            ServiceError::Summarize(inner) => summarize_status(inner),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

fn summarize_status(error: &SummarizeError) -> (StatusCode, &'static str) {
    match error.kind() {
        SummarizeErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
        SummarizeErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        SummarizeErrorKind::Conflict => (StatusCode::CONFLICT, "summarization_in_progress"),
        SummarizeErrorKind::PermanentRemote => match error {
            SummarizeError::PermanentRemote(inner) if inner.is_rate_limited() => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited")
            }
            _ => (StatusCode::BAD_REQUEST, "summarization_rejected"),
        },
        SummarizeErrorKind::TransientRemote => {
            (StatusCode::SERVICE_UNAVAILABLE, "summarization_unavailable")
        }
        SummarizeErrorKind::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
        SummarizeErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::documents::{FsBlobStore, InMemoryDocumentStore};
    use crate::processing::{PdfService, RetryPolicy};
    use crate::summarization::{
        RemoteSummary, SummarizationClient, SummarizationClientError, SummarizationRequest,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdfsum-test-boundary";

    enum Reply {
        Summary(&'static str),
        RateLimited,
        Unavailable,
    }

    struct FixedClient(Reply);

    #[async_trait]
    impl SummarizationClient for FixedClient {
        async fn summarize(
            &self,
            _request: &SummarizationRequest,
        ) -> Result<RemoteSummary, SummarizationClientError> {
            match self.0 {
                Reply::Summary(text) => Ok(RemoteSummary {
                    summary_text: text.into(),
                    processing_time_ms: 3,
                }),
                Reply::RateLimited => Err(SummarizationClientError::RateLimited(
                    "rate limit reached".into(),
                )),
                Reply::Unavailable => Err(SummarizationClientError::Unavailable(
                    "engine down".into(),
                )),
            }
        }
    }

    fn app(reply: Reply) -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = PdfService::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(FsBlobStore::new(dir.path())),
            Arc::new(FixedClient(reply)),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
            1024 * 1024,
        );
        (dir, create_router(Arc::new(service)))
    }

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, json)
    }

    async fn upload(app: &Router, filename: &str, content: &[u8]) -> (StatusCode, Value) {
        send(
            app,
            Request::builder()
                .method(Method::POST)
                .uri("/pdfs")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(filename, content)))
                .expect("request"),
        )
        .await
    }

    fn summarize_request(id: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/pdfs/{id}/summarize"))
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn get_request(uri: String) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/pdfs/:id/summarize");
        assert!(commands.len() >= 5);
    }

    #[tokio::test]
    async fn upload_then_summarize_round_trip() {
        let (_dir, app) = app(Reply::Summary("X"));

        let (status, uploaded) = upload(&app, "paper.pdf", b"%PDF-1.4 body").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(uploaded["original_filename"], "paper.pdf");
        assert_eq!(uploaded["file_size"], 13);
        let id = uploaded["id"].as_str().expect("id").to_string();

        let (status, summary) = send(
            &app,
            summarize_request(&id, json!({ "language": "en", "output_type": "paragraph" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["summary_text"], "X");
        assert_eq!(summary["attempts"], 1);

        let (status, document) = send(&app, get_request(format!("/pdfs/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(document["summary_status"], "completed");
        assert_eq!(document["summary"], "X");
        assert_eq!(document["language"], "en");
        assert_eq!(document["output_type"], "paragraph");
        assert_eq!(document["original_filename"], "paper.pdf");
        assert_eq!(document["file_size"], 13);
        assert!(document.get("file_path").is_none());

        let (status, logs) = send(&app, get_request(format!("/pdfs/{id}/logs"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(logs["logs"].as_array().map(Vec::len), Some(1));

        let (_, metrics) = send(&app, get_request("/metrics".into())).await;
        assert_eq!(metrics["documents_uploaded"], 1);
        assert_eq!(metrics["summaries_completed"], 1);
    }

    #[tokio::test]
    async fn upload_rejections_are_bad_requests() {
        let (_dir, app) = app(Reply::Summary("X"));

        let (status, body) = upload(&app, "notes.txt", b"%PDF-1.4").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_upload");
        assert_eq!(body["status"], 400);

        let (status, _) = upload(&app, "fake.pdf", b"GIF89a").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listing) = send(&app, get_request("/pdfs".into())).await;
        assert_eq!(listing["total"], 0);
    }

    #[tokio::test]
    async fn invalid_ids_and_unknown_documents() {
        let (_dir, app) = app(Reply::Summary("X"));

        let (status, body) = send(&app, get_request("/pdfs/not-a-uuid".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid PDF ID");

        let unknown = uuid::Uuid::new_v4().to_string();
        let (status, body) = send(&app, get_request(format!("/pdfs/{unknown}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        let (status, _) = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri(format!("/pdfs/{unknown}/cancel"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_errors_map_to_statuses() {
        let (_dir, app) = app(Reply::RateLimited);
        let (_, uploaded) = upload(&app, "a.pdf", b"%PDF-1.4").await;
        let id = uploaded["id"].as_str().expect("id").to_string();

        let (status, body) = send(
            &app,
            summarize_request(&id, json!({ "language": "fr", "output_type": "paragraph" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = send(
            &app,
            summarize_request(&id, json!({ "language": "auto", "output_type": "bullet" })),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");

        let (_, document) = send(&app, get_request(format!("/pdfs/{id}"))).await;
        assert_eq!(document["summary_status"], "failed");

        let (_dir, app) = self::app(Reply::Unavailable);
        let (_, uploaded) = upload(&app, "b.pdf", b"%PDF-1.4").await;
        let id = uploaded["id"].as_str().expect("id").to_string();
        let (status, body) = send(
            &app,
            summarize_request(&id, json!({ "language": "en", "output_type": "bullet" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(
            body["message"]
                .as_str()
                .is_some_and(|message| message.contains("2 attempts"))
        );
    }

    #[tokio::test]
    async fn cancel_and_delete_flow() {
        let (_dir, app) = app(Reply::Summary("kept"));
        let (_, uploaded) = upload(&app, "c.pdf", b"%PDF-1.4").await;
        let id = uploaded["id"].as_str().expect("id").to_string();
        send(
            &app,
            summarize_request(&id, json!({ "language": "en", "output_type": "paragraph" })),
        )
        .await;

        let (status, document) = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri(format!("/pdfs/{id}/cancel"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(document["summary_status"], "pending");
        assert_eq!(document["summary"], "kept");
        assert!(document["summary_error"].is_null());

        let (status, _) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/pdfs/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get_request(format!("/pdfs/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
