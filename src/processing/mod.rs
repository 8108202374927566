//! Summarization pipeline: retry orchestration and the service surface built on it.

pub mod orchestrator;
mod service;
pub mod types;

pub use orchestrator::SummarizationOrchestrator;
pub use service::{PdfApi, PdfService, ServiceInitError};
pub use types::{
    RetryPolicy, ServiceError, SummarizeError, SummarizeErrorKind, SummarizeOptions,
    SummarizeRequest, SummaryResponse,
};
