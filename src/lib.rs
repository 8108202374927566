#![deny(missing_docs)]

//! Core library for the PDF summarizer service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document records, file storage, and summarization status.
pub mod documents;
/// Structured logging and tracing setup.
pub mod logging;
/// Upload and summarization counters.
pub mod metrics;
/// Summarization orchestration and the service surface.
pub mod processing;
/// Remote summarization engine client.
pub mod summarization;
