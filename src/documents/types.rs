//! Document records, summarization selectors, and partial-update patches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Raised when a selector string is not one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported {field} '{value}'")]
pub struct InvalidOption {
    /// Name of the field being parsed (`language` or `output_type`).
    pub field: &'static str,
    /// Rejected input value.
    pub value: String,
}

/// Persisted summarization state of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// No summary run has started since upload or the last reset.
    #[default]
    Pending,
    /// A summary run is in flight.
    Processing,
    /// The last run produced a summary.
    Completed,
    /// The last run ended without a summary.
    Failed,
}

impl SummaryStatus {
    /// Wire representation of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for SummaryStatus {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(InvalidOption {
                field: "summary_status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target language requested from the summarization engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Let the engine detect the document language.
    #[default]
    Auto,
    /// Indonesian.
    Id,
    /// English.
    En,
    /// Japanese.
    Ja,
}

impl Language {
    /// Wire representation sent to the engine.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Id => "id",
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

impl FromStr for Language {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "id" => Ok(Self::Id),
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            _ => Err(InvalidOption {
                field: "language",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the generated summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// Flowing prose.
    #[default]
    Paragraph,
    /// Bulleted list.
    Bullet,
    /// Short key-point list.
    Pointer,
}

impl OutputType {
    /// Wire representation sent to the engine.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Bullet => "bullet",
            Self::Pointer => "pointer",
        }
    }
}

impl FromStr for OutputType {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paragraph" => Ok(Self::Paragraph),
            "bullet" => Ok(Self::Bullet),
            "pointer" => Ok(Self::Pointer),
            _ => Err(InvalidOption {
                field: "output_type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata and summarization state for one uploaded PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier assigned at upload.
    pub id: Uuid,
    /// Name of the stored blob (`<id>.pdf`).
    pub filename: String,
    /// Filename supplied by the uploader.
    pub original_filename: String,
    /// Location of the blob inside the blob store.
    pub file_path: PathBuf,
    /// Size of the uploaded content in bytes.
    pub file_size: u64,
    /// Hex-encoded SHA-256 of the uploaded content.
    pub checksum: String,
    /// Language used by the most recent summarize request.
    pub language: Language,
    /// Output style used by the most recent summarize request.
    pub output_type: OutputType,
    /// Latest summary text, when one exists.
    pub summary: Option<String>,
    /// Current summarization state.
    pub summary_status: SummaryStatus,
    /// Failure reason, present only while `summary_status` is `failed`.
    pub summary_error: Option<String>,
    /// Record creation time.
    pub created_at: OffsetDateTime,
    /// Upload time.
    pub upload_date: OffsetDateTime,
    /// Last modification time.
    pub updated_at: OffsetDateTime,
}

impl Document {
    /// Build a freshly uploaded document in the `pending` state.
    pub fn new(
        id: Uuid,
        original_filename: String,
        file_path: PathBuf,
        file_size: u64,
        checksum: String,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            filename: Self::blob_name(id),
            original_filename,
            file_path,
            file_size,
            checksum,
            language: Language::default(),
            output_type: OutputType::default(),
            summary: None,
            summary_status: SummaryStatus::Pending,
            summary_error: None,
            created_at: now,
            upload_date: now,
            updated_at: now,
        }
    }

    /// Blob name used for a document id.
    pub fn blob_name(id: Uuid) -> String {
        format!("{id}.pdf")
    }
}

/// Partial update applied by [`crate::documents::DocumentStore::update`].
///
/// `None` leaves a field untouched. For the optional columns, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    /// New summarization status.
    pub summary_status: Option<SummaryStatus>,
    /// New summary text.
    pub summary: Option<Option<String>>,
    /// New failure reason.
    pub summary_error: Option<Option<String>>,
    /// New language selection.
    pub language: Option<Language>,
    /// New output style selection.
    pub output_type: Option<OutputType>,
}

impl DocumentPatch {
    /// Apply the patch in place, bumping `updated_at` to `now`.
    pub fn apply(self, document: &mut Document, now: OffsetDateTime) {
        if let Some(status) = self.summary_status {
            document.summary_status = status;
        }
        if let Some(summary) = self.summary {
            document.summary = summary;
        }
        if let Some(error) = self.summary_error {
            document.summary_error = error;
        }
        if let Some(language) = self.language {
            document.language = language;
        }
        if let Some(output_type) = self.output_type {
            document.output_type = output_type;
        }
        document.updated_at = now;
    }
}

/// Historical record of one completed summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLog {
    /// Identifier of the log entry.
    pub id: Uuid,
    /// Document the summary belongs to.
    pub pdf_id: Uuid,
    /// Generated summary text.
    pub summary: String,
    /// Language selected for this summary.
    pub language: Language,
    /// Output style selected for this summary.
    pub output_type: OutputType,
    /// Time the summary was stored.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SummaryLog {
    /// Build a history entry stamped with the current time.
    pub fn new(pdf_id: Uuid, summary: String, language: Language, output_type: OutputType) -> Self {
        Self {
            id: Uuid::new_v4(),
            pdf_id,
            summary,
            language,
            output_type,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
