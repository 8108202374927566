//! Document records, their persistence backends, and the summarization status machine.

pub mod blob;
mod migrations;
pub mod sqlite;
pub mod store;
pub mod transitions;
pub mod types;
pub mod upload;

pub use blob::{BlobError, BlobStore, FsBlobStore};
pub use sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, InMemoryDocumentStore, StoreError};
pub use types::{
    Document, DocumentPatch, InvalidOption, Language, OutputType, SummaryLog, SummaryStatus,
};
pub use upload::{UploadError, content_checksum, validate_upload};
