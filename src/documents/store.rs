//! Document metadata persistence.
//!
//! The orchestrator only relies on `get` and `update`; the rest backs the CRUD surface. The
//! process-local backend lives here; the durable one is [`crate::documents::SqliteDocumentStore`].

use super::types::{Document, DocumentPatch, SummaryLog};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors returned by document store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists with the requested id.
    #[error("Document {0} not found")]
    NotFound(Uuid),
    /// A document with the same id was already inserted.
    #[error("Document {0} already exists")]
    Duplicate(Uuid),
    /// Preparing the database location failed.
    #[error("Document store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A SQLite statement failed.
    #[error("Document store query failed: {0}")]
    Database(#[from] rusqlite::Error),
    /// A stored value could not be converted to or from its column type.
    #[error("Document store holds an invalid value: {0}")]
    InvalidValue(String),
    /// The connection mutex was poisoned by a panicking holder.
    #[error("Document store connection lock poisoned")]
    Poisoned,
    /// The blocking database task did not complete.
    #[error("Document store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Persistence backend for document records and their summary history.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document.
    async fn insert(&self, document: Document) -> Result<(), StoreError>;

    /// Fetch a document by id.
    async fn get(&self, id: Uuid) -> Result<Document, StoreError>;

    /// Return every document, most recent upload first.
    async fn list(&self) -> Result<Vec<Document>, StoreError>;

    /// Apply a partial update and return the updated record.
    async fn update(&self, id: Uuid, patch: DocumentPatch) -> Result<Document, StoreError>;

    /// Remove a document and its summary history, returning the removed record.
    async fn delete(&self, id: Uuid) -> Result<Document, StoreError>;

    /// Append a summary history entry.
    async fn append_log(&self, entry: SummaryLog) -> Result<(), StoreError>;

    /// Summary history for one document, newest first.
    async fn logs(&self, pdf_id: Uuid) -> Result<Vec<SummaryLog>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<Uuid, Document>,
    logs: Vec<SummaryLog>,
}

impl StoreState {
    fn insert(&mut self, document: Document) -> Result<(), StoreError> {
        if self.documents.contains_key(&document.id) {
            return Err(StoreError::Duplicate(document.id));
        }
        self.documents.insert(document.id, document);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Document, StoreError> {
        self.documents
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self.documents.values().cloned().collect();
        documents.sort_by(|left, right| {
            right
                .upload_date
                .cmp(&left.upload_date)
                .then_with(|| left.id.cmp(&right.id))
        });
        documents
    }

    fn update(&mut self, id: Uuid, patch: DocumentPatch) -> Result<Document, StoreError> {
        let document = self
            .documents
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        patch.apply(document, OffsetDateTime::now_utc());
        Ok(document.clone())
    }

    fn delete(&mut self, id: Uuid) -> Result<Document, StoreError> {
        let document = self.documents.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.logs.retain(|entry| entry.pdf_id != id);
        Ok(document)
    }

    fn append_log(&mut self, entry: SummaryLog) -> Result<(), StoreError> {
        if !self.documents.contains_key(&entry.pdf_id) {
            return Err(StoreError::NotFound(entry.pdf_id));
        }
        self.logs.push(entry);
        Ok(())
    }

    fn logs(&self, pdf_id: Uuid) -> Vec<SummaryLog> {
        let mut entries: Vec<SummaryLog> = self
            .logs
            .iter()
            .filter(|entry| entry.pdf_id == pdf_id)
            .cloned()
            .collect();
        entries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        entries
    }
}

/// Process-local document store.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<StoreState>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: Document) -> Result<(), StoreError> {
        self.state.write().await.insert(document)
    }

    async fn get(&self, id: Uuid) -> Result<Document, StoreError> {
        self.state.read().await.get(id)
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.state.read().await.list())
    }

    async fn update(&self, id: Uuid, patch: DocumentPatch) -> Result<Document, StoreError> {
        self.state.write().await.update(id, patch)
    }

    async fn delete(&self, id: Uuid) -> Result<Document, StoreError> {
        self.state.write().await.delete(id)
    }

    async fn append_log(&self, entry: SummaryLog) -> Result<(), StoreError> {
        self.state.write().await.append_log(entry)
    }

    async fn logs(&self, pdf_id: Uuid) -> Result<Vec<SummaryLog>, StoreError> {
        Ok(self.state.read().await.logs(pdf_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::transitions;
    use crate::documents::types::{Language, OutputType};
    use std::path::PathBuf;

    fn sample(name: &str) -> Document {
        let id = Uuid::new_v4();
        Document::new(
            id,
            name.into(),
            PathBuf::from(format!("/tmp/{id}.pdf")),
            1024,
            "checksum".into(),
        )
    }

    #[tokio::test]
    async fn update_reports_missing_documents() {
        let store = InMemoryDocumentStore::new();
        let id = Uuid::new_v4();
        let error = store
            .update(id, transitions::reset())
            .await
            .expect_err("missing document");
        assert!(matches!(error, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let document = sample("a.pdf");
        store.insert(document.clone()).await.expect("first insert");
        let error = store.insert(document).await.expect_err("duplicate");
        assert!(matches!(error, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn list_orders_by_upload_date_descending() {
        let store = InMemoryDocumentStore::new();
        let mut older = sample("older.pdf");
        older.upload_date -= time::Duration::hours(1);
        let newer = sample("newer.pdf");
        store.insert(older).await.expect("insert older");
        store.insert(newer).await.expect("insert newer");

        let names: Vec<_> = store
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|document| document.original_filename)
            .collect();
        assert_eq!(names, vec!["newer.pdf", "older.pdf"]);
    }

    #[tokio::test]
    async fn delete_drops_history() {
        let store = InMemoryDocumentStore::new();
        let document = sample("a.pdf");
        let id = document.id;
        store.insert(document).await.expect("insert");
        store
            .append_log(SummaryLog::new(
                id,
                "text".into(),
                Language::En,
                OutputType::Bullet,
            ))
            .await
            .expect("append");
        assert_eq!(store.logs(id).await.expect("logs").len(), 1);

        store.delete(id).await.expect("delete");
        assert!(store.logs(id).await.expect("logs").is_empty());
        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
    }
}
