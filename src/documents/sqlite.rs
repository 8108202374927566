//! SQLite-backed document store.
//!
//! Timestamps are stored as unix microseconds so `ORDER BY` matches chronological order.

use super::migrations::run_migrations;
use super::store::{DocumentStore, StoreError};
use super::types::{Document, DocumentPatch, SummaryLog};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, filename, original_filename, file_path, file_size, checksum, \
     language, output_type, summary, summary_status, summary_error, created_at, upload_date, \
     updated_at";
const LOG_COLUMNS: &str = "id, pdf_id, summary, language, output_type, created_at";

/// Durable document store over a single SQLite file.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open or create the database at `path`, running migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "Opened document database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&mut guard)
        })
        .await?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, document: Document) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            if document_exists(conn, document.id)? {
                return Err(StoreError::Duplicate(document.id));
            }
            conn.execute(
                &format!(
                    "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    document.id.to_string(),
                    document.filename,
                    document.original_filename,
                    path_text(&document.file_path)?,
                    size_to_db(document.file_size)?,
                    document.checksum,
                    document.language.as_str(),
                    document.output_type.as_str(),
                    document.summary,
                    document.summary_status.as_str(),
                    document.summary_error,
                    to_micros(document.created_at),
                    to_micros(document.upload_date),
                    to_micros(document.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Document, StoreError> {
        self.with_conn(move |conn| fetch_document(conn, id)).await
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY upload_date DESC, id ASC"
            ))?;
            let documents = stmt
                .query_map([], document_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(documents)
        })
        .await
    }

    async fn update(&self, id: Uuid, patch: DocumentPatch) -> Result<Document, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut document = fetch_document(&tx, id)?;
            patch.apply(&mut document, OffsetDateTime::now_utc());
            tx.execute(
                "UPDATE documents SET language = ?1, output_type = ?2, summary = ?3, \
                 summary_status = ?4, summary_error = ?5, updated_at = ?6 WHERE id = ?7",
                params![
                    document.language.as_str(),
                    document.output_type.as_str(),
                    document.summary,
                    document.summary_status.as_str(),
                    document.summary_error,
                    to_micros(document.updated_at),
                    id.to_string(),
                ],
            )?;
            let stored = fetch_document(&tx, id)?;
            tx.commit()?;
            Ok(stored)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<Document, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let document = fetch_document(&tx, id)?;
            tx.execute(
                "DELETE FROM documents WHERE id = ?1",
                params![id.to_string()],
            )?;
            tx.commit()?;
            Ok(document)
        })
        .await
    }

    async fn append_log(&self, entry: SummaryLog) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            if !document_exists(conn, entry.pdf_id)? {
                return Err(StoreError::NotFound(entry.pdf_id));
            }
            conn.execute(
                &format!("INSERT INTO summary_logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    entry.id.to_string(),
                    entry.pdf_id.to_string(),
                    entry.summary,
                    entry.language.as_str(),
                    entry.output_type.as_str(),
                    to_micros(entry.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn logs(&self, pdf_id: Uuid) -> Result<Vec<SummaryLog>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOG_COLUMNS} FROM summary_logs WHERE pdf_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let logs = stmt
                .query_map(params![pdf_id.to_string()], log_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(logs)
        })
        .await
    }
}

fn document_exists(conn: &Connection, id: Uuid) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM documents WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn fetch_document(conn: &Connection, id: Uuid) -> Result<Document, StoreError> {
    conn.query_row(
        &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
        params![id.to_string()],
        document_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(id))
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: parse_column(row, 0)?,
        filename: row.get(1)?,
        original_filename: row.get(2)?,
        file_path: PathBuf::from(row.get::<_, String>(3)?),
        file_size: size_column(row, 4)?,
        checksum: row.get(5)?,
        language: parse_column(row, 6)?,
        output_type: parse_column(row, 7)?,
        summary: row.get(8)?,
        summary_status: parse_column(row, 9)?,
        summary_error: row.get(10)?,
        created_at: timestamp_column(row, 11)?,
        upload_date: timestamp_column(row, 12)?,
        updated_at: timestamp_column(row, 13)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<SummaryLog> {
    Ok(SummaryLog {
        id: parse_column(row, 0)?,
        pdf_id: parse_column(row, 1)?,
        summary: row.get(2)?,
        language: parse_column(row, 3)?,
        output_type: parse_column(row, 4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn parse_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(index)?;
    raw.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn size_column(row: &Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(index)?;
    u64::try_from(raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<OffsetDateTime> {
    let micros: i64 = row.get(index)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

fn to_micros(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000) as i64
}

fn size_to_db(size: u64) -> Result<i64, StoreError> {
    i64::try_from(size)
        .map_err(|_| StoreError::InvalidValue(format!("file size {size} is out of range")))
}

fn path_text(path: &Path) -> Result<&str, StoreError> {
    path.to_str()
        .ok_or_else(|| StoreError::InvalidValue(format!("path {} is not UTF-8", path.display())))
}
