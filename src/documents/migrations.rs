//! Document database schema migrations.

use rusqlite::Connection;

use super::store::StoreError;

const SCHEMA_VERSION: i64 = 1;

/// Bring the schema up to date. Safe to run on every open.
pub(super) fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            r#"
            -- Uploaded PDFs and their summarization state
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                checksum TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'auto',
                output_type TEXT NOT NULL DEFAULT 'paragraph',
                summary TEXT,
                summary_status TEXT NOT NULL DEFAULT 'pending',
                summary_error TEXT,
                created_at INTEGER NOT NULL,
                upload_date INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_upload_date ON documents(upload_date DESC);

            -- Completed summaries, one row per run
            CREATE TABLE IF NOT EXISTS summary_logs (
                id TEXT PRIMARY KEY,
                pdf_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                language TEXT NOT NULL,
                output_type TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (pdf_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_summary_logs_pdf
                ON summary_logs(pdf_id, created_at DESC);
            "#,
        )?;
    }

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::debug!(from = version, to = SCHEMA_VERSION, "Migrated document schema");
    }
    Ok(())
}
