//! SQLite section store.
//!
//! Sections live in a single `page_sections` table with the embedding stored
//! as a little-endian `f32` blob. SQLite has no vector index, so matching
//! loads the rows and ranks them in process with [`crate::vector::rank`].

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use docent_core::{
    DocumentSection, FailedRecord, InsertReport, RetrievalOptions, Scored, SectionStore,
    StoreError,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::in_memory::{ranking_error, validate_batch};
use crate::vector::rank;

pub struct SqliteSectionStore {
    pool: SqlitePool,
}

impl SqliteSectionStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database exists per connection.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite section store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS page_sections (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                id           TEXT UNIQUE NOT NULL,
                source       TEXT NOT NULL,
                heading      TEXT,
                slug         TEXT,
                content      TEXT NOT NULL,
                token_count  INTEGER NOT NULL,
                checksum     TEXT UNIQUE NOT NULL,
                embedding    BLOB NOT NULL,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("page_sections table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_page_sections_source ON page_sections(source)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("source index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_section(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentSection, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let token_count: i64 = row.try_get("token_count").map_err(|e| column("token_count", e))?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        Ok(DocumentSection {
            id: row.try_get("id").map_err(|e| column("id", e))?,
            source: row.try_get("source").map_err(|e| column("source", e))?,
            heading: row.try_get("heading").map_err(|e| column("heading", e))?,
            slug: row.try_get("slug").map_err(|e| column("slug", e))?,
            content: row.try_get("content").map_err(|e| column("content", e))?,
            token_count: usize::try_from(token_count).unwrap_or_default(),
            checksum: row.try_get("checksum").map_err(|e| column("checksum", e))?,
            embedding: blob_to_embedding(&blob),
        })
    }

    /// Dimension of the stored embeddings, if any row exists.
    async fn stored_dimension(&self) -> Result<Option<usize>, StoreError> {
        let row = sqlx::query("SELECT length(embedding) AS bytes FROM page_sections LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("dimension probe: {e}")))?;

        match row {
            Some(r) => {
                let bytes: i64 = r
                    .try_get("bytes")
                    .map_err(|e| StoreError::QueryFailed(format!("bytes column: {e}")))?;
                Ok(Some(bytes as usize / 4))
            }
            None => Ok(None),
        }
    }
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl SectionStore for SqliteSectionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn match_sections(
        &self,
        options: &RetrievalOptions<'_>,
    ) -> Result<Vec<Scored<DocumentSection>>, StoreError> {
        // Rows shorter than the minimum can never match, so filter them in SQL.
        let rows = sqlx::query(
            "SELECT * FROM page_sections WHERE length(content) >= ?1 ORDER BY iid ASC",
        )
        .bind(options.min_content_length as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("section scan: {e}")))?;

        let sections = rows
            .iter()
            .map(Self::row_to_section)
            .collect::<Result<Vec<_>, _>>()?;

        let matches = rank(&sections, options).map_err(ranking_error)?;
        debug!(scanned = sections.len(), matched = matches.len(), "SQLite section match");
        Ok(matches)
    }

    async fn insert_batch(
        &self,
        batch: Vec<DocumentSection>,
    ) -> Result<InsertReport, StoreError> {
        let dimension = self.stored_dimension().await?;
        let mut failed = validate_batch(&batch, dimension);
        if !failed.is_empty() {
            return Err(StoreError::InsertFailed { failed });
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let created_at = Utc::now().to_rfc3339();
        let mut report = InsertReport::default();

        for (index, section) in batch.iter().enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO page_sections
                    (id, source, heading, slug, content, token_count, checksum, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(checksum) DO NOTHING
                "#,
            )
            .bind(&section.id)
            .bind(&section.source)
            .bind(&section.heading)
            .bind(&section.slug)
            .bind(&section.content)
            .bind(section.token_count as i64)
            .bind(&section.checksum)
            .bind(embedding_to_blob(&section.embedding))
            .bind(&created_at)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 0 => report.unchanged += 1,
                Ok(_) => report.inserted += 1,
                Err(e) => failed.push(FailedRecord { index, reason: e.to_string() }),
            }
        }

        if !failed.is_empty() {
            warn!(failed = failed.len(), "Rolling back section batch");
            tx.rollback()
                .await
                .map_err(|e| StoreError::Storage(format!("ROLLBACK failed: {e}")))?;
            return Err(StoreError::InsertFailed { failed });
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(inserted = report.inserted, unchanged = report.unchanged, "Stored section batch");
        Ok(report)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM page_sections")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM page_sections")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }
}
