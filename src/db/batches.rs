use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::info;

use crate::models::{parse_batch_state, CaptureBatch, ImageRef};

/// Durability contract for capture batches and their image blobs.
///
/// The pipeline never touches storage directly; everything it persists
/// goes through this interface.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Most recent unsent (open or processed) batch for the session.
    async fn load_open_batch(&self, session_key: &str) -> Result<Option<CaptureBatch>>;

    /// Insert or update the batch record and its image references.
    async fn save_batch(&self, batch: &CaptureBatch) -> Result<()>;

    /// Remove the batch record together with every image blob it owns.
    async fn delete_batch(&self, batch_id: &str) -> Result<()>;

    /// Persist raw image bytes, returning the storage key for retrieval.
    async fn store_image_bytes(
        &self,
        batch_id: &str,
        file_id: &str,
        bytes: &[u8],
    ) -> Result<String>;

    /// Resolve a storage key back to the raw bytes.
    async fn fetch_image_bytes(&self, storage_key: &str) -> Result<Vec<u8>>;
}

/// SQLite-backed batch store: batch rows plus a blob table for the raw
/// screenshots, mirroring the original table-plus-object-storage split.
pub struct SqliteBatchStore {
    pool: Pool<Sqlite>,
}

impl SqliteBatchStore {
    /// Create a new batch store and initialize the database.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create data directory if needed
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create database directory")?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Batch store initialized");
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS capture_batches (
                id TEXT PRIMARY KEY,
                session_key TEXT NOT NULL,
                match_info TEXT NOT NULL,
                state TEXT NOT NULL,
                consolidated_odds TEXT,
                created_at TEXT NOT NULL,
                processed_at TEXT,
                sent_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create capture_batches table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS batch_images (
                batch_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                file_id TEXT NOT NULL,
                storage_key TEXT NOT NULL UNIQUE,
                uploaded_at TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create batch_images table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS image_blobs (
                storage_key TEXT PRIMARY KEY,
                data BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create image_blobs table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_batches_session
            ON capture_batches (session_key, state)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BatchStore for SqliteBatchStore {
    async fn load_open_batch(&self, session_key: &str) -> Result<Option<CaptureBatch>> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT * FROM capture_batches
            WHERE session_key = ? AND state != 'sent'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(session_key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load open batch")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT file_id, storage_key, uploaded_at, processed
            FROM batch_images
            WHERE batch_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load batch images")?;

        Ok(Some(row.into_batch(images)?))
    }

    async fn save_batch(&self, batch: &CaptureBatch) -> Result<()> {
        let match_info =
            serde_json::to_string(&batch.match_info).context("Failed to encode match info")?;
        let consolidated_odds = batch
            .consolidated_odds
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode consolidated odds")?;

        sqlx::query(
            r#"
            INSERT INTO capture_batches (
                id, session_key, match_info, state,
                consolidated_odds, created_at, processed_at, sent_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                match_info = excluded.match_info,
                state = excluded.state,
                consolidated_odds = excluded.consolidated_odds,
                processed_at = excluded.processed_at,
                sent_at = excluded.sent_at
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.session_key)
        .bind(&match_info)
        .bind(batch.state.as_str())
        .bind(&consolidated_odds)
        .bind(batch.created_at.to_rfc3339())
        .bind(batch.processed_at.map(|t| t.to_rfc3339()))
        .bind(batch.sent_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save batch")?;

        for (position, image) in batch.images.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO batch_images (
                    batch_id, position, file_id, storage_key, uploaded_at, processed
                ) VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(storage_key) DO UPDATE SET
                    position = excluded.position,
                    processed = excluded.processed
                "#,
            )
            .bind(&batch.id)
            .bind(position as i64)
            .bind(&image.file_id)
            .bind(&image.storage_key)
            .bind(image.uploaded_at.to_rfc3339())
            .bind(image.processed)
            .execute(&self.pool)
            .await
            .context("Failed to save batch image")?;
        }

        Ok(())
    }

    async fn delete_batch(&self, batch_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM image_blobs
            WHERE storage_key IN (
                SELECT storage_key FROM batch_images WHERE batch_id = ?
            )
            "#,
        )
        .bind(batch_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete image blobs")?;

        sqlx::query("DELETE FROM batch_images WHERE batch_id = ?")
            .bind(batch_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete batch images")?;

        sqlx::query("DELETE FROM capture_batches WHERE id = ?")
            .bind(batch_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete batch")?;

        Ok(())
    }

    async fn store_image_bytes(
        &self,
        batch_id: &str,
        file_id: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let storage_key = format!("{batch_id}/{file_id}_{}", Utc::now().timestamp_micros());

        sqlx::query("INSERT INTO image_blobs (storage_key, data) VALUES (?, ?)")
            .bind(&storage_key)
            .bind(bytes)
            .execute(&self.pool)
            .await
            .context("Failed to store image bytes")?;

        Ok(storage_key)
    }

    async fn fetch_image_bytes(&self, storage_key: &str) -> Result<Vec<u8>> {
        let row: (Vec<u8>,) =
            sqlx::query_as("SELECT data FROM image_blobs WHERE storage_key = ?")
                .bind(storage_key)
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("No image blob for key {storage_key}"))?;

        Ok(row.0)
    }
}

/// Database row representation
#[derive(sqlx::FromRow)]
struct BatchRow {
    id: String,
    session_key: String,
    match_info: String,
    state: String,
    consolidated_odds: Option<String>,
    created_at: String,
    processed_at: Option<String>,
    sent_at: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    file_id: String,
    storage_key: String,
    uploaded_at: String,
    processed: bool,
}

impl BatchRow {
    fn into_batch(self, images: Vec<ImageRow>) -> Result<CaptureBatch> {
        let match_info =
            serde_json::from_str(&self.match_info).context("Failed to decode match info")?;
        let consolidated_odds = self
            .consolidated_odds
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Failed to decode consolidated odds")?;

        Ok(CaptureBatch {
            id: self.id,
            session_key: self.session_key,
            match_info,
            images: images.into_iter().map(ImageRow::into_ref).collect(),
            consolidated_odds,
            state: parse_batch_state(&self.state),
            created_at: parse_timestamp(&self.created_at),
            processed_at: self.processed_at.as_deref().map(parse_timestamp),
            sent_at: self.sent_at.as_deref().map(parse_timestamp),
        })
    }
}

impl ImageRow {
    fn into_ref(self) -> ImageRef {
        ImageRef {
            file_id: self.file_id,
            storage_key: self.storage_key,
            uploaded_at: parse_timestamp(&self.uploaded_at),
            processed: self.processed,
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchState, MatchInfo, OddsRecord};

    async fn store() -> (SqliteBatchStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/batches.db", dir.path().display());
        (SqliteBatchStore::new(&url).await.unwrap(), dir)
    }

    fn batch(session_key: &str) -> CaptureBatch {
        CaptureBatch::new(session_key, MatchInfo::new("Real Madrid", "Barcelona"))
    }

    #[tokio::test]
    async fn test_round_trip_full_batch() {
        let (store, _dir) = store().await;

        let mut batch = batch("chat-1");
        let key = store
            .store_image_bytes(&batch.id, "file-1", b"fake image bytes")
            .await
            .unwrap();
        batch.add_image(ImageRef::new("file-1", key)).unwrap();
        batch.attach_odds(OddsRecord::default()).unwrap();
        store.save_batch(&batch).await.unwrap();

        let loaded = store.load_open_batch("chat-1").await.unwrap().unwrap();
        assert_eq!(loaded.id, batch.id);
        assert_eq!(loaded.state, BatchState::Processed);
        assert_eq!(loaded.match_info, batch.match_info);
        assert_eq!(loaded.images.len(), 1);
        assert!(loaded.images[0].processed);
        assert!(loaded.consolidated_odds.is_some());
    }

    #[tokio::test]
    async fn test_load_excludes_sent_batches() {
        let (store, _dir) = store().await;

        let mut sent = batch("chat-1");
        sent.add_image(ImageRef::new("f", "k-sent")).unwrap();
        sent.attach_odds(OddsRecord::default()).unwrap();
        sent.mark_sent().unwrap();
        store.save_batch(&sent).await.unwrap();

        assert!(store.load_open_batch("chat-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_is_session_scoped() {
        let (store, _dir) = store().await;
        store.save_batch(&batch("chat-1")).await.unwrap();

        assert!(store.load_open_batch("chat-2").await.unwrap().is_none());
        assert!(store.load_open_batch("chat-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_is_idempotent_per_image() {
        let (store, _dir) = store().await;

        let mut b = batch("chat-1");
        b.add_image(ImageRef::new("f", "k-1")).unwrap();
        store.save_batch(&b).await.unwrap();
        store.save_batch(&b).await.unwrap();

        let loaded = store.load_open_batch("chat-1").await.unwrap().unwrap();
        assert_eq!(loaded.images.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_blobs() {
        let (store, _dir) = store().await;

        let mut b = batch("chat-1");
        let key = store
            .store_image_bytes(&b.id, "file-1", b"bytes")
            .await
            .unwrap();
        b.add_image(ImageRef::new("file-1", key.clone())).unwrap();
        store.save_batch(&b).await.unwrap();

        store.delete_batch(&b.id).await.unwrap();

        assert!(store.load_open_batch("chat-1").await.unwrap().is_none());
        assert!(store.fetch_image_bytes(&key).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_image_bytes_round_trip() {
        let (store, _dir) = store().await;
        let key = store
            .store_image_bytes("batch-x", "file-1", b"raw screenshot")
            .await
            .unwrap();

        let bytes = store.fetch_image_bytes(&key).await.unwrap();
        assert_eq!(bytes, b"raw screenshot");
    }
}
