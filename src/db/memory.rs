use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{BatchState, CaptureBatch};

use super::batches::BatchStore;

/// In-memory batch store for tests and offline runs. Same contract as the
/// SQLite store, no durability.
#[derive(Default)]
pub struct MemoryBatchStore {
    batches: Mutex<HashMap<String, CaptureBatch>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    key_counter: AtomicU64,
}

impl MemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn load_open_batch(&self, session_key: &str) -> Result<Option<CaptureBatch>> {
        let batches = self.batches.lock().await;
        Ok(batches
            .values()
            .filter(|b| b.session_key == session_key && b.state != BatchState::Sent)
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn save_batch(&self, batch: &CaptureBatch) -> Result<()> {
        self.batches
            .lock()
            .await
            .insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    async fn delete_batch(&self, batch_id: &str) -> Result<()> {
        let removed = self.batches.lock().await.remove(batch_id);
        if let Some(batch) = removed {
            let mut blobs = self.blobs.lock().await;
            for image in &batch.images {
                blobs.remove(&image.storage_key);
            }
        }
        Ok(())
    }

    async fn store_image_bytes(
        &self,
        batch_id: &str,
        file_id: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let n = self.key_counter.fetch_add(1, Ordering::Relaxed);
        let storage_key = format!("{batch_id}/{file_id}_{n}");
        self.blobs
            .lock()
            .await
            .insert(storage_key.clone(), bytes.to_vec());
        Ok(storage_key)
    }

    async fn fetch_image_bytes(&self, storage_key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(storage_key)
            .cloned()
            .ok_or_else(|| anyhow!("no image blob for key {storage_key}"))
    }
}
