use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::DeliverySink;
use crate::db::BatchStore;
use crate::error::CaptureError;
use crate::extract::{consolidate, OddsParser};
use crate::format;
use crate::matching::parse_match_spec;
use crate::models::{BatchState, CaptureBatch, DeliveryPayload, ImageRef};
use crate::recognition::RecognitionAdapter;

/// Orchestrates one capture session per session key: batch lifecycle,
/// per-image recognition and extraction, consolidation, and handoff to the
/// delivery collaborator.
///
/// All durable state lives behind the injected [`BatchStore`]; the
/// pipeline itself holds nothing mutable, so pipelines for different
/// sessions run independently. Callers must serialize operations within
/// one session.
pub struct CapturePipeline {
    store: Arc<dyn BatchStore>,
    delivery: Arc<dyn DeliverySink>,
    recognition: RecognitionAdapter,
    parser: OddsParser,
}

impl CapturePipeline {
    pub fn new(
        store: Arc<dyn BatchStore>,
        delivery: Arc<dyn DeliverySink>,
        recognition: RecognitionAdapter,
        parser: OddsParser,
    ) -> Self {
        Self {
            store,
            delivery,
            recognition,
            parser,
        }
    }

    /// Start a new capture batch for the session, discarding any unsent
    /// batch the session still holds.
    pub async fn start_match(
        &self,
        session_key: &str,
        spec: &str,
    ) -> Result<CaptureBatch, CaptureError> {
        let match_info = parse_match_spec(spec)?;

        if let Some(existing) = self.load(session_key).await? {
            info!(
                "Discarding unsent batch {} for session {}",
                existing.id, session_key
            );
            self.store
                .delete_batch(&existing.id)
                .await
                .map_err(CaptureError::Storage)?;
        }

        let batch = CaptureBatch::new(session_key, match_info);
        self.store
            .save_batch(&batch)
            .await
            .map_err(CaptureError::Storage)?;

        info!(
            "Started capture batch {} for {}",
            batch.id,
            batch.match_info.fixture()
        );
        Ok(batch)
    }

    /// Attach one screenshot to the session's open batch.
    pub async fn add_image(
        &self,
        session_key: &str,
        file_id: &str,
        bytes: &[u8],
    ) -> Result<CaptureBatch, CaptureError> {
        let mut batch = self.require_batch(session_key).await?;
        batch.ensure_can_add_image()?;

        let storage_key = self
            .store
            .store_image_bytes(&batch.id, file_id, bytes)
            .await
            .map_err(CaptureError::Storage)?;

        batch.add_image(ImageRef::new(file_id, storage_key))?;
        self.store
            .save_batch(&batch)
            .await
            .map_err(CaptureError::Storage)?;

        debug!("Batch {}: {} image(s) captured", batch.id, batch.images.len());
        Ok(batch)
    }

    /// Run recognition and extraction over every image in arrival order,
    /// consolidate, and persist the result in a single commit. Permitted
    /// on an already processed batch; the record is recomputed from
    /// scratch.
    pub async fn process(&self, session_key: &str) -> Result<CaptureBatch, CaptureError> {
        let mut batch = self.require_batch(session_key).await?;
        if batch.images.is_empty() {
            return Err(CaptureError::NoImages);
        }

        let mut fragments = Vec::with_capacity(batch.images.len());
        for image in &batch.images {
            let bytes = self
                .store
                .fetch_image_bytes(&image.storage_key)
                .await
                .map_err(CaptureError::Storage)?;

            let recognized = self.recognition.recognize(&bytes);
            let record = self.parser.parse_fragments(&recognized);
            debug!(
                "Image {}: {} market(s) extracted",
                image.file_id,
                record.market_count()
            );
            fragments.push(record);
        }

        let consolidated = consolidate(&fragments);
        info!(
            "Batch {}: consolidated {} market(s) from {} image(s)",
            batch.id,
            consolidated.market_count(),
            batch.images.len()
        );

        batch.attach_odds(consolidated)?;
        // Nothing was persisted until here; cancelling the pass above
        // leaves the stored batch in its previous state.
        self.store
            .save_batch(&batch)
            .await
            .map_err(CaptureError::Storage)?;
        Ok(batch)
    }

    /// Hand the consolidated payload to the delivery collaborator. On
    /// refusal or delivery error the batch stays processed and the send
    /// can be retried without re-running extraction.
    pub async fn send(&self, session_key: &str) -> Result<CaptureBatch, CaptureError> {
        let mut batch = self.require_batch(session_key).await?;
        let odds = match &batch.consolidated_odds {
            Some(odds) if batch.state == BatchState::Processed => odds.clone(),
            _ => return Err(CaptureError::NotProcessed),
        };

        let payload = DeliveryPayload {
            match_info: batch.match_info.clone(),
            summary: format::short_summary(&batch.match_info, &odds),
            consolidated_odds: odds,
            timestamp: Utc::now(),
        };

        let delivered = match self.delivery.deliver(&payload).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Delivery error: {e}");
                false
            }
        };
        if !delivered {
            return Err(CaptureError::DeliveryFailed);
        }

        batch.mark_sent()?;
        self.store
            .save_batch(&batch)
            .await
            .map_err(CaptureError::Storage)?;

        info!("Batch {} sent downstream", batch.id);
        Ok(batch)
    }

    /// Delete the session's unsent batch and its images, if one exists.
    pub async fn clear(&self, session_key: &str) -> Result<Option<CaptureBatch>, CaptureError> {
        let Some(batch) = self.load(session_key).await? else {
            return Ok(None);
        };

        self.store
            .delete_batch(&batch.id)
            .await
            .map_err(CaptureError::Storage)?;

        info!("Cleared batch {} for session {}", batch.id, session_key);
        Ok(Some(batch))
    }

    /// Current unsent batch for status and verification views.
    pub async fn current_batch(
        &self,
        session_key: &str,
    ) -> Result<Option<CaptureBatch>, CaptureError> {
        self.load(session_key).await
    }

    async fn load(&self, session_key: &str) -> Result<Option<CaptureBatch>, CaptureError> {
        self.store
            .load_open_batch(session_key)
            .await
            .map_err(CaptureError::Storage)
    }

    async fn require_batch(&self, session_key: &str) -> Result<CaptureBatch, CaptureError> {
        self.load(session_key).await?.ok_or(CaptureError::NoActiveBatch)
    }
}
