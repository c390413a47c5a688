use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CaptureError;

use super::{MatchInfo, OddsRecord};

/// Maximum number of images one capture batch accepts.
pub const BATCH_CAPACITY: usize = 10;

/// Lifecycle state of a capture batch.
///
/// Open -> Processed -> Sent, with no transition out of Sent. Discarding a
/// batch is deletion, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Open,
    Processed,
    Sent,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Open => "open",
            BatchState::Processed => "processed",
            BatchState::Sent => "sent",
        }
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_batch_state(s: &str) -> BatchState {
    match s {
        "processed" => BatchState::Processed,
        "sent" => BatchState::Sent,
        _ => BatchState::Open,
    }
}

/// Reference to one uploaded screenshot, owned by its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Opaque handle assigned by the transport collaborator.
    pub file_id: String,

    /// Locator for retrieving the raw bytes from storage.
    pub storage_key: String,

    pub uploaded_at: DateTime<Utc>,

    /// True once this image has contributed to a consolidation pass.
    pub processed: bool,
}

impl ImageRef {
    pub fn new(file_id: impl Into<String>, storage_key: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            storage_key: storage_key.into(),
            uploaded_at: Utc::now(),
            processed: false,
        }
    }
}

/// One capture session for a single match, bounded to ten images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureBatch {
    pub id: String,
    pub session_key: String,
    pub match_info: MatchInfo,

    /// Insertion order is arrival order; consolidation depends on it.
    pub images: Vec<ImageRef>,

    /// Present only after processing.
    pub consolidated_odds: Option<OddsRecord>,

    pub state: BatchState,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl CaptureBatch {
    pub fn new(session_key: impl Into<String>, match_info: MatchInfo) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_key: session_key.into(),
            match_info,
            images: Vec::new(),
            consolidated_odds: None,
            state: BatchState::Open,
            created_at: Utc::now(),
            processed_at: None,
            sent_at: None,
        }
    }

    /// Whether another image may be appended right now.
    pub fn ensure_can_add_image(&self) -> Result<(), CaptureError> {
        if self.state != BatchState::Open {
            return Err(CaptureError::for_state(self.state));
        }
        if self.images.len() >= BATCH_CAPACITY {
            return Err(CaptureError::CapacityExceeded {
                capacity: BATCH_CAPACITY,
            });
        }
        Ok(())
    }

    /// Append an image reference. Valid only while open and under capacity.
    pub fn add_image(&mut self, image: ImageRef) -> Result<(), CaptureError> {
        self.ensure_can_add_image()?;
        self.images.push(image);
        Ok(())
    }

    /// Attach a consolidated record and move to processed.
    ///
    /// Re-processing an already processed batch is permitted and replaces
    /// the record; a sent batch is immutable.
    pub fn attach_odds(&mut self, odds: OddsRecord) -> Result<(), CaptureError> {
        if self.state == BatchState::Sent {
            return Err(CaptureError::BatchSent);
        }
        if self.images.is_empty() {
            return Err(CaptureError::NoImages);
        }
        for image in &mut self.images {
            image.processed = true;
        }
        self.consolidated_odds = Some(odds);
        self.state = BatchState::Processed;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the batch delivered. Valid only from processed.
    pub fn mark_sent(&mut self) -> Result<(), CaptureError> {
        if self.state != BatchState::Processed {
            return Err(CaptureError::for_state(self.state));
        }
        self.state = BatchState::Sent;
        self.sent_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> CaptureBatch {
        CaptureBatch::new("chat-1", MatchInfo::new("Real Madrid", "Barcelona"))
    }

    #[test]
    fn test_new_batch_is_open_and_empty() {
        let batch = batch();
        assert_eq!(batch.state, BatchState::Open);
        assert!(batch.images.is_empty());
        assert!(batch.consolidated_odds.is_none());
    }

    #[test]
    fn test_capacity_enforced_at_ten() {
        let mut batch = batch();
        for i in 0..BATCH_CAPACITY {
            batch
                .add_image(ImageRef::new(format!("file-{i}"), format!("key-{i}")))
                .unwrap();
        }

        let err = batch
            .add_image(ImageRef::new("file-10", "key-10"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::CapacityExceeded { capacity: 10 }));
        // The failed add must not change the batch.
        assert_eq!(batch.images.len(), BATCH_CAPACITY);
    }

    #[test]
    fn test_attach_odds_requires_images() {
        let mut batch = batch();
        let err = batch.attach_odds(OddsRecord::default()).unwrap_err();
        assert!(matches!(err, CaptureError::NoImages));
        assert_eq!(batch.state, BatchState::Open);
    }

    #[test]
    fn test_attach_odds_marks_images_processed() {
        let mut batch = batch();
        batch.add_image(ImageRef::new("f", "k")).unwrap();
        batch.attach_odds(OddsRecord::default()).unwrap();

        assert_eq!(batch.state, BatchState::Processed);
        assert!(batch.processed_at.is_some());
        assert!(batch.images.iter().all(|i| i.processed));
    }

    #[test]
    fn test_reprocess_is_allowed_while_processed() {
        let mut batch = batch();
        batch.add_image(ImageRef::new("f", "k")).unwrap();
        batch.attach_odds(OddsRecord::default()).unwrap();
        assert!(batch.attach_odds(OddsRecord::default()).is_ok());
        assert_eq!(batch.state, BatchState::Processed);
    }

    #[test]
    fn test_mark_sent_requires_processed() {
        let mut batch = batch();
        let err = batch.mark_sent().unwrap_err();
        assert!(matches!(err, CaptureError::NotProcessed));
        assert_eq!(batch.state, BatchState::Open);
    }

    #[test]
    fn test_sent_batch_is_immutable() {
        let mut batch = batch();
        batch.add_image(ImageRef::new("f", "k")).unwrap();
        batch.attach_odds(OddsRecord::default()).unwrap();
        batch.mark_sent().unwrap();

        assert!(matches!(
            batch.add_image(ImageRef::new("f2", "k2")).unwrap_err(),
            CaptureError::BatchSent
        ));
        assert!(matches!(
            batch.attach_odds(OddsRecord::default()).unwrap_err(),
            CaptureError::BatchSent
        ));
        assert!(matches!(batch.mark_sent().unwrap_err(), CaptureError::BatchSent));
    }

    #[test]
    fn test_add_image_after_processing_rejected() {
        let mut batch = batch();
        batch.add_image(ImageRef::new("f", "k")).unwrap();
        batch.attach_odds(OddsRecord::default()).unwrap();

        assert!(matches!(
            batch.add_image(ImageRef::new("f2", "k2")).unwrap_err(),
            CaptureError::AlreadyProcessed
        ));
    }

    #[test]
    fn test_state_round_trip() {
        for state in [BatchState::Open, BatchState::Processed, BatchState::Sent] {
            assert_eq!(parse_batch_state(state.as_str()), state);
        }
        assert_eq!(parse_batch_state("bogus"), BatchState::Open);
    }
}
