use thiserror::Error;

use crate::models::BatchState;

/// Failures surfaced by capture-batch operations.
///
/// Parser-level mismatches never appear here: a market that cannot be
/// extracted is simply absent from the result. Only batch-rule violations
/// and collaborator failures are reported to the caller.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No open or processed batch exists for the session.
    #[error("no active capture batch for this session; start a new match first")]
    NoActiveBatch,

    /// The session-start input could not be understood.
    #[error("invalid match specification: {0}")]
    InvalidMatchSpec(String),

    /// The batch already holds its maximum number of images.
    #[error("capture batch is full ({capacity} images)")]
    CapacityExceeded { capacity: usize },

    /// Processing was requested on a batch with no images.
    #[error("capture batch has no images to process")]
    NoImages,

    /// Send was requested before the batch was processed.
    #[error("capture batch has not been processed yet")]
    NotProcessed,

    /// An image was added after processing; only open batches accept images.
    #[error("capture batch was already processed; start a new match to add more captures")]
    AlreadyProcessed,

    /// Any mutation of a sent batch.
    #[error("capture batch was already sent and is immutable")]
    BatchSent,

    /// The downstream consumer refused or failed to accept the payload.
    /// The batch stays processed, so the send can be retried.
    #[error("delivery to downstream consumer failed")]
    DeliveryFailed,

    /// A persistence collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl CaptureError {
    /// Map an unexpected batch state to the matching typed failure.
    pub fn for_state(state: BatchState) -> Self {
        match state {
            BatchState::Open => CaptureError::NotProcessed,
            BatchState::Processed => CaptureError::AlreadyProcessed,
            BatchState::Sent => CaptureError::BatchSent,
        }
    }
}
