use image::GrayImage;
use thiserror::Error;
use tracing::{info, warn};

use super::preprocess;
use super::tesseract::TesseractBackend;

/// One recognized text fragment with its confidence (0.0 to 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Text of the placeholder fragment emitted when recognition is
/// unavailable or failed. Contains no decimals, so extraction over it
/// yields an empty record.
pub const PLACEHOLDER_TEXT: &str = "recognition unavailable";

const PLACEHOLDER_CONFIDENCE: f32 = 0.1;

/// Recognition failures. These never cross the adapter boundary: every
/// failure degrades to the placeholder fragment so batch processing can
/// continue best-effort across the remaining images.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("no recognition backend available")]
    Unavailable,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("recognition backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A pluggable text-recognition engine operating on a normalized image.
pub trait RecognitionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError>;
}

/// Wraps the recognition backend chosen at construction time and applies
/// the normalization pass before every recognition call.
pub struct RecognitionAdapter {
    backend: Option<Box<dyn RecognitionBackend>>,
}

impl RecognitionAdapter {
    pub fn with_backend(backend: Box<dyn RecognitionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn without_backend() -> Self {
        Self { backend: None }
    }

    /// Pick the best available backend: an explicitly configured Tesseract
    /// executable, `tesseract` on PATH, or none.
    pub fn detect(tesseract_path: Option<&str>) -> Self {
        match TesseractBackend::locate(tesseract_path) {
            Some(backend) => {
                info!("Recognition backend: {}", backend.name());
                Self::with_backend(Box::new(backend))
            }
            None => {
                warn!("No recognition backend found; extraction will degrade to placeholders");
                Self::without_backend()
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_deref().map_or("none", |b| b.name())
    }

    /// Recognize text in one image. Never fails: backend absence, decode
    /// errors, and backend failures all degrade to the placeholder
    /// fragment.
    pub fn recognize(&self, image_bytes: &[u8]) -> Vec<TextFragment> {
        match self.try_recognize(image_bytes) {
            Ok(fragments) if !fragments.is_empty() => fragments,
            Ok(_) => {
                warn!("Recognition produced no text, using placeholder");
                placeholder()
            }
            Err(RecognitionError::Unavailable) => placeholder(),
            Err(e) => {
                warn!("Recognition failed ({e}), using placeholder");
                placeholder()
            }
        }
    }

    fn try_recognize(&self, image_bytes: &[u8]) -> Result<Vec<TextFragment>, RecognitionError> {
        let backend = self
            .backend
            .as_deref()
            .ok_or(RecognitionError::Unavailable)?;

        let normalized = preprocess::normalize_for_recognition(image_bytes)?;
        backend.recognize(&normalized)
    }
}

fn placeholder() -> Vec<TextFragment> {
    vec![TextFragment::new(PLACEHOLDER_TEXT, PLACEHOLDER_CONFIDENCE)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct StaticBackend(Vec<TextFragment>);

    impl RecognitionBackend for StaticBackend {
        fn name(&self) -> &'static str {
            "static"
        }

        fn recognize(&self, _image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl RecognitionBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn recognize(&self, _image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError> {
            Err(RecognitionError::Backend("boom".to_string()))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = GrayImage::from_pixel(4, 4, image::Luma([128u8]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_no_backend_yields_placeholder() {
        let adapter = RecognitionAdapter::without_backend();
        let fragments = adapter.recognize(&png_bytes());

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, PLACEHOLDER_TEXT);
        assert!((fragments[0].confidence - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_backend_failure_degrades_to_placeholder() {
        let adapter = RecognitionAdapter::with_backend(Box::new(FailingBackend));
        let fragments = adapter.recognize(&png_bytes());
        assert_eq!(fragments[0].text, PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_undecodable_bytes_degrade_to_placeholder() {
        let adapter = RecognitionAdapter::with_backend(Box::new(StaticBackend(vec![
            TextFragment::new("2.10", 0.9),
        ])));
        let fragments = adapter.recognize(b"not an image");
        assert_eq!(fragments[0].text, PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_backend_output_passes_through() {
        let expected = vec![
            TextFragment::new("2.10", 0.92),
            TextFragment::new("3.40", 0.88),
        ];
        let adapter = RecognitionAdapter::with_backend(Box::new(StaticBackend(expected.clone())));
        assert_eq!(adapter.recognize(&png_bytes()), expected);
    }

    #[test]
    fn test_empty_backend_output_becomes_placeholder() {
        let adapter = RecognitionAdapter::with_backend(Box::new(StaticBackend(Vec::new())));
        let fragments = adapter.recognize(&png_bytes());
        assert_eq!(fragments[0].text, PLACEHOLDER_TEXT);
    }
}
