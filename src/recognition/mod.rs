pub mod adapter;
pub mod preprocess;
pub mod tesseract;

pub use adapter::{
    RecognitionAdapter, RecognitionBackend, RecognitionError, TextFragment, PLACEHOLDER_TEXT,
};
pub use tesseract::TesseractBackend;
