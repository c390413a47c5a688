use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use tempfile::NamedTempFile;
use tracing::debug;

use super::adapter::{RecognitionBackend, RecognitionError, TextFragment};

/// Minimum per-word confidence (Tesseract's 0-100 scale) kept in output.
const MIN_WORD_CONFIDENCE: f32 = 30.0;

/// Recognition backend shelling out to a local Tesseract executable with
/// TSV output for per-word confidence scores.
pub struct TesseractBackend {
    executable: PathBuf,
}

impl TesseractBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Locate a usable executable: an explicitly configured path first,
    /// then `tesseract` on PATH. Returns `None` when neither responds.
    pub fn locate(explicit: Option<&str>) -> Option<Self> {
        let candidate = explicit
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        let responds = Command::new(&candidate)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);

        responds.then(|| Self::new(candidate))
    }
}

impl RecognitionBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError> {
        let input = NamedTempFile::with_suffix(".png")?;
        image.save(input.path())?;

        // Tesseract appends .tsv to the output base path.
        let output_base = NamedTempFile::new()?;
        let base = output_base.path().to_string_lossy().to_string();

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg(&base)
            .arg("--psm")
            .arg("6") // single uniform block, the shape of an odds board
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Backend(stderr.trim().to_string()));
        }

        let tsv_path = format!("{base}.tsv");
        let tsv = std::fs::read_to_string(&tsv_path)?;
        let _ = std::fs::remove_file(&tsv_path);

        let fragments = parse_tsv_words(&tsv);
        debug!("Tesseract produced {} word fragment(s)", fragments.len());
        Ok(fragments)
    }
}

/// Parses Tesseract TSV output into word fragments, rescaling confidence
/// to 0-1 and dropping low-confidence words.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Level 5 rows are words.
fn parse_tsv_words(tsv: &str) -> Vec<TextFragment> {
    let mut fragments = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let confidence: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if text.is_empty() || confidence < MIN_WORD_CONFIDENCE {
            continue;
        }

        fragments.push(TextFragment::new(text, confidence / 100.0));
    }

    fragments
}
