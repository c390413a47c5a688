use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use odds_capture::extract::{consolidate, OddsParser};
use odds_capture::recognition::RecognitionAdapter;

/// Offline extraction utility: runs recognition and odds extraction over
/// image files and prints the consolidated record as JSON, without
/// touching batch storage.
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "extract_odds=info,odds_capture=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("Usage: extract_odds <image file>...");
    }

    let tesseract_path = env::var("TESSERACT_PATH").ok();
    let recognition = RecognitionAdapter::detect(tesseract_path.as_deref());
    let parser = OddsParser::new()?;

    info!(
        "Extracting odds from {} image(s) with backend '{}'",
        paths.len(),
        recognition.backend_name()
    );

    let mut records = Vec::new();
    for path in &paths {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {path}"))?;
        let fragments = recognition.recognize(&bytes);
        let record = parser.parse_fragments(&fragments);
        info!("{path}: {} market(s) extracted", record.market_count());
        records.push(record);
    }

    let consolidated = consolidate(&records);
    println!("{}", serde_json::to_string_pretty(&consolidated)?);

    Ok(())
}
