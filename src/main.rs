use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use odds_capture::api::HttpDeliverySink;
use odds_capture::config::Config;
use odds_capture::db::SqliteBatchStore;
use odds_capture::error::CaptureError;
use odds_capture::extract::OddsParser;
use odds_capture::format;
use odds_capture::models::BATCH_CAPACITY;
use odds_capture::pipeline::CapturePipeline;
use odds_capture::recognition::RecognitionAdapter;

const HELP_TEXT: &str = "\
AVAILABLE COMMANDS:

/new_match Home Team vs Away Team  - start a new capture batch
/add <image file>                  - attach a screenshot
/process                           - run recognition over the captures
/verify                            - show extracted odds
/send                              - deliver to the downstream consumer
/clear                             - discard the current batch
/status                            - show batch state
/quit                              - exit";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "odds_capture=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting odds-capture");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Initialize persistence
    let store = Arc::new(SqliteBatchStore::new(&config.database_url).await?);

    // Recognition backend is probed once at startup
    let recognition = RecognitionAdapter::detect(config.tesseract_path.as_deref());
    let parser = OddsParser::new()?;

    let delivery = Arc::new(HttpDeliverySink::new(
        config.delivery_webhook_url.clone(),
        config.delivery_auth_token.clone(),
    ));

    let pipeline = CapturePipeline::new(store, delivery, recognition, parser);
    info!("Pipeline ready (session: {})", config.session_key);

    run_console(&pipeline, &config.session_key).await
}

/// Minimal local transport: reads commands from stdin, one per line, and
/// prints the pipeline's replies. Each command maps 1:1 to a capture-batch
/// operation.
async fn run_console(pipeline: &CapturePipeline, session_key: &str) -> Result<()> {
    println!("{HELP_TEXT}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        let reply = dispatch(pipeline, session_key, input).await;
        println!("{reply}\n");
    }

    info!("Shutting down odds-capture");
    Ok(())
}

async fn dispatch(pipeline: &CapturePipeline, session_key: &str, input: &str) -> String {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    let result = match command {
        "/new_match" => start_match(pipeline, session_key, rest).await,
        "/add" => add_image(pipeline, session_key, rest).await,
        "/process" => process(pipeline, session_key).await,
        "/verify" => verify(pipeline, session_key).await,
        "/send" => send(pipeline, session_key).await,
        "/clear" => clear(pipeline, session_key).await,
        "/status" => status(pipeline, session_key).await,
        _ => return HELP_TEXT.to_string(),
    };

    result.unwrap_or_else(|e| format!("Error: {e}"))
}

async fn start_match(
    pipeline: &CapturePipeline,
    session_key: &str,
    spec: &str,
) -> Result<String, CaptureError> {
    let batch = pipeline.start_match(session_key, spec).await?;
    Ok(format!(
        "NEW MATCH STARTED\n\n{}\n\nUpload up to {} captures, then /process.",
        format::batch_status(&batch),
        BATCH_CAPACITY
    ))
}

async fn add_image(
    pipeline: &CapturePipeline,
    session_key: &str,
    path: &str,
) -> Result<String, CaptureError> {
    if path.is_empty() {
        return Ok("Usage: /add <image file>".to_string());
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => return Ok(format!("Could not read {path}: {e}")),
    };

    let file_id = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path);

    let batch = pipeline.add_image(session_key, file_id, &bytes).await?;
    Ok(format::batch_status(&batch))
}

async fn process(pipeline: &CapturePipeline, session_key: &str) -> Result<String, CaptureError> {
    let batch = pipeline.process(session_key).await?;
    let summary = match &batch.consolidated_odds {
        Some(odds) => format::short_summary(&batch.match_info, odds),
        None => batch.match_info.fixture(),
    };
    Ok(format!("PROCESSING COMPLETE\n\n{summary}"))
}

async fn verify(pipeline: &CapturePipeline, session_key: &str) -> Result<String, CaptureError> {
    let batch = pipeline
        .current_batch(session_key)
        .await?
        .ok_or(CaptureError::NoActiveBatch)?;

    match &batch.consolidated_odds {
        Some(odds) => Ok(format::detailed_summary(&batch.match_info, odds)),
        None => Err(CaptureError::NotProcessed),
    }
}

async fn send(pipeline: &CapturePipeline, session_key: &str) -> Result<String, CaptureError> {
    let batch = pipeline.send(session_key).await?;
    Ok(format!("Batch delivered for {}", batch.match_info.fixture()))
}

async fn clear(pipeline: &CapturePipeline, session_key: &str) -> Result<String, CaptureError> {
    match pipeline.clear(session_key).await? {
        Some(batch) => Ok(format!("Cleared batch for {}", batch.match_info.fixture())),
        None => Ok("Nothing to clear".to_string()),
    }
}

async fn status(pipeline: &CapturePipeline, session_key: &str) -> Result<String, CaptureError> {
    match pipeline.current_batch(session_key).await? {
        Some(batch) => Ok(format::batch_status(&batch)),
        None => Ok("No active batch. Start one with /new_match.".to_string()),
    }
}
