use std::env;

use anyhow::Result;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path
    pub database_url: String,

    /// Webhook receiving consolidated odds payloads (optional)
    pub delivery_webhook_url: Option<String>,

    /// Bearer token for the delivery webhook (optional)
    pub delivery_auth_token: Option<String>,

    /// Explicit Tesseract executable path (optional; PATH is probed
    /// otherwise)
    pub tesseract_path: Option<String>,

    /// Session key used by the console transport
    pub session_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/capture.db".to_string()),

            delivery_webhook_url: env::var("DELIVERY_WEBHOOK_URL").ok(),

            delivery_auth_token: env::var("DELIVERY_AUTH_TOKEN").ok(),

            tesseract_path: env::var("TESSERACT_PATH").ok(),

            session_key: env::var("SESSION_KEY").unwrap_or_else(|_| "console".to_string()),
        })
    }
}
