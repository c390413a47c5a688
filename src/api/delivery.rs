use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::models::DeliveryPayload;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Downstream consumer of consolidated odds payloads.
///
/// `Ok(false)` means the consumer refused the payload (or none is
/// configured); the caller keeps the batch processed so the send can be
/// retried without re-running extraction.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<bool>;
}

/// Delivers payloads to a webhook over HTTP with optional bearer auth.
pub struct HttpDeliverySink {
    client: Client,
    webhook_url: Option<String>,
    auth_token: Option<String>,
}

impl HttpDeliverySink {
    pub fn new(webhook_url: Option<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            auth_token,
        }
    }
}

#[async_trait]
impl DeliverySink for HttpDeliverySink {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<bool> {
        let Some(url) = self.webhook_url.as_deref() else {
            warn!("Delivery webhook URL not configured");
            return Ok(false);
        };

        let mut request = self.client.post(url).timeout(DELIVERY_TIMEOUT).json(payload);
        if let Some(token) = self.auth_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach delivery webhook")?;

        if response.status().is_success() {
            info!(
                "Delivered consolidated odds for {}",
                payload.match_info.fixture()
            );
            Ok(true)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Delivery webhook refused payload: {} - {}", status, body);
            Ok(false)
        }
    }
}
