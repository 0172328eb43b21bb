//! Outbound trigger client.
//!
//! A 2xx only means the automation tool accepted the job. Results arrive
//! later through the inbound webhooks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use prospect_core::defaults::TRIGGER_ERROR_BODY_CHARS;
use prospect_core::{Error, Result, TriggerPayload};

/// Something that can hand a search to the automation tool.
///
/// Failures are returned as `Error::Request` carrying a human-readable
/// cause; the caller stores it on the search.
#[async_trait]
pub trait SearchTrigger: Send + Sync {
    async fn fire(&self, payload: &TriggerPayload) -> Result<()>;
}

/// Trigger that POSTs JSON to the configured automation endpoint.
pub struct HttpSearchTrigger {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpSearchTrigger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn describe(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!(
                "Automation tool did not respond within {}s",
                self.timeout.as_secs()
            )
        } else if e.is_connect() {
            format!("Could not connect to automation tool: {}", e)
        } else {
            format!("Request to automation tool failed: {}", e)
        }
    }
}

#[async_trait]
impl SearchTrigger for HttpSearchTrigger {
    async fn fire(&self, payload: &TriggerPayload) -> Result<()> {
        let start = Instant::now();
        debug!(
            subsystem = "sync",
            component = "trigger",
            op = "post",
            search_id = payload.search_id,
            continuation = payload.next_page_token.is_some(),
            "Posting search trigger"
        );

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Request(self.describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.trim().chars().take(TRIGGER_ERROR_BODY_CHARS).collect();
            warn!(
                subsystem = "sync",
                component = "trigger",
                search_id = payload.search_id,
                http_status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Automation tool rejected trigger"
            );
            return Err(Error::Request(format!(
                "Automation tool returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        debug!(
            subsystem = "sync",
            component = "trigger",
            search_id = payload.search_id,
            http_status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Trigger acknowledged"
        );
        Ok(())
    }
}
