//! Effective settings view.

use axum::{extract::State, Json};
use serde::Serialize;
use sha2::{Digest, Sha256};

use prospect_core::defaults::{LEAD_WEBHOOK_SECRET_HEADER, SEARCH_UPDATE_SECRET_HEADER};
use prospect_core::MessageDefaults;
use prospect_sync::TriggerDispatch;

use crate::AppState;

/// A shared secret, never shown in clear.
#[derive(Debug, Serialize)]
pub struct SecretStatus {
    pub configured: bool,
    pub header: &'static str,
    /// First 8 hex chars of the SHA-256, to tell secrets apart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl SecretStatus {
    fn new(secret: Option<&str>, header: &'static str) -> Self {
        Self {
            configured: secret.is_some(),
            header,
            fingerprint: secret.map(|s| hex::encode(&Sha256::digest(s.as_bytes())[..4])),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub lead_webhook_url: String,
    pub search_update_url: String,
    pub trigger_url: Option<String>,
    pub trigger_timeout_secs: u64,
    pub trigger_dispatch: TriggerDispatch,
    pub lead_webhook_secret: SecretStatus,
    pub search_update_secret: SecretStatus,
    pub messages: MessageDefaults,
    pub max_body_bytes: usize,
}

/// `GET /api/v1/settings`
pub async fn settings(State(state): State<AppState>) -> Json<SettingsView> {
    let config = &state.config;
    Json(SettingsView {
        lead_webhook_url: config.lead_webhook_url(),
        search_update_url: config.search_update_url(),
        trigger_url: config.trigger.url.clone(),
        trigger_timeout_secs: config.trigger.timeout.as_secs(),
        trigger_dispatch: config.trigger.dispatch,
        lead_webhook_secret: SecretStatus::new(
            config.lead_webhook_secret.as_deref(),
            LEAD_WEBHOOK_SECRET_HEADER,
        ),
        search_update_secret: SecretStatus::new(
            config.search_update_secret.as_deref(),
            SEARCH_UPDATE_SECRET_HEADER,
        ),
        messages: config.messages.clone(),
        max_body_bytes: config.max_body_bytes,
    })
}
