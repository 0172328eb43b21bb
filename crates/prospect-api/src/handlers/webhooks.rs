//! Inbound webhooks called by the automation tool.
//!
//! Bodies are taken as raw bytes so that malformed JSON is reported in the
//! same `{"status":"error"}` shape as every other rejection.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use prospect_core::defaults::{LEAD_WEBHOOK_SECRET_HEADER, SEARCH_UPDATE_SECRET_HEADER};
use prospect_core::{Error, LeadsPayload, Result as CoreResult, SearchStatusUpdate};
use prospect_sync::IntakeOutcome;

use crate::{ApiError, AppState};

/// Compare secrets through their digests so the comparison does not leak
/// the expected length or a matching prefix.
fn secret_matches(expected: &str, provided: &str) -> bool {
    Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes())
}

/// Check the configured secret, if any, against the header. A missing header
/// is `missing` (the lead webhook reports it as invalid input, the update
/// webhook as unauthorized); a wrong one is always unauthorized.
fn verify_secret(
    expected: Option<&str>,
    headers: &HeaderMap,
    name: &str,
    missing: fn(String) -> Error,
) -> CoreResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = header_value(headers, name).ok_or_else(|| missing(format!("missing {} header", name)))?;
    if !secret_matches(expected, provided) {
        return Err(Error::Unauthorized("invalid webhook secret".to_string()));
    }
    Ok(())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Log a (truncated) raw body; never the headers, which carry secrets.
fn log_body(endpoint: &'static str, body: &Bytes) {
    let preview: String = String::from_utf8_lossy(body).chars().take(2000).collect();
    debug!(
        subsystem = "api",
        component = "webhook",
        endpoint,
        bytes = body.len(),
        body = %preview,
        "Inbound webhook body"
    );
}

/// `POST /webhook`
///
/// Accepts a single lead object or a list of lead objects.
///
/// Returns:
/// - 200 when every lead was stored
/// - 207 when at least one list item failed (per-item errors in the body)
/// - 400 for a body that is not an object or list, an invalid single
///   object, or a missing secret header when a secret is configured
/// - 401 when the secret header does not match
pub async fn receive_leads(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    verify_secret(
        state.config.lead_webhook_secret.as_deref(),
        &headers,
        LEAD_WEBHOOK_SECRET_HEADER,
        Error::InvalidInput,
    )
    .inspect_err(|e| warn!(subsystem = "api", component = "webhook", error = %e, "Lead webhook secret rejected"))?;

    log_body("webhook", &body);
    let payload = LeadsPayload::from_slice(&body)?;

    match state.intake.ingest(payload).await? {
        IntakeOutcome::Single(lead) => {
            info!(
                subsystem = "api",
                component = "webhook",
                lead_id = lead.id,
                search_id = lead.search_id,
                "Lead received"
            );
            Ok((
                StatusCode::OK,
                Json(json!({ "status": "success", "lead_id": lead.id })),
            ))
        }
        IntakeOutcome::Batch(report) => {
            let (code, status) = match (report.created(), report.failed()) {
                (_, 0) => (StatusCode::OK, "success"),
                (0, _) => (StatusCode::MULTI_STATUS, "error"),
                _ => (StatusCode::MULTI_STATUS, "partial"),
            };
            Ok((
                code,
                Json(json!({
                    "status": status,
                    "total": report.total,
                    "leads_created": report.created(),
                    "leads_errors": report.failed(),
                    "lead_ids": report.lead_ids,
                    "orphaned": report.orphaned,
                    "errors": report.errors,
                })),
            ))
        }
    }
}

/// `POST /update_search`
///
/// Body `{search_id, status, next_page_token?, error_message?}` with status
/// one of `pending_next`, `completed`, `error`.
///
/// Returns:
/// - 200 when applied, or when identical to the current state (`changed: false`)
/// - 400 for a malformed body, unknown status, or `pending_next` without token
/// - 401 when a secret is configured and the header is missing or wrong
/// - 404 when the search does not exist
/// - 409 when the search is already completed
pub async fn update_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    verify_secret(
        state.config.search_update_secret.as_deref(),
        &headers,
        SEARCH_UPDATE_SECRET_HEADER,
        Error::Unauthorized,
    )
    .inspect_err(|e| warn!(subsystem = "api", component = "webhook", error = %e, "Search update secret rejected"))?;

    log_body("update_search", &body);
    let update = SearchStatusUpdate::from_slice(&body)?;
    let applied = state.searches.apply_remote_update(&update).await?;

    Ok(Json(json!({
        "status": "success",
        "search_id": applied.search.id,
        "search_status": applied.search.status,
        "changed": applied.changed,
    })))
}
