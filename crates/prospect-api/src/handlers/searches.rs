//! Search job handlers: start, list, inspect, delete, next page.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use prospect_core::{AuditEntry, CreateSearchRequest, Lead, ListLeadsRequest, SearchSummary};
use prospect_sync::{SearchStart, TriggerOutcome};

use super::PageQuery;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct NextPageRequest {
    #[serde(default)]
    pub requested_by: Option<String>,
}

fn start_response(start: SearchStart, acknowledged: StatusCode) -> (StatusCode, Json<Value>) {
    let status = match start.outcome {
        TriggerOutcome::Acknowledged => acknowledged,
        TriggerOutcome::Dispatched => StatusCode::ACCEPTED,
    };
    (status, Json(json!(start.search)))
}

async fn load_summary(state: &AppState, id: i64) -> Result<SearchSummary, ApiError> {
    let search = state
        .repos
        .searches
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("search {} not found", id)))?;
    let lead_count = state.repos.leads.count_for_search(id).await?;
    Ok(SearchSummary { search, lead_count })
}

/// `POST /api/v1/searches`
///
/// Returns 201 once the automation tool acknowledged (inline dispatch), 202
/// when the trigger runs in the background, 400 for a blank query, 502 when
/// the tool refused (the search is stored in `error`), 503 when no trigger
/// URL is configured.
pub async fn start_search(
    State(state): State<AppState>,
    body: Result<Json<CreateSearchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let start = state
        .searches
        .start_search(&body.query, body.requested_by.as_deref())
        .await?;
    Ok(start_response(start, StatusCode::CREATED))
}

/// `POST /api/v1/searches/:id/next-page`
///
/// Legal only from `pending_next`; 409 otherwise.
pub async fn next_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<NextPageRequest>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let requested_by = body.and_then(|Json(b)| b.requested_by);
    let start = state
        .searches
        .search_next_page(id, requested_by.as_deref())
        .await?;
    Ok(start_response(start, StatusCode::OK))
}

/// `GET /api/v1/searches`
pub async fn list_searches(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let (limit, offset) = page.bounds();
    let searches = state.repos.searches.list(limit, offset).await?;
    let total = state.repos.searches.count().await?;
    Ok(Json(json!({ "searches": searches, "total": total })))
}

/// `GET /api/v1/searches/:id`
pub async fn get_search(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SearchSummary>, ApiError> {
    Ok(Json(load_summary(&state, id).await?))
}

/// `DELETE /api/v1/searches/:id`
///
/// Leads of the search are kept with their `search_id` cleared.
pub async fn delete_search(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.repos.searches.delete(id).await? {
        return Err(ApiError::NotFound(format!("search {} not found", id)));
    }
    info!(subsystem = "api", component = "search", search_id = id, "Search deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/searches/:id/leads`
pub async fn search_leads(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    load_summary(&state, id).await?;
    let leads = state
        .repos
        .leads
        .list(&ListLeadsRequest {
            search_id: Some(id),
            limit: page.limit,
            offset: page.offset,
        })
        .await?;
    Ok(Json(leads))
}

/// `GET /api/v1/searches/:id/audit`
///
/// Entries outlive their search; 404 only when there is neither.
pub async fn search_audit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let entries = state.repos.audit.list_for_search(id).await?;
    if entries.is_empty() && state.repos.searches.get(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("search {} not found", id)));
    }
    Ok(Json(entries))
}
