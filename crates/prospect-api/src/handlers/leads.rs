//! Lead handlers: CRUD and one-click actions.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use prospect_core::actions::{self, EmailDraft, WhatsAppLink};
use prospect_core::{Lead, ListLeadsRequest, NewLead, UpdateLeadMessageRequest};

use crate::services::lead_actions;
use crate::{ApiError, AppState};

/// `GET /api/v1/leads?search_id=&limit=&offset=`
pub async fn list_leads(
    State(state): State<AppState>,
    Query(req): Query<ListLeadsRequest>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.repos.leads.list(&req).await?))
}

/// `POST /api/v1/leads`
///
/// Manual entry. Unlike the webhook, an unknown `search_id` is rejected.
pub async fn create_lead(
    State(state): State<AppState>,
    body: Result<Json<NewLead>, JsonRejection>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let Json(mut body) = body?;
    body.name = body.name.trim().to_string();
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("name must not be blank".to_string()));
    }
    if let Some(search_id) = body.search_id {
        if state.repos.searches.get(search_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!(
                "search {} does not exist",
                search_id
            )));
        }
    }

    let lead = state.repos.leads.insert(body).await?;
    info!(subsystem = "api", component = "lead", lead_id = lead.id, "Lead entered manually");
    Ok((StatusCode::CREATED, Json(lead)))
}

/// `GET /api/v1/leads/:id`
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(lead_actions::load_lead(&state.repos, id).await?))
}

/// `PATCH /api/v1/leads/:id`
///
/// Edits `message_text` and `use_default_message`; omitted fields keep
/// their value.
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<UpdateLeadMessageRequest>, JsonRejection>,
) -> Result<Json<Lead>, ApiError> {
    let Json(body) = body?;
    Ok(Json(state.repos.leads.update_message(id, &body).await?))
}

/// `DELETE /api/v1/leads/:id`
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.repos.leads.delete(id).await? {
        return Err(ApiError::NotFound(format!("lead {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/leads/:id/whatsapp`
///
/// 400 when the lead has no usable phone number.
pub async fn whatsapp(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<WhatsAppLink>, ApiError> {
    let lead = lead_actions::load_lead(&state.repos, id).await?;
    Ok(Json(actions::whatsapp_link(&lead, &state.config.messages)?))
}

/// `GET /api/v1/leads/:id/email`
///
/// 400 when the lead has no email address.
pub async fn email(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EmailDraft>, ApiError> {
    Ok(Json(
        lead_actions::email_draft(&state.repos, &state.config.messages, id).await?,
    ))
}

/// `POST /api/v1/leads/:id/contact`
///
/// 201 with the new contact; 409 when one exists already.
pub async fn create_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (lead, contact) = lead_actions::create_contact(&state.repos, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "lead": lead, "contact": contact })),
    ))
}

/// `POST /api/v1/leads/:id/opportunity`
pub async fn create_opportunity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (lead, opportunity) = lead_actions::create_opportunity(&state.repos, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "lead": lead, "opportunity": opportunity })),
    ))
}
