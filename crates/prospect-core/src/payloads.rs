//! Wire schemas exchanged with the automation tool.
//!
//! Inbound payloads are validated by deserialization: a missing key or a
//! wrong type is a deserialization error, never a manual key check.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::{NewLead, SearchJob, SearchStatus};

/// The key must be present, but its value may be `null`.
fn required_nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// LEAD WEBHOOK
// =============================================================================

/// One lead as pushed by the automation tool.
///
/// Every key is required; values other than the company name may be null.
/// English field names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundLead {
    #[serde(deserialize_with = "required_nullable")]
    pub search_id: Option<i64>,
    #[serde(alias = "name", deserialize_with = "required_nullable")]
    pub nome_empresa: Option<String>,
    #[serde(alias = "phone", deserialize_with = "required_nullable")]
    pub contato_telefonico: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub email: Option<String>,
    #[serde(alias = "address", deserialize_with = "required_nullable")]
    pub endereco: Option<String>,
    #[serde(alias = "activity_summary", deserialize_with = "required_nullable")]
    pub resumo_atividade: Option<String>,
}

impl InboundLead {
    /// Deserialize one lead from an untyped JSON value.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    /// Translate external field names into a lead insert. The company name
    /// must be non-blank.
    pub fn into_new_lead(self) -> Result<NewLead> {
        let name = non_blank(self.nome_empresa)
            .ok_or_else(|| Error::InvalidInput("nome_empresa must not be blank".to_string()))?;
        Ok(NewLead {
            search_id: self.search_id,
            name,
            phone: non_blank(self.contato_telefonico),
            email: non_blank(self.email),
            address: non_blank(self.endereco),
            activity_summary: non_blank(self.resumo_atividade),
        })
    }
}

/// Body of the lead webhook: a single object or a list of objects.
#[derive(Debug, Clone)]
pub enum LeadsPayload {
    Single(JsonValue),
    Batch(Vec<JsonValue>),
}

impl LeadsPayload {
    /// Classify a raw JSON body. Anything other than an object or an array
    /// is structurally invalid.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::InvalidInput("empty body".to_string()));
        }
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("malformed JSON: {}", e)))?;
        match value {
            JsonValue::Array(items) => Ok(LeadsPayload::Batch(items)),
            value @ JsonValue::Object(_) => Ok(LeadsPayload::Single(value)),
            _ => Err(Error::InvalidInput(
                "expected a lead object or a list of lead objects".to_string(),
            )),
        }
    }
}

// =============================================================================
// SEARCH UPDATE WEBHOOK
// =============================================================================

/// Statuses the automation tool may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundStatus {
    PendingNext,
    Completed,
    Error,
}

impl From<InboundStatus> for SearchStatus {
    fn from(status: InboundStatus) -> Self {
        match status {
            InboundStatus::PendingNext => SearchStatus::PendingNext,
            InboundStatus::Completed => SearchStatus::Completed,
            InboundStatus::Error => SearchStatus::Error,
        }
    }
}

/// Status transition reported by the automation tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchStatusUpdate {
    pub search_id: i64,
    pub status: InboundStatus,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SearchStatusUpdate {
    /// Parse and validate a raw update body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::InvalidInput("empty body".to_string()));
        }
        let update: Self = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("invalid update payload: {}", e)))?;
        update.validate()?;
        Ok(update)
    }

    /// `pending_next` must carry a non-empty token.
    pub fn validate(&self) -> Result<()> {
        if self.search_id <= 0 {
            return Err(Error::InvalidInput(
                "search_id must be a positive integer".to_string(),
            ));
        }
        if self.status == InboundStatus::PendingNext && self.token().is_none() {
            return Err(Error::InvalidInput(
                "pending_next requires a non-empty next_page_token".to_string(),
            ));
        }
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn message(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

// =============================================================================
// OUTBOUND TRIGGER
// =============================================================================

/// Body POSTed to the automation tool. A fresh start carries `query`; a
/// continuation carries `next_page_token` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub search_id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_page_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub requested_by: Option<String>,
}

impl TriggerPayload {
    pub fn start(search: &SearchJob) -> Self {
        Self {
            search_id: search.id,
            query: Some(search.query.clone()),
            next_page_token: None,
            requested_by: search.created_by.clone(),
        }
    }

    pub fn next_page(search: &SearchJob, token: &str, requested_by: Option<String>) -> Self {
        Self {
            search_id: search.id,
            query: None,
            next_page_token: Some(token.to_string()),
            requested_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_lead_maps_external_field_names() {
        let lead = InboundLead::from_value(json!({
            "search_id": 7,
            "nome_empresa": "Padaria Central",
            "contato_telefonico": "(41) 99999-0000",
            "email": "contato@padaria.example",
            "endereco": "Rua XV, 100",
            "resumo_atividade": "Bakery"
        }))
        .unwrap()
        .into_new_lead()
        .unwrap();

        assert_eq!(lead.search_id, Some(7));
        assert_eq!(lead.name, "Padaria Central");
        assert_eq!(lead.phone.as_deref(), Some("(41) 99999-0000"));
        assert_eq!(lead.email.as_deref(), Some("contato@padaria.example"));
        assert_eq!(lead.address.as_deref(), Some("Rua XV, 100"));
        assert_eq!(lead.activity_summary.as_deref(), Some("Bakery"));
    }

    #[test]
    fn test_inbound_lead_accepts_english_aliases() {
        let lead = InboundLead::from_value(json!({
            "search_id": null,
            "name": "Acme",
            "phone": null,
            "email": "a@acme.example",
            "address": null,
            "activity_summary": null
        }))
        .unwrap()
        .into_new_lead()
        .unwrap();
        assert_eq!(lead.name, "Acme");
        assert_eq!(lead.search_id, None);
        assert_eq!(lead.phone, None);
    }

    #[test]
    fn test_inbound_lead_missing_key_is_rejected() {
        let err = InboundLead::from_value(json!({
            "search_id": 1,
            "nome_empresa": "No Email Ltd",
            "contato_telefonico": "123",
            "endereco": "x",
            "resumo_atividade": "y"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("email")));
    }

    #[test]
    fn test_inbound_lead_blank_name_is_rejected() {
        let err = InboundLead::from_value(json!({
            "search_id": 1,
            "nome_empresa": "   ",
            "contato_telefonico": null,
            "email": null,
            "endereco": null,
            "resumo_atividade": null
        }))
        .unwrap()
        .into_new_lead()
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_inbound_lead_string_search_id_is_rejected() {
        let result = InboundLead::from_value(json!({
            "search_id": "7",
            "nome_empresa": "Acme",
            "contato_telefonico": null,
            "email": null,
            "endereco": null,
            "resumo_atividade": null
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_leads_payload_classifies_shapes() {
        assert!(matches!(
            LeadsPayload::from_slice(br#"{"a":1}"#).unwrap(),
            LeadsPayload::Single(_)
        ));
        match LeadsPayload::from_slice(br#"[{"a":1},{"b":2}]"#).unwrap() {
            LeadsPayload::Batch(items) => assert_eq!(items.len(), 2),
            other => panic!("expected batch, got {:?}", other),
        }
        assert!(LeadsPayload::from_slice(b"42").is_err());
        assert!(LeadsPayload::from_slice(b"\"text\"").is_err());
        assert!(LeadsPayload::from_slice(b"{not json").is_err());
        assert!(LeadsPayload::from_slice(b"  ").is_err());
    }

    #[test]
    fn test_status_update_parses_pending_next() {
        let update = SearchStatusUpdate::from_slice(
            br#"{"search_id": 3, "status": "pending_next", "next_page_token": "abc"}"#,
        )
        .unwrap();
        assert_eq!(update.search_id, 3);
        assert_eq!(update.status, InboundStatus::PendingNext);
        assert_eq!(update.token(), Some("abc"));
    }

    #[test]
    fn test_status_update_rejects_unknown_status() {
        let err =
            SearchStatusUpdate::from_slice(br#"{"search_id": 3, "status": "processing"}"#)
                .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_status_update_pending_next_requires_token() {
        let err = SearchStatusUpdate::from_slice(
            br#"{"search_id": 3, "status": "pending_next", "next_page_token": "  "}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("next_page_token")));
    }

    #[test]
    fn test_status_update_rejects_non_integer_search_id() {
        assert!(
            SearchStatusUpdate::from_slice(br#"{"search_id": "3", "status": "completed"}"#)
                .is_err()
        );
        assert!(
            SearchStatusUpdate::from_slice(br#"{"search_id": 0, "status": "completed"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_trigger_payload_shapes() {
        let now = chrono::Utc::now();
        let search = SearchJob {
            id: 11,
            query: "restaurants SP".to_string(),
            status: SearchStatus::New,
            next_page_token: None,
            error_message: None,
            created_by: Some("ana".to_string()),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let start = serde_json::to_value(TriggerPayload::start(&search)).unwrap();
        assert_eq!(
            start,
            json!({"search_id": 11, "query": "restaurants SP", "requested_by": "ana"})
        );

        let next = serde_json::to_value(TriggerPayload::next_page(&search, "abc", None)).unwrap();
        assert_eq!(next, json!({"search_id": 11, "next_page_token": "abc"}));
    }
}
