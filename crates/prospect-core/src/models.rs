//! Core data models for prospect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SEARCH JOB TYPES
// =============================================================================

/// Status of a search job.
///
/// `completed` is terminal. `error` has no user-initiated way out, but a
/// late callback from the automation tool may still move it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    New,
    Processing,
    PendingNext,
    Completed,
    Error,
}

impl SearchStatus {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::New => "new",
            SearchStatus::Processing => "processing",
            SearchStatus::PendingNext => "pending_next",
            SearchStatus::Completed => "completed",
            SearchStatus::Error => "error",
        }
    }

    /// Parse the database / wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(SearchStatus::New),
            "processing" => Some(SearchStatus::Processing),
            "pending_next" => Some(SearchStatus::PendingNext),
            "completed" => Some(SearchStatus::Completed),
            "error" => Some(SearchStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SearchStatus::Completed)
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutable part of a search job: everything the protocol writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub status: SearchStatus,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

impl SearchState {
    /// State of a freshly created search.
    pub fn new_search() -> Self {
        Self {
            status: SearchStatus::New,
            next_page_token: None,
            error_message: None,
        }
    }
}

/// One pagination-tracked search issued to the automation tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob {
    pub id: i64,
    pub query: String,
    pub status: SearchStatus,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every write; used for compare-and-swap updates.
    pub version: i64,
}

impl SearchJob {
    pub fn state(&self) -> SearchState {
        SearchState {
            status: self.status,
            next_page_token: self.next_page_token.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

/// Search job with its lead count, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    #[serde(flatten)]
    pub search: SearchJob,
    pub lead_count: i64,
}

/// Request to create a new search job.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSearchRequest {
    pub query: String,
    #[serde(default)]
    pub requested_by: Option<String>,
}

// =============================================================================
// LEAD TYPES
// =============================================================================

/// One prospect company ingested from the automation tool or entered by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    /// Weak back-reference; a lead survives deletion of its search.
    pub search_id: Option<i64>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub activity_summary: Option<String>,
    pub message_text: String,
    pub use_default_message: bool,
    pub contact_created: bool,
    pub created_partner_id: Option<i64>,
    pub opportunity_created: bool,
    pub created_opportunity_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// `contact_created` without a partner reference is recoverable; callers
    /// log it rather than repair it.
    pub fn has_dangling_contact_flag(&self) -> bool {
        self.contact_created && self.created_partner_id.is_none()
    }
}

/// Fields for inserting a lead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    #[serde(default)]
    pub search_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub activity_summary: Option<String>,
}

/// Filter for listing leads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLeadsRequest {
    pub search_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Editable message fields of a lead. Only non-None fields are updated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLeadMessageRequest {
    pub message_text: Option<String>,
    pub use_default_message: Option<bool>,
}

// =============================================================================
// CONTACT / OPPORTUNITY TYPES
// =============================================================================

/// A contact (partner) created from a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub comment: Option<String>,
    pub is_company: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub comment: Option<String>,
    pub is_company: bool,
}

/// A CRM opportunity created from a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: i64,
    pub name: String,
    pub lead_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub name: String,
    pub lead_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// AUDIT LOG TYPES
// =============================================================================

/// Who caused a search transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    /// Interactive user or API client.
    User,
    /// Inbound callback from the automation tool.
    Webhook,
    /// The service itself (trigger acknowledgement or failure).
    System,
}

impl AuditActor {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditActor::User => "user",
            AuditActor::Webhook => "webhook",
            AuditActor::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(AuditActor::User),
            "webhook" => Some(AuditActor::Webhook),
            "system" => Some(AuditActor::System),
            _ => None,
        }
    }
}

/// Append-only record of one search transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub search_id: i64,
    /// None for the creation entry.
    pub from_status: Option<SearchStatus>,
    pub to_status: SearchStatus,
    pub actor: AuditActor,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub search_id: i64,
    pub from_status: Option<SearchStatus>,
    pub to_status: SearchStatus,
    pub actor: AuditActor,
    pub message: String,
}

// =============================================================================
// MESSAGE DEFAULTS
// =============================================================================

/// Default outbound contact texts, loaded once from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDefaults {
    pub whatsapp_message: String,
    pub email_subject: String,
    pub email_body: String,
    /// Country calling code prefixed to short local numbers.
    pub whatsapp_country_code: String,
}

impl Default for MessageDefaults {
    fn default() -> Self {
        Self {
            whatsapp_message: crate::defaults::WHATSAPP_MESSAGE.to_string(),
            email_subject: crate::defaults::EMAIL_SUBJECT.to_string(),
            email_body: crate::defaults::EMAIL_BODY.to_string(),
            whatsapp_country_code: crate::defaults::WHATSAPP_COUNTRY_CODE.to_string(),
        }
    }
}
