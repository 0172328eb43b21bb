//! Core traits for prospect abstractions.
//!
//! These traits define the storage seams. `prospect-db` implements them on
//! PostgreSQL and [`crate::memory::MemoryStore`] implements them in memory.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// SEARCH REPOSITORY
// =============================================================================

/// Repository for search jobs.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    /// Insert a new search in status `new` (version 0).
    async fn insert(&self, query: &str, created_by: Option<&str>) -> Result<SearchJob>;

    /// Get a search by id.
    async fn get(&self, id: i64) -> Result<Option<SearchJob>>;

    /// List searches newest first, with lead counts.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<SearchSummary>>;

    /// Total number of searches.
    async fn count(&self) -> Result<i64>;

    /// Compare-and-swap write of the protocol state.
    ///
    /// Succeeds only if the stored version equals `expected_version`, and
    /// then bumps the version. Returns `Error::Conflict` on a lost race and
    /// `Error::SearchNotFound` if the row is gone.
    async fn write_state(
        &self,
        id: i64,
        expected_version: i64,
        state: &SearchState,
    ) -> Result<SearchJob>;

    /// Delete a search. Its leads survive with `search_id` cleared.
    /// Returns false if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

// =============================================================================
// LEAD REPOSITORY
// =============================================================================

/// Repository for leads.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert(&self, lead: NewLead) -> Result<Lead>;

    async fn get(&self, id: i64) -> Result<Option<Lead>>;

    /// List leads newest first.
    async fn list(&self, req: &ListLeadsRequest) -> Result<Vec<Lead>>;

    async fn count_for_search(&self, search_id: i64) -> Result<i64>;

    /// Update message fields; only non-None fields change.
    async fn update_message(&self, id: i64, req: &UpdateLeadMessageRequest) -> Result<Lead>;

    /// Set `contact_created` and the partner reference.
    async fn mark_contact_created(&self, id: i64, partner_id: i64) -> Result<()>;

    /// Set `opportunity_created` and the opportunity reference.
    async fn mark_opportunity_created(&self, id: i64, opportunity_id: i64) -> Result<()>;

    /// Returns false if the lead did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

// =============================================================================
// CONTACT / OPPORTUNITY REPOSITORIES
// =============================================================================

/// Repository for contacts created from leads.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert(&self, contact: NewContact) -> Result<Contact>;

    async fn get(&self, id: i64) -> Result<Option<Contact>>;

    /// First contact whose email or phone matches (either may be None).
    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Contact>>;

    /// Ids of contacts with exactly this email.
    async fn ids_by_email(&self, email: &str) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    async fn insert(&self, opportunity: NewOpportunity) -> Result<Opportunity>;

    async fn get(&self, id: i64) -> Result<Option<Opportunity>>;
}

// =============================================================================
// AUDIT LOG
// =============================================================================

/// Append-only log of search transitions.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry>;

    /// Entries for one search, oldest first.
    async fn list_for_search(&self, search_id: i64) -> Result<Vec<AuditEntry>>;
}
