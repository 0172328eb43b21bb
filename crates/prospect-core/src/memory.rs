//! In-memory implementation of every repository trait.
//!
//! Used for deterministic tests of the protocol and the HTTP surface. It
//! mirrors the PostgreSQL semantics that matter: sequential ids, newest-first
//! listings, compare-and-swap on the search version, and `search_id` cleared
//! on search deletion.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prospect_core::memory::MemoryStore;
//! use prospect_core::SearchRepository;
//!
//! let store = MemoryStore::new();
//! let search = store.insert("bakeries in Curitiba", None).await?;
//! assert_eq!(search.version, 0);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::defaults::clamp_limit;
use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;

#[derive(Default)]
struct Inner {
    searches: BTreeMap<i64, SearchJob>,
    leads: BTreeMap<i64, Lead>,
    contacts: BTreeMap<i64, Contact>,
    opportunities: BTreeMap<i64, Opportunity>,
    audit: Vec<AuditEntry>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SearchRepository for MemoryStore {
    async fn insert(&self, query: &str, created_by: Option<&str>) -> Result<SearchJob> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let now = Utc::now();
        let search = SearchJob {
            id,
            query: query.to_string(),
            status: SearchStatus::New,
            next_page_token: None,
            error_message: None,
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        inner.searches.insert(id, search.clone());
        Ok(search)
    }

    async fn get(&self, id: i64) -> Result<Option<SearchJob>> {
        Ok(self.lock()?.searches.get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<SearchSummary>> {
        let inner = self.lock()?;
        Ok(inner
            .searches
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(clamp_limit(Some(limit)) as usize)
            .map(|search| SearchSummary {
                lead_count: inner
                    .leads
                    .values()
                    .filter(|l| l.search_id == Some(search.id))
                    .count() as i64,
                search: search.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.searches.len() as i64)
    }

    async fn write_state(
        &self,
        id: i64,
        expected_version: i64,
        state: &SearchState,
    ) -> Result<SearchJob> {
        let mut inner = self.lock()?;
        let search = inner
            .searches
            .get_mut(&id)
            .ok_or(Error::SearchNotFound(id))?;
        if search.version != expected_version {
            return Err(Error::Conflict(format!(
                "search {} changed concurrently (expected version {}, found {})",
                id, expected_version, search.version
            )));
        }
        search.status = state.status;
        search.next_page_token = state.next_page_token.clone();
        search.error_message = state.error_message.clone();
        search.version += 1;
        search.updated_at = Utc::now();
        Ok(search.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner.searches.remove(&id).is_none() {
            return Ok(false);
        }
        for lead in inner.leads.values_mut() {
            if lead.search_id == Some(id) {
                lead.search_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead> {
        let mut inner = self.lock()?;
        if let Some(search_id) = lead.search_id {
            if !inner.searches.contains_key(&search_id) {
                return Err(Error::InvalidInput(format!(
                    "search {} does not exist",
                    search_id
                )));
            }
        }
        let id = inner.next_id();
        let lead = Lead {
            id,
            search_id: lead.search_id,
            name: lead.name,
            phone: lead.phone,
            email: lead.email,
            address: lead.address,
            activity_summary: lead.activity_summary,
            message_text: String::new(),
            use_default_message: true,
            contact_created: false,
            created_partner_id: None,
            opportunity_created: false,
            created_opportunity_id: None,
            created_at: Utc::now(),
        };
        inner.leads.insert(id, lead.clone());
        Ok(lead)
    }

    async fn get(&self, id: i64) -> Result<Option<Lead>> {
        Ok(self.lock()?.leads.get(&id).cloned())
    }

    async fn list(&self, req: &ListLeadsRequest) -> Result<Vec<Lead>> {
        let inner = self.lock()?;
        Ok(inner
            .leads
            .values()
            .rev()
            .filter(|l| req.search_id.is_none() || l.search_id == req.search_id)
            .skip(req.offset.unwrap_or(0).max(0) as usize)
            .take(clamp_limit(req.limit) as usize)
            .cloned()
            .collect())
    }

    async fn count_for_search(&self, search_id: i64) -> Result<i64> {
        let inner = self.lock()?;
        Ok(inner
            .leads
            .values()
            .filter(|l| l.search_id == Some(search_id))
            .count() as i64)
    }

    async fn update_message(&self, id: i64, req: &UpdateLeadMessageRequest) -> Result<Lead> {
        let mut inner = self.lock()?;
        let lead = inner.leads.get_mut(&id).ok_or(Error::LeadNotFound(id))?;
        if let Some(text) = &req.message_text {
            lead.message_text = text.clone();
        }
        if let Some(use_default) = req.use_default_message {
            lead.use_default_message = use_default;
        }
        Ok(lead.clone())
    }

    async fn mark_contact_created(&self, id: i64, partner_id: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let lead = inner.leads.get_mut(&id).ok_or(Error::LeadNotFound(id))?;
        lead.contact_created = true;
        lead.created_partner_id = Some(partner_id);
        Ok(())
    }

    async fn mark_opportunity_created(&self, id: i64, opportunity_id: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let lead = inner.leads.get_mut(&id).ok_or(Error::LeadNotFound(id))?;
        lead.opportunity_created = true;
        lead.created_opportunity_id = Some(opportunity_id);
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.leads.remove(&id).is_some())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn insert(&self, contact: NewContact) -> Result<Contact> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let contact = Contact {
            id,
            name: contact.name,
            phone: contact.phone,
            email: contact.email,
            street: contact.street,
            comment: contact.comment,
            is_company: contact.is_company,
            created_at: Utc::now(),
        };
        inner.contacts.insert(id, contact.clone());
        Ok(contact)
    }

    async fn get(&self, id: i64) -> Result<Option<Contact>> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Contact>> {
        let inner = self.lock()?;
        Ok(inner
            .contacts
            .values()
            .find(|c| {
                (email.is_some() && c.email.as_deref() == email)
                    || (phone.is_some() && c.phone.as_deref() == phone)
            })
            .cloned())
    }

    async fn ids_by_email(&self, email: &str) -> Result<Vec<i64>> {
        let inner = self.lock()?;
        Ok(inner
            .contacts
            .values()
            .filter(|c| c.email.as_deref() == Some(email))
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl OpportunityRepository for MemoryStore {
    async fn insert(&self, opportunity: NewOpportunity) -> Result<Opportunity> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let opportunity = Opportunity {
            id,
            name: opportunity.name,
            lead_id: opportunity.lead_id,
            contact_id: opportunity.contact_id,
            email: opportunity.email,
            phone: opportunity.phone,
            description: opportunity.description,
            created_at: Utc::now(),
        };
        inner.opportunities.insert(id, opportunity.clone());
        Ok(opportunity)
    }

    async fn get(&self, id: i64) -> Result<Option<Opportunity>> {
        Ok(self.lock()?.opportunities.get(&id).cloned())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let mut inner = self.lock()?;
        let id = inner.next_id();
        let entry = AuditEntry {
            id,
            search_id: entry.search_id,
            from_status: entry.from_status,
            to_status: entry.to_status,
            actor: entry.actor,
            message: entry.message,
            created_at: Utc::now(),
        };
        inner.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_for_search(&self, search_id: i64) -> Result<Vec<AuditEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .audit
            .iter()
            .filter(|e| e.search_id == search_id)
            .cloned()
            .collect())
    }
}
