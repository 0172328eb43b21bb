//! Lead ingestion from the automation tool.
//!
//! A single object is all-or-nothing. In a batch every item is validated
//! and inserted on its own, so one bad item never undoes the others.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use prospect_core::{
    Error, InboundLead, Lead, LeadRepository, LeadsPayload, NewLead, Result, SearchRepository,
};
use serde_json::Value as JsonValue;

/// Why one batch item was not stored.
#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    /// Position in the submitted list.
    pub index: usize,
    pub error: String,
}

/// Per-batch outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub lead_ids: Vec<i64>,
    pub errors: Vec<ItemError>,
    /// Created leads whose `search_id` was unknown and stored as null.
    pub orphaned: usize,
}

impl BatchReport {
    pub fn created(&self) -> usize {
        self.lead_ids.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

/// Result of one webhook delivery.
#[derive(Debug, Clone)]
pub enum IntakeOutcome {
    Single(Lead),
    Batch(BatchReport),
}

/// Stores leads pushed by the automation tool.
#[derive(Clone)]
pub struct LeadIntake {
    leads: Arc<dyn LeadRepository>,
    searches: Arc<dyn SearchRepository>,
}

impl LeadIntake {
    pub fn new(leads: Arc<dyn LeadRepository>, searches: Arc<dyn SearchRepository>) -> Self {
        Self { leads, searches }
    }

    /// Ingest a parsed webhook body.
    ///
    /// An invalid single object is `Error::InvalidInput` and creates nothing.
    /// Batch item failures are collected in the report instead.
    pub async fn ingest(&self, payload: LeadsPayload) -> Result<IntakeOutcome> {
        let mut known = HashMap::new();
        match payload {
            LeadsPayload::Single(value) => {
                let lead = InboundLead::from_value(value)?.into_new_lead()?;
                let (lead, _) = self.store(lead, &mut known).await?;
                Ok(IntakeOutcome::Single(lead))
            }
            LeadsPayload::Batch(items) => {
                let mut report = BatchReport {
                    total: items.len(),
                    ..Default::default()
                };
                for (index, value) in items.into_iter().enumerate() {
                    match self.ingest_item(value, &mut known).await {
                        Ok((lead, orphaned)) => {
                            report.lead_ids.push(lead.id);
                            if orphaned {
                                report.orphaned += 1;
                            }
                        }
                        Err(e) => {
                            debug!(
                                subsystem = "sync",
                                component = "intake",
                                index,
                                error = %e,
                                "Lead item rejected"
                            );
                            report.errors.push(ItemError {
                                index,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                info!(
                    subsystem = "sync",
                    component = "intake",
                    op = "batch",
                    total = report.total,
                    created = report.created(),
                    failed = report.failed(),
                    orphaned = report.orphaned,
                    "Lead batch ingested"
                );
                Ok(IntakeOutcome::Batch(report))
            }
        }
    }

    async fn ingest_item(
        &self,
        value: JsonValue,
        known: &mut HashMap<i64, bool>,
    ) -> Result<(Lead, bool)> {
        let lead = InboundLead::from_value(value)?.into_new_lead()?;
        self.store(lead, known).await
    }

    /// Insert one lead, storing an unknown `search_id` as null. Returns the
    /// lead and whether it was orphaned.
    async fn store(
        &self,
        mut lead: NewLead,
        known: &mut HashMap<i64, bool>,
    ) -> Result<(Lead, bool)> {
        let mut orphaned = false;
        if let Some(search_id) = lead.search_id {
            if !self.search_exists(search_id, known).await? {
                warn!(
                    subsystem = "sync",
                    component = "intake",
                    search_id,
                    "Lead references unknown search; storing without search"
                );
                lead.search_id = None;
                orphaned = true;
            }
        }

        match self.leads.insert(lead.clone()).await {
            Ok(created) => Ok((created, orphaned)),
            // The search vanished between the lookup and the insert.
            Err(Error::InvalidInput(_)) if lead.search_id.is_some() => {
                if let Some(search_id) = lead.search_id {
                    known.insert(search_id, false);
                    warn!(
                        subsystem = "sync",
                        component = "intake",
                        search_id,
                        "Search deleted during ingestion; storing lead without search"
                    );
                }
                lead.search_id = None;
                Ok((self.leads.insert(lead).await?, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn search_exists(&self, search_id: i64, known: &mut HashMap<i64, bool>) -> Result<bool> {
        if let Some(exists) = known.get(&search_id) {
            return Ok(*exists);
        }
        let exists = self.searches.get(search_id).await?.is_some();
        known.insert(search_id, exists);
        Ok(exists)
    }
}
