//! Contact, opportunity and email actions on a lead.

use tracing::{info, warn};

use prospect_core::actions::{self, EmailDraft};
use prospect_core::{Contact, Error, Lead, MessageDefaults, Opportunity, Result};

use crate::Repositories;

pub async fn load_lead(repos: &Repositories, id: i64) -> Result<Lead> {
    repos
        .leads
        .get(id)
        .await?
        .ok_or(Error::LeadNotFound(id))
}

fn warn_if_dangling(lead: &Lead) {
    if lead.has_dangling_contact_flag() {
        warn!(
            subsystem = "api",
            component = "lead_actions",
            lead_id = lead.id,
            "Lead is flagged as having a contact but has no contact reference"
        );
    }
}

/// Create a company contact from a lead.
///
/// Rejected when the lead already produced a contact, or when a contact with
/// the same email or phone exists.
pub async fn create_contact(repos: &Repositories, lead_id: i64) -> Result<(Lead, Contact)> {
    let lead = load_lead(repos, lead_id).await?;
    if lead.contact_created {
        warn_if_dangling(&lead);
        return Err(Error::Conflict(
            "a contact was already created for this lead".to_string(),
        ));
    }

    if let Some(existing) = repos
        .contacts
        .find_by_email_or_phone(lead.email.as_deref(), lead.phone.as_deref())
        .await?
    {
        return Err(Error::Conflict(format!(
            "a contact with this email or phone already exists: {} (id {})",
            existing.name, existing.id
        )));
    }

    let contact = repos.contacts.insert(actions::contact_from_lead(&lead)).await?;
    repos.leads.mark_contact_created(lead.id, contact.id).await?;
    info!(
        subsystem = "api",
        component = "lead_actions",
        lead_id = lead.id,
        contact_id = contact.id,
        "Contact created from lead"
    );

    let lead = load_lead(repos, lead_id).await?;
    Ok((lead, contact))
}

/// Create an opportunity from a lead, linked to its contact when one exists.
pub async fn create_opportunity(
    repos: &Repositories,
    lead_id: i64,
) -> Result<(Lead, Opportunity)> {
    let lead = load_lead(repos, lead_id).await?;
    if lead.opportunity_created {
        return Err(Error::Conflict(
            "an opportunity was already created for this lead".to_string(),
        ));
    }
    warn_if_dangling(&lead);

    let opportunity = repos
        .opportunities
        .insert(actions::opportunity_from_lead(&lead))
        .await?;
    repos
        .leads
        .mark_opportunity_created(lead.id, opportunity.id)
        .await?;
    info!(
        subsystem = "api",
        component = "lead_actions",
        lead_id = lead.id,
        opportunity_id = opportunity.id,
        "Opportunity created from lead"
    );

    let lead = load_lead(repos, lead_id).await?;
    Ok((lead, opportunity))
}

/// Email draft addressed to the lead, with matching contacts attached.
pub async fn email_draft(
    repos: &Repositories,
    defaults: &MessageDefaults,
    lead_id: i64,
) -> Result<EmailDraft> {
    let lead = load_lead(repos, lead_id).await?;
    let partner_ids = match lead.email.as_deref() {
        Some(email) => repos.contacts.ids_by_email(email).await?,
        None => Vec::new(),
    };
    actions::email_draft(&lead, defaults, partner_ids)
}
