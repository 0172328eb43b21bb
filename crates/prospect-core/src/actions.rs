//! One-click lead actions: WhatsApp link, email draft, contact and
//! opportunity construction.
//!
//! These are pure builders; the services that persist their results live in
//! `prospect-api`.

use serde::{Deserialize, Serialize};

use crate::defaults::WHATSAPP_LOCAL_MAX_DIGITS;
use crate::error::{Error, Result};
use crate::models::{Lead, MessageDefaults, NewContact, NewOpportunity};

/// Click-to-chat link for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppLink {
    pub lead_id: i64,
    pub phone: String,
    pub url: String,
}

/// Pre-filled email for an external composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub lead_id: i64,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Existing contacts with the same email address.
    pub partner_ids: Vec<i64>,
}

/// Strip `+`, `-`, parentheses and spaces from a phone number.
pub fn clean_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | '(' | ')' | ' '))
        .collect()
}

/// Text used for outbound contact: the default template, or the lead's own
/// message when it opted out of the default.
pub fn message_for<'a>(lead: &'a Lead, default: &'a str) -> &'a str {
    if lead.use_default_message {
        default
    } else {
        &lead.message_text
    }
}

pub fn whatsapp_link(lead: &Lead, defaults: &MessageDefaults) -> Result<WhatsAppLink> {
    let phone = lead
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("this lead has no phone number".to_string()))?;

    let mut cleaned = clean_phone(phone);
    if cleaned.is_empty() {
        return Err(Error::InvalidInput(format!(
            "phone number '{}' has no digits",
            phone
        )));
    }
    let country = defaults.whatsapp_country_code.as_str();
    if cleaned.len() <= WHATSAPP_LOCAL_MAX_DIGITS && !cleaned.starts_with(country) {
        cleaned = format!("{}{}", country, cleaned);
    }

    let text = urlencoding::encode(message_for(lead, &defaults.whatsapp_message));
    Ok(WhatsAppLink {
        lead_id: lead.id,
        url: format!("https://wa.me/{}?text={}", cleaned, text),
        phone: cleaned,
    })
}

pub fn email_draft(
    lead: &Lead,
    defaults: &MessageDefaults,
    partner_ids: Vec<i64>,
) -> Result<EmailDraft> {
    let to = lead
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("this lead has no email address".to_string()))?;

    Ok(EmailDraft {
        lead_id: lead.id,
        to: to.to_string(),
        subject: defaults.email_subject.clone(),
        body: message_for(lead, &defaults.email_body).to_string(),
        partner_ids,
    })
}

/// Company contact built from a lead.
pub fn contact_from_lead(lead: &Lead) -> NewContact {
    NewContact {
        name: lead.name.clone(),
        phone: lead.phone.clone(),
        email: lead.email.clone(),
        street: lead.address.clone(),
        comment: lead.activity_summary.clone(),
        is_company: true,
    }
}

pub fn opportunity_from_lead(lead: &Lead) -> NewOpportunity {
    NewOpportunity {
        name: lead.name.clone(),
        lead_id: Some(lead.id),
        contact_id: lead.created_partner_id,
        email: lead.email.clone(),
        phone: lead.phone.clone(),
        description: lead.activity_summary.clone(),
    }
}
