//! Services that combine several repositories.

pub mod lead_actions;

pub use lead_actions::{create_contact, create_opportunity, email_draft, load_lead};
