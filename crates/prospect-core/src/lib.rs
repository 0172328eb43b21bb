//! # prospect-core
//!
//! Core types, the search job state machine, wire schemas, and repository
//! traits for prospect.
//!
//! Every other prospect crate depends on this one. It holds no I/O besides
//! the in-memory store used by tests.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (trigger failure, orphan lead, rejected secret) |
//! | INFO  | Lifecycle events, search transitions, ingestion summaries |
//! | DEBUG | Decision points, raw inbound payloads |

pub mod actions;
pub mod defaults;
pub mod error;
pub mod memory;
pub mod models;
pub mod payloads;
pub mod state;
pub mod traits;

// Re-export commonly used types at crate root
pub use actions::{EmailDraft, WhatsAppLink};
pub use error::{Error, Result};
pub use models::*;
pub use payloads::{InboundLead, InboundStatus, LeadsPayload, SearchStatusUpdate, TriggerPayload};
pub use state::{SearchEvent, Transition};
pub use traits::*;
