//! # prospect-sync
//!
//! The search synchronization protocol with the external automation tool.
//!
//! This crate provides:
//! - The outbound trigger client with a bounded timeout
//! - `SearchService`: start search, request next page, apply inbound status
//!   updates, with compare-and-swap writes and audit entries
//! - `LeadIntake`: single and batch lead ingestion with per-item isolation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use prospect_sync::{HttpSearchTrigger, SearchService, TriggerConfig};
//! use prospect_db::Database;
//!
//! let db = Database::connect("postgres://...").await?;
//! let config = TriggerConfig::from_env();
//! let trigger = HttpSearchTrigger::new("http://automation:5678/trigger", config.timeout)?;
//! let service = SearchService::new(
//!     Arc::new(db.searches),
//!     Arc::new(db.audit),
//!     Some(Arc::new(trigger)),
//!     config.dispatch,
//! );
//!
//! let started = service.start_search("restaurants SP", Some("ana")).await?;
//! ```

pub mod config;
pub mod intake;
pub mod mock;
pub mod service;
pub mod trigger;

// Re-export core types
pub use prospect_core::*;

pub use config::{TriggerConfig, TriggerDispatch};
pub use intake::{BatchReport, IntakeOutcome, ItemError, LeadIntake};
pub use service::{Applied, SearchService, SearchStart, TriggerOutcome};
pub use trigger::{HttpSearchTrigger, SearchTrigger};
