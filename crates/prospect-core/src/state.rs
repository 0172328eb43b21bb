//! Search job state machine.
//!
//! Pure planning only: given the current state and an event, decide the next
//! state (or that nothing changes, or that the event is illegal). Persisting
//! the result and recording the audit entry is the caller's job.
//!
//! | From | Event | To |
//! |------|-------|----|
//! | new | trigger accepted | processing |
//! | new, processing | trigger failed | error |
//! | pending_next | next page requested | processing |
//! | any but completed | remote update X | X |
//! | completed | identical remote update | (no-op) |
//!
//! The next-page token is replaced by every `pending_next` update, kept
//! while the next page is processing, and cleared on `completed` and `error`.

use crate::defaults::UNSPECIFIED_REMOTE_ERROR;
use crate::error::{Error, Result};
use crate::models::{AuditActor, SearchState, SearchStatus};
use crate::payloads::{InboundStatus, SearchStatusUpdate};

/// Something that may move a search job.
#[derive(Debug, Clone, Copy)]
pub enum SearchEvent<'a> {
    /// The automation tool acknowledged a trigger with a 2xx.
    TriggerAccepted,
    /// The trigger POST failed (network, timeout, non-2xx).
    TriggerFailed { message: &'a str },
    /// A user or job asked for the next page.
    NextPageRequested,
    /// The automation tool reported a status change.
    RemoteUpdate(&'a SearchStatusUpdate),
}

impl SearchEvent<'_> {
    pub fn actor(&self) -> AuditActor {
        match self {
            SearchEvent::TriggerAccepted | SearchEvent::TriggerFailed { .. } => AuditActor::System,
            SearchEvent::NextPageRequested => AuditActor::User,
            SearchEvent::RemoteUpdate(_) => AuditActor::Webhook,
        }
    }
}

/// A planned state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SearchStatus,
    pub to: SearchState,
    pub actor: AuditActor,
    /// Human-readable summary for the audit log.
    pub message: String,
}

/// Plan the effect of `event` on `current`.
///
/// Returns `Ok(None)` when the event is legal but changes nothing, and
/// `Err(Error::InvalidTransition)` when it is not legal from this state.
pub fn plan(current: &SearchState, event: SearchEvent<'_>) -> Result<Option<Transition>> {
    let next = match event {
        SearchEvent::TriggerAccepted => match current.status {
            SearchStatus::New => SearchState {
                status: SearchStatus::Processing,
                next_page_token: current.next_page_token.clone(),
                error_message: None,
            },
            // A callback already moved the job along, or the next-page path
            // wrote `processing` before firing.
            _ => return Ok(None),
        },
        SearchEvent::TriggerFailed { message } => match current.status {
            SearchStatus::New | SearchStatus::Processing => SearchState {
                status: SearchStatus::Error,
                next_page_token: None,
                error_message: Some(message.to_string()),
            },
            _ => return Ok(None),
        },
        SearchEvent::NextPageRequested => match current.status {
            SearchStatus::PendingNext => {
                let token = current
                    .next_page_token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidTransition("no next page token for this search".to_string())
                    })?;
                SearchState {
                    status: SearchStatus::Processing,
                    next_page_token: Some(token.to_string()),
                    error_message: None,
                }
            }
            SearchStatus::New | SearchStatus::Processing => {
                return Err(Error::InvalidTransition(
                    "search is still processing; wait for the current page".to_string(),
                ))
            }
            SearchStatus::Completed | SearchStatus::Error => {
                return Err(Error::InvalidTransition(format!(
                    "search has finished with status '{}'",
                    current.status
                )))
            }
        },
        SearchEvent::RemoteUpdate(update) => {
            let next = remote_state(update);
            if current.status.is_terminal() && next != *current {
                return Err(Error::InvalidTransition(
                    "search is already completed".to_string(),
                ));
            }
            next
        }
    };

    if next == *current {
        return Ok(None);
    }

    Ok(Some(Transition {
        from: current.status,
        message: describe(&event, &next),
        actor: event.actor(),
        to: next,
    }))
}

fn remote_state(update: &SearchStatusUpdate) -> SearchState {
    match update.status {
        InboundStatus::PendingNext => SearchState {
            status: SearchStatus::PendingNext,
            next_page_token: update.token().map(str::to_string),
            error_message: None,
        },
        InboundStatus::Completed => SearchState {
            status: SearchStatus::Completed,
            next_page_token: None,
            error_message: None,
        },
        InboundStatus::Error => SearchState {
            status: SearchStatus::Error,
            next_page_token: None,
            error_message: Some(
                update
                    .message()
                    .unwrap_or(UNSPECIFIED_REMOTE_ERROR)
                    .to_string(),
            ),
        },
    }
}

fn describe(event: &SearchEvent<'_>, next: &SearchState) -> String {
    match event {
        SearchEvent::TriggerAccepted => "Automation tool accepted the search".to_string(),
        SearchEvent::TriggerFailed { message } => format!("Trigger failed: {}", message),
        SearchEvent::NextPageRequested => "Next page requested".to_string(),
        SearchEvent::RemoteUpdate(_) => match next.status {
            SearchStatus::PendingNext => "Page delivered; next page available".to_string(),
            SearchStatus::Completed => "Search completed".to_string(),
            SearchStatus::Error => format!(
                "Automation tool reported an error: {}",
                next.error_message.as_deref().unwrap_or_default()
            ),
            other => format!("Status changed to {}", other),
        },
    }
}
