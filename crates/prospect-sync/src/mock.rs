//! Mock trigger for deterministic testing.
//!
//! ```rust,ignore
//! use prospect_sync::mock::MockTrigger;
//!
//! let trigger = MockTrigger::new().failing("Automation tool returned HTTP 500: boom");
//! // hand `Arc::new(trigger.clone())` to a SearchService, then:
//! assert_eq!(trigger.calls().len(), 1);
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use prospect_core::{Error, Result, TriggerPayload};

use crate::trigger::SearchTrigger;

/// Records every payload and answers with a fixed outcome.
#[derive(Clone, Default)]
pub struct MockTrigger {
    failure: Option<String>,
    calls: Arc<Mutex<Vec<TriggerPayload>>>,
}

impl MockTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with this message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Payloads received so far, oldest first.
    pub fn calls(&self) -> Vec<TriggerPayload> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchTrigger for MockTrigger {
    async fn fire(&self, payload: &TriggerPayload) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| Error::Internal("mock trigger lock poisoned".to_string()))?
            .push(payload.clone());
        match &self.failure {
            Some(message) => Err(Error::Request(message.clone())),
            None => Ok(()),
        }
    }
}
