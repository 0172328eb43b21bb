//! Search synchronization service.
//!
//! Owns every write to a search job's protocol state. Each write is planned
//! by [`prospect_core::state::plan`], applied with a compare-and-swap on the
//! job's version, and recorded in the audit log when something changed.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use prospect_core::defaults::SEARCH_WRITE_ATTEMPTS;
use prospect_core::state::{self, SearchEvent};
use prospect_core::{
    AuditActor, AuditLog, Error, NewAuditEntry, Result, SearchJob, SearchRepository, SearchStatus,
    SearchStatusUpdate, TriggerPayload,
};

use crate::config::TriggerDispatch;
use crate::trigger::SearchTrigger;

/// What happened to the trigger by the time the call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The automation tool acknowledged with a 2xx.
    Acknowledged,
    /// The POST runs in a spawned task; its result lands on the search later.
    Dispatched,
}

/// Result of starting a search or requesting its next page.
#[derive(Debug, Clone)]
pub struct SearchStart {
    pub search: SearchJob,
    pub outcome: TriggerOutcome,
}

/// Result of applying one event.
#[derive(Debug, Clone)]
pub struct Applied {
    pub search: SearchJob,
    /// False when the event was legal but left the state untouched.
    pub changed: bool,
}

/// Drives search jobs through their lifecycle.
#[derive(Clone)]
pub struct SearchService {
    searches: Arc<dyn SearchRepository>,
    audit: Arc<dyn AuditLog>,
    trigger: Option<Arc<dyn SearchTrigger>>,
    dispatch: TriggerDispatch,
}

impl SearchService {
    pub fn new(
        searches: Arc<dyn SearchRepository>,
        audit: Arc<dyn AuditLog>,
        trigger: Option<Arc<dyn SearchTrigger>>,
        dispatch: TriggerDispatch,
    ) -> Self {
        Self {
            searches,
            audit,
            trigger,
            dispatch,
        }
    }

    pub fn dispatch(&self) -> TriggerDispatch {
        self.dispatch
    }

    fn trigger(&self) -> Result<Arc<dyn SearchTrigger>> {
        self.trigger
            .clone()
            .ok_or_else(|| Error::Config("TRIGGER_URL is not configured".to_string()))
    }

    /// Create a search and hand it to the automation tool.
    ///
    /// Inline dispatch returns `Error::Trigger` when the tool does not
    /// accept the job; the search is already in `error` by then.
    pub async fn start_search(
        &self,
        query: &str,
        requested_by: Option<&str>,
    ) -> Result<SearchStart> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be blank".to_string()));
        }
        let requested_by = requested_by.map(str::trim).filter(|r| !r.is_empty());
        let trigger = self.trigger()?;

        let search = self.searches.insert(query, requested_by).await?;
        self.record(NewAuditEntry {
            search_id: search.id,
            from_status: None,
            to_status: SearchStatus::New,
            actor: AuditActor::User,
            message: format!("Search created: {}", query),
        })
        .await;

        info!(
            subsystem = "sync",
            component = "search",
            op = "start",
            search_id = search.id,
            "Search created"
        );

        let payload = TriggerPayload::start(&search);
        self.dispatch_trigger(trigger, search, payload).await
    }

    /// Ask the automation tool for the next page of a `pending_next` search.
    ///
    /// `processing` is written before the POST so a racing callback cannot
    /// be overwritten by a stale request.
    pub async fn search_next_page(
        &self,
        search_id: i64,
        requested_by: Option<&str>,
    ) -> Result<SearchStart> {
        let trigger = self.trigger()?;
        let applied = self.apply(search_id, SearchEvent::NextPageRequested).await?;
        let search = applied.search;

        let token = search.next_page_token.clone().ok_or_else(|| {
            Error::Internal(format!("search {} is processing without a token", search_id))
        })?;
        let requested_by = requested_by
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let payload = TriggerPayload::next_page(&search, &token, requested_by);

        self.dispatch_trigger(trigger, search, payload).await
    }

    /// Apply a status update reported by the automation tool.
    pub async fn apply_remote_update(&self, update: &SearchStatusUpdate) -> Result<Applied> {
        update.validate()?;
        self.apply(update.search_id, SearchEvent::RemoteUpdate(update)).await
    }

    async fn dispatch_trigger(
        &self,
        trigger: Arc<dyn SearchTrigger>,
        search: SearchJob,
        payload: TriggerPayload,
    ) -> Result<SearchStart> {
        match self.dispatch {
            TriggerDispatch::Inline => {
                let search = self.fire(trigger, payload).await?;
                Ok(SearchStart {
                    search,
                    outcome: TriggerOutcome::Acknowledged,
                })
            }
            TriggerDispatch::Background => {
                let service = self.clone();
                let search_id = search.id;
                tokio::spawn(async move {
                    if let Err(e) = service.fire(trigger, payload).await {
                        debug!(
                            subsystem = "sync",
                            component = "search",
                            search_id,
                            error = %e,
                            "Background trigger finished with error"
                        );
                    }
                });
                Ok(SearchStart {
                    search,
                    outcome: TriggerOutcome::Dispatched,
                })
            }
        }
    }

    /// POST the trigger and record its outcome. This is the only place a
    /// failed trigger moves a search to `error`.
    async fn fire(
        &self,
        trigger: Arc<dyn SearchTrigger>,
        payload: TriggerPayload,
    ) -> Result<SearchJob> {
        let search_id = payload.search_id;
        match trigger.fire(&payload).await {
            Ok(()) => Ok(self.apply(search_id, SearchEvent::TriggerAccepted).await?.search),
            Err(e) => {
                let message = match e {
                    Error::Request(message) => message,
                    other => other.to_string(),
                };
                warn!(
                    subsystem = "sync",
                    component = "search",
                    op = "trigger",
                    search_id,
                    error = %message,
                    "Search trigger failed"
                );
                self.apply(search_id, SearchEvent::TriggerFailed { message: &message })
                    .await?;
                Err(Error::Trigger { search_id, message })
            }
        }
    }

    /// Plan and write one event, reloading and re-planning on a lost race.
    async fn apply(&self, search_id: i64, event: SearchEvent<'_>) -> Result<Applied> {
        for attempt in 1..=SEARCH_WRITE_ATTEMPTS {
            let search = self
                .searches
                .get(search_id)
                .await?
                .ok_or(Error::SearchNotFound(search_id))?;

            let Some(transition) = state::plan(&search.state(), event)? else {
                debug!(
                    subsystem = "sync",
                    component = "search",
                    search_id,
                    status = %search.status,
                    "Event left search unchanged"
                );
                return Ok(Applied {
                    search,
                    changed: false,
                });
            };

            match self
                .searches
                .write_state(search_id, search.version, &transition.to)
                .await
            {
                Ok(updated) => {
                    info!(
                        subsystem = "sync",
                        component = "search",
                        op = "transition",
                        search_id,
                        from = %transition.from,
                        status = %updated.status,
                        actor = transition.actor.as_str(),
                        "Search status changed"
                    );
                    self.record(NewAuditEntry {
                        search_id,
                        from_status: Some(transition.from),
                        to_status: transition.to.status,
                        actor: transition.actor,
                        message: transition.message,
                    })
                    .await;
                    return Ok(Applied {
                        search: updated,
                        changed: true,
                    });
                }
                Err(Error::Conflict(reason)) => {
                    debug!(
                        subsystem = "sync",
                        component = "search",
                        search_id,
                        attempt,
                        reason = %reason,
                        "Concurrent search write, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(format!(
            "search {} kept changing; gave up after {} attempts",
            search_id, SEARCH_WRITE_ATTEMPTS
        )))
    }

    /// The state write has already landed; a lost audit entry is logged,
    /// not surfaced.
    async fn record(&self, entry: NewAuditEntry) {
        let search_id = entry.search_id;
        if let Err(e) = self.audit.append(entry).await {
            error!(
                subsystem = "sync",
                component = "audit",
                search_id,
                error = %e,
                "Failed to append audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTrigger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use prospect_core::memory::MemoryStore;
    use prospect_core::{InboundStatus, SearchState, SearchSummary};

    fn service(store: &MemoryStore, trigger: Option<MockTrigger>) -> SearchService {
        SearchService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            trigger.map(|t| Arc::new(t) as Arc<dyn SearchTrigger>),
            TriggerDispatch::Inline,
        )
    }

    fn update(
        search_id: i64,
        status: InboundStatus,
        token: Option<&str>,
        message: Option<&str>,
    ) -> SearchStatusUpdate {
        SearchStatusUpdate {
            search_id,
            status,
            next_page_token: token.map(str::to_string),
            error_message: message.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_start_search_moves_to_processing() {
        let store = MemoryStore::new();
        let trigger = MockTrigger::new();
        let svc = service(&store, Some(trigger.clone()));

        let started = svc.start_search("  restaurants SP ", Some("ana")).await.unwrap();
        assert_eq!(started.outcome, TriggerOutcome::Acknowledged);
        assert_eq!(started.search.status, SearchStatus::Processing);
        assert_eq!(started.search.query, "restaurants SP");

        let calls = trigger.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query.as_deref(), Some("restaurants SP"));
        assert_eq!(calls[0].requested_by.as_deref(), Some("ana"));

        let audit = AuditLog::list_for_search(&store, started.search.id).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].from_status, None);
        assert_eq!(audit[1].to_status, SearchStatus::Processing);
        assert_eq!(audit[1].actor, AuditActor::System);
    }

    #[tokio::test]
    async fn test_start_search_validates_before_inserting() {
        let store = MemoryStore::new();

        let blank = service(&store, Some(MockTrigger::new())).start_search("   ", None).await;
        assert!(matches!(blank, Err(Error::InvalidInput(_))));

        let unconfigured = service(&store, None).start_search("cafes", None).await;
        assert!(matches!(unconfigured, Err(Error::Config(_))));

        assert_eq!(SearchRepository::count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_trigger_failure_is_written_before_surfacing() {
        let store = MemoryStore::new();
        let trigger = MockTrigger::new().failing("Automation tool returned HTTP 500: boom");
        let svc = service(&store, Some(trigger));

        let err = svc.start_search("gyms", None).await.unwrap_err();
        let Error::Trigger { search_id, message } = err else {
            panic!("expected trigger error");
        };
        assert!(message.contains("HTTP 500"));

        let search = SearchRepository::get(&store, search_id).await.unwrap().unwrap();
        assert_eq!(search.status, SearchStatus::Error);
        assert_eq!(search.error_message.as_deref(), Some(message.as_str()));
    }

    #[tokio::test]
    async fn test_next_page_round_trip() {
        let store = MemoryStore::new();
        let trigger = MockTrigger::new();
        let svc = service(&store, Some(trigger.clone()));
        let search = svc.start_search("bakeries", None).await.unwrap().search;

        let applied = svc
            .apply_remote_update(&update(search.id, InboundStatus::PendingNext, Some("abc"), None))
            .await
            .unwrap();
        assert!(applied.changed);
        assert_eq!(applied.search.status, SearchStatus::PendingNext);

        let next = svc.search_next_page(search.id, Some("bia")).await.unwrap();
        assert_eq!(next.search.status, SearchStatus::Processing);
        assert_eq!(next.search.next_page_token.as_deref(), Some("abc"));

        let calls = trigger.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].next_page_token.as_deref(), Some("abc"));
        assert_eq!(calls[1].query, None);
        assert_eq!(calls[1].requested_by.as_deref(), Some("bia"));
    }

    #[tokio::test]
    async fn test_next_page_rejected_outside_pending_next() {
        let store = MemoryStore::new();
        let trigger = MockTrigger::new();
        let svc = service(&store, Some(trigger.clone()));
        let search = svc.start_search("florists", None).await.unwrap().search;

        let processing = svc.search_next_page(search.id, None).await;
        assert!(matches!(processing, Err(Error::InvalidTransition(_))));

        svc.apply_remote_update(&update(search.id, InboundStatus::Completed, None, None))
            .await
            .unwrap();
        let completed = svc.search_next_page(search.id, None).await;
        assert!(matches!(completed, Err(Error::InvalidTransition(_))));

        assert_eq!(trigger.calls().len(), 1);
        let missing = svc.search_next_page(9999, None).await;
        assert!(matches!(missing, Err(Error::SearchNotFound(9999))));
    }

    #[tokio::test]
    async fn test_next_page_trigger_failure_moves_to_error() {
        let store = MemoryStore::new();
        let search = SearchRepository::insert(&store, "dentists", None).await.unwrap();
        let pending = SearchState {
            status: SearchStatus::PendingNext,
            next_page_token: Some("tok".to_string()),
            error_message: None,
        };
        store.write_state(search.id, search.version, &pending).await.unwrap();

        let svc = service(&store, Some(MockTrigger::new().failing("connection refused")));
        let err = svc.search_next_page(search.id, None).await.unwrap_err();
        assert!(matches!(err, Error::Trigger { .. }));

        let search = SearchRepository::get(&store, search.id).await.unwrap().unwrap();
        assert_eq!(search.status, SearchStatus::Error);
        assert_eq!(search.next_page_token, None);
        assert_eq!(search.error_message.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_identical_update_is_idempotent() {
        let store = MemoryStore::new();
        let svc = service(&store, Some(MockTrigger::new()));
        let search = svc.start_search("pet shops", None).await.unwrap().search;
        let pending = update(search.id, InboundStatus::PendingNext, Some("abc"), None);

        assert!(svc.apply_remote_update(&pending).await.unwrap().changed);
        assert!(!svc.apply_remote_update(&pending).await.unwrap().changed);

        let audit = AuditLog::list_for_search(&store, search.id).await.unwrap();
        let pending_entries = audit
            .iter()
            .filter(|e| e.to_status == SearchStatus::PendingNext)
            .count();
        assert_eq!(pending_entries, 1);
    }

    #[tokio::test]
    async fn test_remote_update_for_unknown_search() {
        let store = MemoryStore::new();
        let svc = service(&store, Some(MockTrigger::new()));
        let result = svc
            .apply_remote_update(&update(42, InboundStatus::Completed, None, None))
            .await;
        assert!(matches!(result, Err(Error::SearchNotFound(42))));
    }

    #[tokio::test]
    async fn test_remote_error_without_message_keeps_invariant() {
        let store = MemoryStore::new();
        let svc = service(&store, Some(MockTrigger::new()));
        let search = svc.start_search("bars", None).await.unwrap().search;

        let applied = svc
            .apply_remote_update(&update(search.id, InboundStatus::Error, None, None))
            .await
            .unwrap();
        assert_eq!(applied.search.status, SearchStatus::Error);
        assert!(applied.search.error_message.is_some());
    }

    #[tokio::test]
    async fn test_completed_search_rejects_different_update() {
        let store = MemoryStore::new();
        let svc = service(&store, Some(MockTrigger::new()));
        let search = svc.start_search("hotels", None).await.unwrap().search;
        svc.apply_remote_update(&update(search.id, InboundStatus::Completed, None, None))
            .await
            .unwrap();

        let late = svc
            .apply_remote_update(&update(search.id, InboundStatus::PendingNext, Some("x"), None))
            .await;
        assert!(matches!(late, Err(Error::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_background_dispatch_records_acknowledgement() {
        let store = MemoryStore::new();
        let trigger = MockTrigger::new();
        let svc = SearchService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Some(Arc::new(trigger.clone())),
            TriggerDispatch::Background,
        );

        let started = svc.start_search("barbers", None).await.unwrap();
        assert_eq!(started.outcome, TriggerOutcome::Dispatched);
        assert_eq!(started.search.status, SearchStatus::New);

        let mut status = SearchStatus::New;
        for _ in 0..100 {
            status = SearchRepository::get(&store, started.search.id)
                .await
                .unwrap()
                .unwrap()
                .status;
            if status != SearchStatus::New {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(status, SearchStatus::Processing);
        assert_eq!(trigger.calls().len(), 1);
    }

    /// Lets a competing writer land `interloper` just before each of the
    /// next `races` writes, so the write that follows loses the version check.
    struct RacingSearches {
        inner: MemoryStore,
        interloper: SearchState,
        races: AtomicUsize,
        writes: AtomicUsize,
    }

    impl RacingSearches {
        fn new(inner: &MemoryStore, interloper: SearchState, races: usize) -> Self {
            Self {
                inner: inner.clone(),
                interloper,
                races: AtomicUsize::new(races),
                writes: AtomicUsize::new(0),
            }
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SearchRepository for RacingSearches {
        async fn insert(&self, query: &str, created_by: Option<&str>) -> Result<SearchJob> {
            SearchRepository::insert(&self.inner, query, created_by).await
        }

        async fn get(&self, id: i64) -> Result<Option<SearchJob>> {
            SearchRepository::get(&self.inner, id).await
        }

        async fn list(&self, limit: i64, offset: i64) -> Result<Vec<SearchSummary>> {
            SearchRepository::list(&self.inner, limit, offset).await
        }

        async fn count(&self) -> Result<i64> {
            self.inner.count().await
        }

        async fn write_state(
            &self,
            id: i64,
            expected_version: i64,
            state: &SearchState,
        ) -> Result<SearchJob> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let raced = self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if raced {
                let current = SearchRepository::get(&self.inner, id)
                    .await?
                    .ok_or(Error::SearchNotFound(id))?;
                self.inner
                    .write_state(id, current.version, &self.interloper)
                    .await?;
            }
            self.inner.write_state(id, expected_version, state).await
        }

        async fn delete(&self, id: i64) -> Result<bool> {
            SearchRepository::delete(&self.inner, id).await
        }
    }

    async fn pending_search(store: &MemoryStore, token: &str) -> SearchJob {
        let search = SearchRepository::insert(store, "pharmacies", None).await.unwrap();
        store
            .write_state(
                search.id,
                search.version,
                &SearchState {
                    status: SearchStatus::PendingNext,
                    next_page_token: Some(token.to_string()),
                    error_message: None,
                },
            )
            .await
            .unwrap()
    }

    fn racing_service(
        store: &MemoryStore,
        searches: Arc<RacingSearches>,
        trigger: &MockTrigger,
    ) -> SearchService {
        SearchService::new(
            searches,
            Arc::new(store.clone()),
            Some(Arc::new(trigger.clone())),
            TriggerDispatch::Inline,
        )
    }

    #[tokio::test]
    async fn test_next_page_loses_race_to_completion() {
        let store = MemoryStore::new();
        let search = pending_search(&store, "abc").await;
        let completed = SearchState {
            status: SearchStatus::Completed,
            next_page_token: None,
            error_message: None,
        };
        let searches = Arc::new(RacingSearches::new(&store, completed, 1));
        let trigger = MockTrigger::new();
        let svc = racing_service(&store, searches.clone(), &trigger);

        let result = svc.search_next_page(search.id, Some("ana")).await;
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
        assert!(trigger.calls().is_empty());
        // The lost write is retried by re-reading, which finds `completed`
        // and rejects before writing again.
        assert_eq!(searches.writes(), 1);

        let stored = SearchRepository::get(&store, search.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SearchStatus::Completed);
        assert_eq!(stored.next_page_token, None);
        assert!(store.list_for_search(search.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_race_is_replanned_against_fresh_state() {
        let store = MemoryStore::new();
        let search = pending_search(&store, "abc").await;
        let newer_page = SearchState {
            status: SearchStatus::PendingNext,
            next_page_token: Some("def".to_string()),
            error_message: None,
        };
        let searches = Arc::new(RacingSearches::new(&store, newer_page, 1));
        let trigger = MockTrigger::new();
        let svc = racing_service(&store, searches.clone(), &trigger);

        let started = svc.search_next_page(search.id, None).await.unwrap();
        assert_eq!(searches.writes(), 2);
        assert_eq!(started.search.status, SearchStatus::Processing);

        let calls = trigger.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].next_page_token.as_deref(), Some("def"));
    }

    #[tokio::test]
    async fn test_endless_contention_gives_up_with_conflict() {
        let store = MemoryStore::new();
        let search = pending_search(&store, "abc").await;
        let same = search.state();
        let searches = Arc::new(RacingSearches::new(&store, same, usize::MAX));
        let trigger = MockTrigger::new();
        let svc = racing_service(&store, searches.clone(), &trigger);

        let result = svc
            .apply_remote_update(&update(search.id, InboundStatus::Completed, None, None))
            .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(searches.writes(), SEARCH_WRITE_ATTEMPTS);

        let stored = SearchRepository::get(&store, search.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SearchStatus::PendingNext);
        assert!(store.list_for_search(search.id).await.unwrap().is_empty());
    }
}
