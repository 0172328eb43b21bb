//! # prospect-api
//!
//! HTTP surface for prospect: the two inbound webhooks the automation tool
//! calls, RPC-style search endpoints, lead management with one-click
//! actions, a settings view and a health check.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use prospect_core::memory::MemoryStore;
use prospect_core::{
    AuditLog, ContactRepository, LeadRepository, OpportunityRepository, SearchRepository,
};
use prospect_db::Database;
use prospect_sync::{LeadIntake, SearchService, SearchTrigger};

pub use config::AppConfig;
pub use error::ApiError;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Storage handles behind the repository traits.
#[derive(Clone)]
pub struct Repositories {
    pub searches: Arc<dyn SearchRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub opportunities: Arc<dyn OpportunityRepository>,
    pub audit: Arc<dyn AuditLog>,
    /// Present when backed by PostgreSQL; pinged by the health check.
    pub pool: Option<sqlx::PgPool>,
}

impl Repositories {
    pub fn postgres(db: Database) -> Self {
        Self {
            pool: Some(db.pool.clone()),
            searches: Arc::new(db.searches),
            leads: Arc::new(db.leads),
            contacts: Arc::new(db.contacts),
            opportunities: Arc::new(db.opportunities),
            audit: Arc::new(db.audit),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self {
            searches: Arc::new(store.clone()),
            leads: Arc::new(store.clone()),
            contacts: Arc::new(store.clone()),
            opportunities: Arc::new(store.clone()),
            audit: Arc::new(store),
            pool: None,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub searches: SearchService,
    pub intake: LeadIntake,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        trigger: Option<Arc<dyn SearchTrigger>>,
        config: AppConfig,
    ) -> Self {
        let searches = SearchService::new(
            repos.searches.clone(),
            repos.audit.clone(),
            trigger,
            config.trigger.dispatch,
        );
        let intake = LeadIntake::new(repos.leads.clone(), repos.searches.clone());
        Self {
            repos,
            searches,
            intake,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    use handlers::{health, leads, searches, settings, webhooks};

    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health::health))
        // Inbound webhooks from the automation tool
        .route("/webhook", post(webhooks::receive_leads))
        .route("/update_search", post(webhooks::update_search))
        // Searches
        .route(
            "/api/v1/searches",
            get(searches::list_searches).post(searches::start_search),
        )
        .route(
            "/api/v1/searches/:id",
            get(searches::get_search).delete(searches::delete_search),
        )
        .route("/api/v1/searches/:id/next-page", post(searches::next_page))
        .route("/api/v1/searches/:id/leads", get(searches::search_leads))
        .route("/api/v1/searches/:id/audit", get(searches::search_audit))
        // Leads
        .route(
            "/api/v1/leads",
            get(leads::list_leads).post(leads::create_lead),
        )
        .route(
            "/api/v1/leads/:id",
            get(leads::get_lead)
                .patch(leads::update_lead)
                .delete(leads::delete_lead),
        )
        .route("/api/v1/leads/:id/whatsapp", get(leads::whatsapp))
        .route("/api/v1/leads/:id/email", get(leads::email))
        .route("/api/v1/leads/:id/contact", post(leads::create_contact))
        .route(
            "/api/v1/leads/:id/opportunity",
            post(leads::create_opportunity),
        )
        .route("/api/v1/settings", get(settings::settings))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new()),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

/// Bind the listener for `HOST`/`PORT`. The host may be a name such as
/// `localhost`; it is resolved and the first address that binds wins.
pub async fn bind_listener(config: &AppConfig) -> std::io::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await
}
