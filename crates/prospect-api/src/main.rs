//! prospect-api server binary.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prospect_api::{bind_listener, build_router, AppConfig, AppState, Repositories};
use prospect_db::Database;
use prospect_sync::{HttpSearchTrigger, SearchTrigger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "prospect_api=debug,prospect_sync=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "prospect_api=debug,prospect_sync=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("prospect-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env();

    let db = Database::connect_with_config(&config.database_url, config.pool.clone()).await?;
    db.migrate().await?;
    info!(subsystem = "db", "Migrations applied");

    let trigger: Option<Arc<dyn SearchTrigger>> = match config.trigger.url.as_deref() {
        Some(url) => {
            let http = HttpSearchTrigger::new(url, config.trigger.timeout)?;
            info!(
                trigger_url = http.url(),
                timeout_secs = config.trigger.timeout.as_secs(),
                dispatch = ?config.trigger.dispatch,
                "Automation trigger configured"
            );
            Some(Arc::new(http))
        }
        None => {
            warn!("TRIGGER_URL is not set; searches cannot be started");
            None
        }
    };
    if config.lead_webhook_secret.is_none() {
        warn!("LEAD_WEBHOOK_SECRET is not set; lead webhook accepts unauthenticated calls");
    }
    if config.search_update_secret.is_none() {
        warn!("SEARCH_UPDATE_SECRET is not set; update webhook accepts unauthenticated calls");
    }

    info!(
        lead_webhook = %config.lead_webhook_url(),
        search_update_webhook = %config.search_update_url(),
        "Inbound webhook URLs"
    );

    let listener = bind_listener(&config).await?;
    info!(host = %config.host, addr = %listener.local_addr()?, "Starting server");

    let state = AppState::new(Repositories::postgres(db), trigger, config);
    let app = build_router(state);

    axum::serve(listener, app).await?;

    Ok(())
}
