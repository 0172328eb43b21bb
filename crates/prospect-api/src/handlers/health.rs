//! Liveness check.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::AppState;

/// `GET /health`
///
/// Returns 200 when the database answers (or no database is attached),
/// 503 when the ping fails.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match &state.repos.pool {
        Some(pool) => match prospect_db::ping(pool).await {
            Ok(()) => "ok",
            Err(e) => {
                warn!(subsystem = "api", component = "health", error = %e, "Database ping failed");
                "unavailable"
            }
        },
        None => "memory",
    };

    let status = if database == "unavailable" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(json!({
            "status": if status.is_success() { "ok" } else { "degraded" },
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
            "time": chrono::Utc::now(),
        })),
    )
}
