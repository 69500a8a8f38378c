use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Full health check. Verifies database connectivity when running on
/// Postgres.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let store = match state.pool() {
        Some(pool) => {
            sqlx::query("SELECT 1").execute(pool).await.map_err(|e| {
                ApiError::Internal(format!("database health check failed: {e}"))
            })?;
            "postgres"
        }
        None => "memory",
    };

    Ok(Json(json!({
        "status": "ok",
        "store": store,
        "subscribers": state.event_bus().subscriber_count(),
    })))
}

/// Lightweight ping, no store check.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
