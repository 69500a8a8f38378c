//! `GET /api/careers`: proxy for the recruiting spreadsheet API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/careers", get(careers))
}

/// Upstream JSON is passed through untouched. Any failure, including a
/// missing configuration, answers with an empty record list.
async fn careers(State(state): State<AppState>) -> Response {
    match state.outbound().careers.listings().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Careers listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "message": "Open positions are unavailable right now.",
                    "records": [],
                })),
            )
                .into_response()
        }
    }
}
