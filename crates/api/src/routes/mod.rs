pub mod admin;
pub mod auth;
pub mod careers;
pub mod contact;
pub mod events;
pub mod health;
pub mod site;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware;
use crate::state::AppState;

/// Largest request body accepted (editor payloads included).
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Assemble the full router with all route groups and middleware.
///
/// Paths that match no route are served from the built single-page app,
/// with `index.html` as the client-side routing fallback.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config().static_dir.clone();
    // `fallback` keeps the shell's 200; `not_found_service` would rewrite it to 404.
    let spa = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));
    let cors = middleware::cors::cors_layer(&state.config().allowed_origins);

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(site::routes())
        .merge(contact::routes())
        .merge(careers::routes())
        .nest("/api/admin", admin::routes())
        .fallback_service(spa)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(middleware::request_tracing::trace_layer())
        .layer(cors)
        .with_state(state)
}
