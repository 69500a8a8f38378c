//! Read-only routes behind the public brochure pages.

use agency_core::content::{Collection, ContentItem, SiteSetting};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/public/sections/{key}", get(section))
        .route("/api/public/{collection}", get(collection))
}

/// Live items of a public collection. Leads are never public.
async fn collection(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    let collection: Collection = raw
        .parse()
        .map_err(|e: agency_core::content::UnknownCollection| ApiError::NotFound(e.to_string()))?;
    Ok(Json(state.manager().public_items(collection).await?))
}

async fn section(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<SiteSetting>> {
    let key = raw
        .parse()
        .map_err(|e: agency_core::editor::SectionError| ApiError::NotFound(e.to_string()))?;
    state
        .manager()
        .section(key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("section '{raw}' has not been configured")))
}
