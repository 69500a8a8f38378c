//! Admin console API, mounted under `/api/admin`.

use agency_core::access::{capabilities, visible_collections, Capability, Role};
use agency_core::content::{Category, Collection, ItemId, Notification, SiteSetting};
use agency_core::editor::SectionKey;
use agency_core::lifecycle::ViewMode;
use agency_core::session::Profile;
use agency_core::{CollectionView, ItemView, Mutation};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::Console;
use crate::routes::events;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/navigation", get(navigation))
        .route("/collections/{collection}", get(list).post(create))
        .route(
            "/collections/{collection}/{id}",
            get(item).put(edit).delete(delete_gesture),
        )
        .route("/collections/{collection}/{id}/archive", post(archive))
        .route("/collections/{collection}/{id}/restore", post(restore))
        .route("/collections/{collection}/{id}/purge", post(purge))
        .route("/categories", get(categories).post(create_category))
        .route("/categories/{id}", delete(delete_category))
        .route("/team", get(team))
        .route("/team/{id}/role", put(change_role))
        .route("/settings", get(settings))
        .route("/settings/{key}", put(update_setting))
        .route("/notifications", get(notifications))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/notifications/stream", get(events::stream))
}

fn collection(raw: &str) -> ApiResult<Collection> {
    raw.parse()
        .map_err(|e: agency_core::content::UnknownCollection| ApiError::NotFound(e.to_string()))
}

fn section_key(raw: &str) -> ApiResult<SectionKey> {
    raw.parse().map_err(|e: agency_core::editor::SectionError| {
        ApiError::NotFound(e.to_string())
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: Option<ViewMode>,
}

#[derive(Debug, Serialize)]
pub struct Navigation {
    pub role: Option<Role>,
    pub collections: Vec<Collection>,
    pub capabilities: Vec<Capability>,
}

async fn navigation(Console(session): Console) -> Json<Navigation> {
    let role = session.role();
    Json(Navigation {
        role,
        collections: visible_collections(role),
        capabilities: capabilities(role),
    })
}

/// The access-denied view is a normal rendering state for the console, so
/// it is returned as its own body with 403 rather than the error envelope.
async fn list(
    State(state): State<AppState>,
    Console(session): Console,
    Path(raw): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Response> {
    let collection = collection(&raw)?;
    let view = state
        .manager()
        .list(&session, collection, query.view.unwrap_or_default())
        .await?;
    let status = match view {
        CollectionView::AccessDenied { .. } => StatusCode::FORBIDDEN,
        CollectionView::Listing(_) => StatusCode::OK,
    };
    Ok((status, Json(view)).into_response())
}

async fn item(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
) -> ApiResult<Json<ItemView>> {
    let view = state.manager().item(&session, collection(&raw)?, id).await?;
    Ok(Json(view))
}

async fn create(
    State(state): State<AppState>,
    Console(session): Console,
    Path(raw): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<Mutation>)> {
    let done = state
        .manager()
        .create(&session, collection(&raw)?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(done)))
}

async fn edit(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Mutation>> {
    let done = state
        .manager()
        .edit(&session, collection(&raw)?, id, payload)
        .await?;
    Ok(Json(done))
}

async fn archive(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
) -> ApiResult<Json<Mutation>> {
    let done = state
        .manager()
        .archive(&session, collection(&raw)?, id)
        .await?;
    Ok(Json(done))
}

/// Restore is an archived-view action; the view defaults accordingly.
async fn restore(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<Mutation>> {
    let mode = query.view.unwrap_or(ViewMode::Archived);
    let done = state
        .manager()
        .restore(&session, collection(&raw)?, id, mode)
        .await?;
    Ok(Json(done))
}

async fn purge(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
) -> ApiResult<Json<Mutation>> {
    let done = state
        .manager()
        .purge(&session, collection(&raw)?, id)
        .await?;
    Ok(Json(done))
}

/// The single delete button: archives from the active view, purges from the
/// archived view.
async fn delete_gesture(
    State(state): State<AppState>,
    Console(session): Console,
    Path((raw, id)): Path<(String, ItemId)>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<Mutation>> {
    let done = state
        .manager()
        .delete(&session, collection(&raw)?, id, query.view.unwrap_or_default())
        .await?;
    Ok(Json(done))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

async fn categories(
    State(state): State<AppState>,
    Console(session): Console,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.manager().categories(&session).await?))
}

async fn create_category(
    State(state): State<AppState>,
    Console(session): Console,
    Json(body): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state
        .manager()
        .create_category(&session, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    Console(session): Console,
    Path(id): Path<ItemId>,
) -> ApiResult<StatusCode> {
    state.manager().delete_category(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

async fn team(
    State(state): State<AppState>,
    Console(session): Console,
) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(state.manager().team(&session).await?))
}

async fn change_role(
    State(state): State<AppState>,
    Console(session): Console,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleChange>,
) -> ApiResult<Json<Profile>> {
    let role = Role::parse(&body.role)
        .ok_or_else(|| ApiError::Validation(format!("unknown role '{}'", body.role)))?;
    Ok(Json(state.manager().change_role(&session, id, role).await?))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

async fn settings(
    State(state): State<AppState>,
    Console(session): Console,
) -> ApiResult<Json<Vec<SiteSetting>>> {
    Ok(Json(state.manager().sections(&session).await?))
}

async fn update_setting(
    State(state): State<AppState>,
    Console(session): Console,
    Path(raw): Path<String>,
    Json(value): Json<Value>,
) -> ApiResult<Json<SiteSetting>> {
    let key = section_key(&raw)?;
    Ok(Json(
        state.manager().update_section(&session, key, value).await?,
    ))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

async fn notifications(
    State(state): State<AppState>,
    Console(session): Console,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        state.manager().notifications(&session, query.limit).await?,
    ))
}

async fn mark_read(
    State(state): State<AppState>,
    Console(session): Console,
    Path(id): Path<ItemId>,
) -> ApiResult<StatusCode> {
    state.manager().mark_read(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
