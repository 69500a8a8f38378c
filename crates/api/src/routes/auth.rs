//! Sign-in, sign-out and session routes.

use agency_core::access::{capabilities, visible_collections, Capability};
use agency_core::content::Collection;
use agency_core::auth::{issue_token, verify_password};
use agency_core::session::Profile;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::Console;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(session))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub profile: Profile,
    pub collections: Vec<Collection>,
    pub capabilities: Vec<Capability>,
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> ApiResult<Json<SignInResponse>> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let email = body.email.trim().to_lowercase();
    let Some(credentials) = state.profiles().credentials(&email).await? else {
        tracing::info!("Sign-in for unknown email");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    };

    let valid = verify_password(&body.password, &credentials.password_hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash is unreadable: {e}")))?;
    if !valid {
        tracing::info!(user_id = %credentials.profile.id, "Sign-in with wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let profile = credentials.profile;
    let token = issue_token(state.tokens(), profile.id, &profile.email)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
    tracing::info!(user_id = %profile.id, role = ?profile.role, "Signed in");
    Ok(Json(SignInResponse { token, profile }))
}

/// Tokens are stateless; the client discards its copy.
async fn sign_out() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn session(Console(session): Console) -> ApiResult<Json<SessionResponse>> {
    let role = session.role();
    let profile = session
        .profile()
        .cloned()
        .ok_or(ApiError::Unauthorized("Session could not be established"))?;
    Ok(Json(SessionResponse {
        profile,
        collections: visible_collections(role),
        capabilities: capabilities(role),
    }))
}
